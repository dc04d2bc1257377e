use std::time::SystemTime;

use crate::inode::InodeId;

/// Directories are readable and traversable by everyone, never writable.
pub const DIR_PERM: u16 = 0o555;
/// Files are readable by everyone, never writable.
pub const FILE_PERM: u16 = 0o444;

const BLOCK_SIZE: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAttr {
    pub ino: InodeId,
    pub size: u64,
    pub kind: NodeKind,
    pub perm: u16,
    pub nlink: u32,
}

impl NodeAttr {
    pub fn directory(ino: InodeId) -> Self {
        NodeAttr {
            ino,
            size: 0,
            kind: NodeKind::Directory,
            perm: DIR_PERM,
            nlink: 2,
        }
    }

    pub fn file(ino: InodeId, size: u64) -> Self {
        NodeAttr {
            ino,
            size,
            kind: NodeKind::File,
            perm: FILE_PERM,
            nlink: 1,
        }
    }

    pub fn blocks(&self) -> u64 {
        blocks_for_size(self.size)
    }
}

fn blocks_for_size(size: u64) -> u64 {
    size.div_ceil(512)
}

pub fn kind_to_fuser_type(kind: NodeKind) -> fuser::FileType {
    match kind {
        NodeKind::Directory => fuser::FileType::Directory,
        NodeKind::File => fuser::FileType::RegularFile,
    }
}

/// etcd keeps no timestamps, so all times are the epoch.
pub fn to_fuser_attr(attr: &NodeAttr, uid: u32, gid: u32) -> fuser::FileAttr {
    fuser::FileAttr {
        ino: attr.ino,
        size: attr.size,
        blocks: attr.blocks(),
        atime: SystemTime::UNIX_EPOCH,
        mtime: SystemTime::UNIX_EPOCH,
        ctime: SystemTime::UNIX_EPOCH,
        crtime: SystemTime::UNIX_EPOCH,
        kind: kind_to_fuser_type(attr.kind),
        perm: attr.perm,
        nlink: attr.nlink,
        uid,
        gid,
        rdev: 0,
        blksize: BLOCK_SIZE,
        flags: 0,
    }
}
