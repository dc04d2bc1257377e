//! Filesystem views of etcd nodes.
//!
//! A [`VNode`] is a point-in-time snapshot of one key. It is built for a
//! single request and dropped with it; nothing here is cached or mutated.

use etcdfs_client::Node;

use crate::attr::{NodeAttr, NodeKind};
use crate::error::Result;
use crate::inode::{identity, InodeId};
use crate::keypath;
use crate::resolver::NodeResolver;

/// A child of a directory snapshot: its key and whether it is a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    pub key: String,
    pub is_dir: bool,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub ino: InodeId,
    pub name: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    key: String,
    children: Vec<ChildEntry>,
}

impl DirectoryNode {
    pub fn new(key: impl Into<String>, children: Vec<ChildEntry>) -> Self {
        DirectoryNode {
            key: key.into(),
            children,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn attributes(&self) -> NodeAttr {
        NodeAttr::directory(identity(&self.key))
    }

    /// Children in snapshot order. Only names and kinds; no child is read.
    pub fn list(&self) -> Vec<DirEntry> {
        self.children
            .iter()
            .map(|child| DirEntry {
                ino: identity(&child.key),
                name: keypath::base(&child.key).to_string(),
                kind: if child.is_dir {
                    NodeKind::Directory
                } else {
                    NodeKind::File
                },
            })
            .collect()
    }

    /// Resolve the child called `name` with a fresh store read.
    pub async fn lookup(&self, resolver: &NodeResolver, name: &str) -> Result<VNode> {
        resolver.resolve(&keypath::join(&self.key, name)).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    key: String,
    content: Vec<u8>,
}

impl FileNode {
    pub fn new(key: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        FileNode {
            key: key.into(),
            content: content.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn attributes(&self) -> NodeAttr {
        NodeAttr::file(identity(&self.key), self.content.len() as u64)
    }

    /// The whole value. Callers needing a window slice it themselves.
    pub fn read(&self) -> &[u8] {
        &self.content
    }

    pub fn into_content(self) -> Vec<u8> {
        self.content
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VNode {
    Directory(DirectoryNode),
    File(FileNode),
}

impl VNode {
    pub fn key(&self) -> &str {
        match self {
            VNode::Directory(dir) => dir.key(),
            VNode::File(file) => file.key(),
        }
    }

    pub fn ino(&self) -> InodeId {
        identity(self.key())
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            VNode::Directory(_) => NodeKind::Directory,
            VNode::File(_) => NodeKind::File,
        }
    }

    pub fn attributes(&self) -> NodeAttr {
        match self {
            VNode::Directory(dir) => dir.attributes(),
            VNode::File(file) => file.attributes(),
        }
    }
}

impl From<Node> for VNode {
    fn from(node: Node) -> Self {
        if node.dir {
            let children = node
                .nodes
                .into_iter()
                .map(|child| ChildEntry {
                    key: child.key,
                    is_dir: child.dir,
                })
                .collect();
            VNode::Directory(DirectoryNode::new(node.key, children))
        } else {
            VNode::File(FileNode::new(
                node.key,
                node.value.unwrap_or_default().into_bytes(),
            ))
        }
    }
}
