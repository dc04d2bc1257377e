//! End-to-end behaviour of the mounted tree against an in-process store.

use std::sync::Arc;

use etcdfs_client::{ErrorCode, MemoryKeys};
use etcdfs_fuse::attr::{NodeKind, DIR_PERM, FILE_PERM};
use etcdfs_fuse::inode::identity;
use etcdfs_fuse::vnode::VNode;
use etcdfs_fuse::{EtcdFs, FsError};

fn store() -> Arc<MemoryKeys> {
    let keys = MemoryKeys::new();
    keys.mkdir("/root/a").unwrap();
    keys.set("/root/b", "hello").unwrap();
    keys.set("/root/a/nested", "deep").unwrap();
    keys.set("/other", "outside").unwrap();
    Arc::new(keys)
}

fn mount(keys: &Arc<MemoryKeys>, base: &str) -> EtcdFs {
    EtcdFs::new(keys.clone(), base)
}

#[test]
fn identity_is_deterministic_and_distinct_for_sample() {
    let sample = ["/", "/a", "/a/b", "/b", "/root", "/root/a", "/root/b"];
    for key in sample {
        assert_eq!(identity(key), identity(key));
    }
    let mut ids: Vec<u64> = sample.iter().map(|k| identity(k)).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), sample.len());
}

#[tokio::test]
async fn list_returns_children_in_store_order() {
    let keys = store();
    let fs = mount(&keys, "/root");

    let entries = fs.list("/root").await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "a");
    assert_eq!(entries[0].kind, NodeKind::Directory);
    assert_eq!(entries[0].ino, identity("/root/a"));
    assert_eq!(entries[1].name, "b");
    assert_eq!(entries[1].kind, NodeKind::File);
}

#[tokio::test]
async fn lookup_missing_child_is_enoent() {
    let keys = store();
    let fs = mount(&keys, "/root");

    let err = fs.lookup("/root", "missing").await.unwrap_err();
    assert!(matches!(err, FsError::NotFound { .. }));
    assert_eq!(err.to_errno(), libc::ENOENT);
}

#[tokio::test]
async fn read_returns_stored_bytes() {
    let keys = store();
    let fs = mount(&keys, "/root");

    assert_eq!(fs.read("/root/b").await.unwrap(), b"hello".to_vec());
    let attr = fs.attributes("/root/b").await.unwrap();
    assert_eq!(attr.size, 5);
    assert_eq!(attr.perm, FILE_PERM);
    assert_eq!(attr.kind, NodeKind::File);
}

#[tokio::test]
async fn directories_are_read_only_and_sizeless() {
    let keys = store();
    let fs = mount(&keys, "/root");

    let attr = fs.attributes("/root/a").await.unwrap();
    assert_eq!(attr.perm, DIR_PERM);
    assert_eq!(attr.size, 0);
    assert_eq!(attr.kind, NodeKind::Directory);
}

#[tokio::test]
async fn attributes_track_store_mutations() {
    let keys = store();
    let fs = mount(&keys, "/root");

    let before = fs.attributes("/root/b").await.unwrap();
    keys.set("/root/b", "hello, world").unwrap();
    let after = fs.attributes("/root/b").await.unwrap();

    assert_eq!(before.ino, after.ino);
    assert_eq!(before.kind, after.kind);
    assert_eq!(after.size, 12);
}

#[tokio::test]
async fn directory_lookup_walks_into_children() {
    let keys = store();
    let fs = mount(&keys, "/root");

    let root = match fs.root().await.unwrap() {
        VNode::Directory(dir) => dir,
        VNode::File(_) => panic!("base key should be a directory"),
    };
    let child = root.lookup(fs.resolver(), "a").await.unwrap();
    assert_eq!(child.key(), "/root/a");

    let nested = fs.lookup(child.key(), "nested").await.unwrap();
    match nested {
        VNode::File(file) => assert_eq!(file.read(), b"deep"),
        VNode::Directory(_) => panic!("nested should be a file"),
    }
}

#[tokio::test]
async fn file_can_be_mounted_as_root() {
    let keys = store();
    let fs = mount(&keys, "/other");

    let root = fs.root().await.unwrap();
    assert_eq!(root.kind(), NodeKind::File);
    assert_eq!(fs.read(fs.base()).await.unwrap(), b"outside".to_vec());
}

#[tokio::test]
async fn classified_store_errors_surface_as_errnos() {
    let keys = store();
    keys.inject("/root/a", ErrorCode::Unauthorized).unwrap();
    let fs = mount(&keys, "/root");

    let denied = fs.list("/root/a").await.unwrap_err();
    assert!(matches!(denied, FsError::PermissionDenied { .. }));

    let not_dir = fs.lookup("/root/b", "x").await.unwrap_err();
    assert_eq!(not_dir.to_errno(), libc::ENOTDIR);
}

#[tokio::test]
async fn other_failures_are_generic_io_errors() {
    let keys = store();
    keys.inject("/root/a", ErrorCode::RaftInternal).unwrap();
    keys.inject_transport_failure("/root/b").unwrap();
    let fs = mount(&keys, "/root");

    let raft = fs.attributes("/root/a").await.unwrap_err();
    assert_eq!(raft.to_errno(), libc::EIO);
    assert_eq!(raft.store_code(), Some(ErrorCode::RaftInternal));

    let transport = fs.read("/root/b").await.unwrap_err();
    assert_eq!(transport.to_errno(), libc::EIO);
    assert_eq!(transport.store_code(), None);
}

#[tokio::test]
async fn failures_stay_scoped_to_their_request() {
    let keys = store();
    keys.inject("/root/a", ErrorCode::RaftInternal).unwrap();
    let fs = Arc::new(mount(&keys, "/root"));

    let failing = {
        let fs = Arc::clone(&fs);
        tokio::spawn(async move { fs.list("/root/a").await })
    };
    let healthy = {
        let fs = Arc::clone(&fs);
        tokio::spawn(async move { fs.read("/root/b").await })
    };

    assert!(failing.await.unwrap().is_err());
    assert_eq!(healthy.await.unwrap().unwrap(), b"hello".to_vec());
    assert!(fs.root().await.is_ok());
}
