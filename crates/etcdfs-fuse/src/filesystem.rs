//! FUSE adapter for etcdfs.
//!
//! Implements the `fuser::Filesystem` trait on top of [`EtcdFs`]. Every
//! request that needs the store is moved onto the tokio runtime, so a slow
//! etcd round trip never blocks the session loop or other requests. All
//! in-flight requests fail with `EIO` once the mount is torn down.

use std::ffi::OsStr;
use std::future::Future;
use std::os::raw::c_int;
use std::sync::Arc;

use fuser::{
    Filesystem, KernelConfig, ReplyAttr, ReplyData, ReplyDirectory, ReplyEntry, ReplyOpen,
    Request,
};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::attr::{kind_to_fuser_type, to_fuser_attr, NodeKind};
use crate::config::FsConfig;
use crate::error::FsError;
use crate::inode::{identity, KeyTable};
use crate::keypath;
use crate::root::EtcdFs;
use crate::vnode::DirEntry;

pub struct EtcdFuse {
    fs: Arc<EtcdFs>,
    config: FsConfig,
    keys: Arc<KeyTable>,
    runtime: Handle,
    shutdown: CancellationToken,
}

impl EtcdFuse {
    pub fn new(
        fs: Arc<EtcdFs>,
        config: FsConfig,
        runtime: Handle,
        shutdown: CancellationToken,
    ) -> Self {
        let keys = Arc::new(KeyTable::new(fs.base()));
        Self {
            fs,
            config,
            keys,
            runtime,
            shutdown,
        }
    }

    pub fn key_table(&self) -> &KeyTable {
        &self.keys
    }

    fn key_for(&self, ino: u64) -> crate::error::Result<String> {
        self.keys.key(ino).ok_or(FsError::StaleInode { ino })
    }

    /// Run `request` on the runtime and hand its outcome to `respond`.
    fn dispatch<T, F, R>(&self, op: &'static str, request: F, respond: R)
    where
        T: Send + 'static,
        F: Future<Output = crate::error::Result<T>> + Send + 'static,
        R: FnOnce(crate::error::Result<T>) + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        self.runtime.spawn(async move {
            let result = tokio::select! {
                biased;
                _ = shutdown.cancelled() => Err(FsError::Cancelled),
                result = request => result,
            };
            if let Err(ref e) = result {
                debug!("{} failed: {}", op, e);
            }
            respond(result);
        });
    }
}

/// Directory listing as the kernel sees it: `.` and `..` ahead of the
/// children. The mount root is its own parent.
pub fn with_dot_entries(key: &str, root_key: &str, children: Vec<DirEntry>) -> Vec<DirEntry> {
    let parent = if key == root_key {
        key.to_string()
    } else {
        keypath::parent(key)
    };
    let mut entries = Vec::with_capacity(children.len() + 2);
    entries.push(DirEntry {
        ino: identity(key),
        name: ".".to_string(),
        kind: NodeKind::Directory,
    });
    entries.push(DirEntry {
        ino: identity(&parent),
        name: "..".to_string(),
        kind: NodeKind::Directory,
    });
    entries.extend(children);
    entries
}

/// The part of `content` a read of `size` bytes at `offset` returns.
pub fn read_window(content: &[u8], offset: i64, size: u32) -> &[u8] {
    let start = usize::try_from(offset)
        .unwrap_or(0)
        .min(content.len());
    let end = start.saturating_add(size as usize).min(content.len());
    &content[start..end]
}

impl Filesystem for EtcdFuse {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), c_int> {
        info!("etcdfs serving etcd:{}", self.fs.base());
        Ok(())
    }

    fn destroy(&mut self) {
        debug!("etcdfs destroy, {} keys still referenced", self.keys.len());
        self.shutdown.cancel();
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let name = name.to_string_lossy().into_owned();
        debug!("lookup parent={} name={}", parent, name);

        let parent_key = match self.key_for(parent) {
            Ok(key) => key,
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        };

        let fs = Arc::clone(&self.fs);
        let keys = Arc::clone(&self.keys);
        let config = self.config.clone();
        self.dispatch(
            "lookup",
            async move { fs.lookup(&parent_key, &name).await },
            move |result| match result {
                Ok(node) => {
                    keys.remember(node.key());
                    let fuser_attr = to_fuser_attr(&node.attributes(), config.uid, config.gid);
                    reply.entry(&config.entry_timeout, &fuser_attr, 0);
                }
                Err(e) => reply.error(e.to_errno()),
            },
        );
    }

    fn forget(&mut self, _req: &Request<'_>, ino: u64, nlookup: u64) {
        self.keys.forget(ino, nlookup);
        debug!(
            "forget ino={} nlookup={} remaining={}",
            ino,
            nlookup,
            self.keys.lookup_count(ino)
        );
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        debug!("getattr ino={}", ino);

        let key = match self.key_for(ino) {
            Ok(key) => key,
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        };

        let fs = Arc::clone(&self.fs);
        let config = self.config.clone();
        self.dispatch(
            "getattr",
            async move { fs.attributes(&key).await },
            move |result| match result {
                Ok(attr) => {
                    let fuser_attr = to_fuser_attr(&attr, config.uid, config.gid);
                    reply.attr(&config.attr_timeout, &fuser_attr);
                }
                Err(e) => reply.error(e.to_errno()),
            },
        );
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        debug!("open ino={} flags={}", ino, flags);

        if flags & libc::O_ACCMODE != libc::O_RDONLY {
            reply.error(libc::EROFS);
            return;
        }
        if let Err(e) = self.key_for(ino) {
            reply.error(e.to_errno());
            return;
        }

        reply.opened(0, 0);
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        debug!("read ino={} offset={} size={}", ino, offset, size);

        let key = match self.key_for(ino) {
            Ok(key) => key,
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        };

        let fs = Arc::clone(&self.fs);
        self.dispatch(
            "read",
            async move { fs.read(&key).await },
            move |result| match result {
                Ok(content) => reply.data(read_window(&content, offset, size)),
                Err(e) => reply.error(e.to_errno()),
            },
        );
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        debug!("readdir ino={} offset={}", ino, offset);

        let key = match self.key_for(ino) {
            Ok(key) => key,
            Err(e) => {
                reply.error(e.to_errno());
                return;
            }
        };

        let fs = Arc::clone(&self.fs);
        let root_key = self.keys.root_key().to_string();
        self.dispatch(
            "readdir",
            async move {
                let children = fs.list(&key).await?;
                Ok(with_dot_entries(&key, &root_key, children))
            },
            move |result| match result {
                Ok(entries) => {
                    let skip = usize::try_from(offset).unwrap_or(0);
                    for (i, entry) in entries.iter().enumerate().skip(skip) {
                        let next = (i + 1) as i64;
                        if reply.add(entry.ino, next, kind_to_fuser_type(entry.kind), &entry.name)
                        {
                            break;
                        }
                    }
                    reply.ok();
                }
                Err(e) => reply.error(e.to_errno()),
            },
        );
    }
}
