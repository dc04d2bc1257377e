//! The mounted etcd subtree and its key-addressed operations.
//!
//! Each operation resolves the key it is given from the store; the tree has
//! no in-memory representation between calls.

use std::sync::Arc;

use etcdfs_client::KeysApi;

use crate::attr::NodeAttr;
use crate::error::{FsError, Result};
use crate::keypath;
use crate::resolver::NodeResolver;
use crate::vnode::{DirEntry, VNode};

pub struct EtcdFs {
    resolver: NodeResolver,
    base: String,
}

impl EtcdFs {
    pub fn new(keys: Arc<dyn KeysApi>, base: &str) -> Self {
        Self {
            resolver: NodeResolver::new(keys),
            base: keypath::clean(base),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn resolver(&self) -> &NodeResolver {
        &self.resolver
    }

    /// Resolve the configured base key. The mount cannot exist without it.
    pub async fn root(&self) -> Result<VNode> {
        self.resolver.resolve(&self.base).await
    }

    /// Resolve `name` inside `parent` in one store read. A file parent
    /// comes back from etcd as not-a-directory.
    pub async fn lookup(&self, parent: &str, name: &str) -> Result<VNode> {
        self.resolver.resolve(&keypath::join(parent, name)).await
    }

    pub async fn list(&self, key: &str) -> Result<Vec<DirEntry>> {
        match self.resolver.resolve(key).await? {
            VNode::Directory(dir) => Ok(dir.list()),
            VNode::File(_) => Err(FsError::NotADirectory {
                key: key.to_string(),
            }),
        }
    }

    pub async fn attributes(&self, key: &str) -> Result<NodeAttr> {
        Ok(self.resolver.resolve(key).await?.attributes())
    }

    pub async fn read(&self, key: &str) -> Result<Vec<u8>> {
        match self.resolver.resolve(key).await? {
            VNode::File(file) => Ok(file.into_content()),
            VNode::Directory(_) => Err(FsError::IsADirectory {
                key: key.to_string(),
            }),
        }
    }
}
