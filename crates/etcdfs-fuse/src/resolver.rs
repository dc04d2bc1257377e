//! Key resolution against the store.

use std::sync::Arc;

use etcdfs_client::{GetOptions, KeysApi};
use tracing::warn;

use crate::classify::classify;
use crate::error::Result;
use crate::vnode::VNode;

/// Quorum reads with sorted, immediate children only.
pub const RESOLVE_OPTIONS: GetOptions = GetOptions {
    recursive: false,
    sort: true,
    quorum: true,
};

/// Reads one key and turns the snapshot into a [`VNode`].
///
/// Every call is a separate store round trip. Failures are classified once
/// here and never retried.
#[derive(Clone)]
pub struct NodeResolver {
    keys: Arc<dyn KeysApi>,
}

impl NodeResolver {
    pub fn new(keys: Arc<dyn KeysApi>) -> Self {
        Self { keys }
    }

    pub async fn resolve(&self, key: &str) -> Result<VNode> {
        match self.keys.get(key, &RESOLVE_OPTIONS).await {
            Ok(response) => Ok(VNode::from(response.node)),
            Err(err) => {
                warn!("Error fetching node {:?}: {}", key, err);
                Err(classify(key, err))
            }
        }
    }
}
