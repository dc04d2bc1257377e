//! Keys API abstraction.
//!
//! The filesystem layer only ever reads, so the trait carries a single
//! operation. [`crate::HttpKeysClient`] talks to a real cluster and
//! [`crate::MemoryKeys`] serves tests.

use async_trait::async_trait;

use crate::error::Result;
use crate::node::{GetOptions, Response};

/// Read access to an etcd v2 key tree.
#[async_trait]
pub trait KeysApi: Send + Sync + 'static {
    /// Read `key`. Directory reads list immediate children unless
    /// `opts.recursive` is set.
    async fn get(&self, key: &str, opts: &GetOptions) -> Result<Response>;
}
