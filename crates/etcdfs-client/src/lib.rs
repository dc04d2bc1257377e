#![warn(missing_docs)]

//! etcdfs store client: the etcd v2 keys API seen through a small async trait.

pub mod client;
pub mod error;
pub mod http;
pub mod memory;
pub mod node;

pub use client::KeysApi;
pub use error::{ApiError, ErrorCode, Result, StoreError};
pub use http::{ClientConfig, HttpKeysClient, DEFAULT_ENDPOINT};
pub use memory::MemoryKeys;
pub use node::{GetOptions, Node, Response};
