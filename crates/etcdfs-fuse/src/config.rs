//! Process-wide configuration, fixed at startup.

use std::path::PathBuf;
use std::time::Duration;

use etcdfs_client::ClientConfig;

use crate::keypath;
use crate::mount::MountOptions;

pub use etcdfs_client::DEFAULT_ENDPOINT;

/// Attribute caching and ownership reported to the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsConfig {
    pub attr_timeout: Duration,
    pub entry_timeout: Duration,
    pub uid: u32,
    pub gid: u32,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            attr_timeout: Duration::from_secs(1),
            entry_timeout: Duration::from_secs(1),
            uid: 0,
            gid: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MountConfig {
    /// Key mounted as the filesystem root.
    pub base_key: String,
    pub mountpoint: PathBuf,
    pub endpoints: Vec<String>,
    pub request_timeout: Duration,
    pub mount: MountOptions,
    pub fs: FsConfig,
}

impl MountConfig {
    pub fn new(base_key: &str, mountpoint: impl Into<PathBuf>) -> Self {
        let base_key = keypath::clean(base_key);
        let client = ClientConfig::default();
        Self {
            mount: MountOptions::for_base(&base_key),
            base_key,
            mountpoint: mountpoint.into(),
            endpoints: vec![DEFAULT_ENDPOINT.to_string()],
            request_timeout: client.request_timeout,
            fs: FsConfig::default(),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            endpoints: self.endpoints.clone(),
            request_timeout: self.request_timeout,
        }
    }
}
