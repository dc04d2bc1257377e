use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{MountConfig, DEFAULT_ENDPOINT};
use crate::mount::MountError;

#[derive(Debug, Parser)]
#[command(name = "etcdfs")]
#[command(about = "Mount an etcd key tree as a read-only filesystem", long_about = None)]
pub struct Cli {
    /// Allow other users to access this filesystem
    #[arg(long, visible_alias = "allow_other")]
    pub allow_other: bool,

    /// Allow root to access this filesystem
    #[arg(long, visible_alias = "allow_root")]
    pub allow_root: bool,

    /// Enable debugging
    #[arg(long)]
    pub debug: bool,

    /// Comma-separated etcd endpoints
    #[arg(
        long,
        env = "ETCD_ENDPOINTS",
        value_delimiter = ',',
        default_value = DEFAULT_ENDPOINT
    )]
    pub endpoints: Vec<String>,

    /// Seconds to wait for a single etcd request
    #[arg(long, default_value = "5")]
    pub timeout: u64,

    /// [<subdir>] <mountpoint>
    #[arg(value_name = "PATH", required = true, num_args = 1..=2)]
    pub paths: Vec<String>,
}

impl Cli {
    pub fn into_config(self) -> Result<MountConfig, MountError> {
        let (subdir, mountpoint) = match self.paths.as_slice() {
            [mountpoint] => ("/", mountpoint),
            [subdir, mountpoint] => (subdir.as_str(), mountpoint),
            _ => {
                return Err(MountError::InvalidOption(
                    "usage: etcdfs [<subdir>] <mountpoint>".to_string(),
                ))
            }
        };

        let mut config = MountConfig::new(subdir, PathBuf::from(mountpoint));
        config.endpoints = self.endpoints;
        config.request_timeout = Duration::from_secs(self.timeout);
        config.mount.allow_other = self.allow_other;
        config.mount.allow_root = self.allow_root;
        Ok(config)
    }
}
