//! Mount options and mountpoint checks for etcdfs.
//!
//! The filesystem is always mounted read-only with kernel permission
//! checking; only access by other users or by root is configurable.

use std::path::Path;

use thiserror::Error;

use crate::error::FsError;

/// Subtype reported in the mount table.
pub const SUBTYPE: &str = "etcdFS";

/// Mount options for FUSE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountOptions {
    /// Allow other users to access.
    pub allow_other: bool,
    /// Allow root to access.
    pub allow_root: bool,
    /// Source name shown in the mount table.
    pub fsname: String,
    /// Filesystem subtype.
    pub subtype: String,
}

impl MountOptions {
    /// Options for mounting the subtree at `base`.
    pub fn for_base(base: &str) -> Self {
        MountOptions {
            allow_other: false,
            allow_root: false,
            fsname: format!("etcd:{}", base),
            subtype: SUBTYPE.to_string(),
        }
    }
}

impl Default for MountOptions {
    fn default() -> Self {
        Self::for_base("/")
    }
}

/// Errors that can occur while setting up or running the mount.
#[derive(Debug, Error)]
pub enum MountError {
    /// Path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(String),

    /// Path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// Invalid option or argument.
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// The base key could not be resolved, so there is nothing to mount.
    #[error("Cannot resolve etcd:{base}: {source}")]
    Root {
        /// Base key of the mount.
        base: String,
        /// Why resolution failed.
        source: FsError,
    },

    /// I/O error from the FUSE session.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validate a mountpoint path.
pub fn validate_mountpoint(path: &Path) -> Result<(), MountError> {
    if !path.exists() {
        return Err(MountError::PathNotFound(path.display().to_string()));
    }

    if !path.is_dir() {
        return Err(MountError::NotADirectory(path.display().to_string()));
    }

    Ok(())
}

/// Convert MountOptions to fuser::MountOption vec.
pub fn options_to_fuser(opts: &MountOptions) -> Result<Vec<fuser::MountOption>, MountError> {
    if opts.allow_other && opts.allow_root {
        return Err(MountError::InvalidOption(
            "allow_other and allow_root are mutually exclusive".to_string(),
        ));
    }

    let mut fuser_opts = vec![
        fuser::MountOption::FSName(opts.fsname.clone()),
        fuser::MountOption::Subtype(opts.subtype.clone()),
        fuser::MountOption::DefaultPermissions,
        fuser::MountOption::RO,
    ];

    if opts.allow_other {
        fuser_opts.push(fuser::MountOption::AllowOther);
    }

    if opts.allow_root {
        fuser_opts.push(fuser::MountOption::AllowRoot);
    }

    Ok(fuser_opts)
}
