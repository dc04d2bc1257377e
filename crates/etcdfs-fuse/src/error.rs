use etcdfs_client::{ErrorCode, StoreError};
use thiserror::Error;

/// Errors surfaced at the filesystem boundary.
///
/// The first three variants are the classified store conditions; anything
/// etcd or the transport reports beyond those stays `Unclassified` with the
/// original error attached.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("No such key: {key}")]
    NotFound { key: String },

    #[error("Not a directory: {key}")]
    NotADirectory { key: String },

    #[error("Permission denied for key {key}")]
    PermissionDenied { key: String },

    #[error("Is a directory: {key}")]
    IsADirectory { key: String },

    #[error("Stale inode: {ino}")]
    StaleInode { ino: u64 },

    #[error("Request cancelled")]
    Cancelled,

    #[error("etcd error for {key}: {source}")]
    Unclassified { key: String, source: StoreError },
}

pub type Result<T> = std::result::Result<T, FsError>;

impl FsError {
    pub fn to_errno(&self) -> i32 {
        use libc::*;
        match self {
            FsError::NotFound { .. } => ENOENT,
            FsError::NotADirectory { .. } => ENOTDIR,
            FsError::PermissionDenied { .. } => EACCES,
            FsError::IsADirectory { .. } => EISDIR,
            FsError::StaleInode { .. } => ESTALE,
            FsError::Cancelled => EIO,
            FsError::Unclassified { .. } => EIO,
        }
    }

    /// etcd code of an unclassified structured error.
    pub fn store_code(&self) -> Option<ErrorCode> {
        match self {
            FsError::Unclassified { source, .. } => source.code(),
            _ => None,
        }
    }
}
