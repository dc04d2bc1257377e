//! Translation of store failures into filesystem errors.

use etcdfs_client::{ErrorCode, StoreError};

use crate::error::FsError;

/// Classify a failed read of `key`.
///
/// Only structured etcd errors are inspected; transport and protocol
/// failures are passed through untouched. Permission denied comes from
/// error code 110 alone: a bare HTTP 401 without an etcd error body is an
/// ordinary I/O failure.
pub fn classify(key: &str, err: StoreError) -> FsError {
    let key = key.to_string();
    match err.code() {
        Some(ErrorCode::KeyNotFound) => FsError::NotFound { key },
        Some(ErrorCode::NotDir) => FsError::NotADirectory { key },
        Some(ErrorCode::Unauthorized) => FsError::PermissionDenied { key },
        _ => FsError::Unclassified { key, source: err },
    }
}
