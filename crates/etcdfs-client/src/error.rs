use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Error codes returned by the etcd v2 keys API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "u64")]
pub enum ErrorCode {
    /// 100: the key does not exist.
    KeyNotFound,
    /// 101: compare condition failed.
    TestFailed,
    /// 102: the key is a directory, a file was expected.
    NotFile,
    /// 104: a path component is a file, a directory was expected.
    NotDir,
    /// 105: the key already exists.
    NodeExist,
    /// 107: the root is read-only.
    RootReadOnly,
    /// 108: the directory is not empty.
    DirNotEmpty,
    /// 110: the request was not authorized.
    Unauthorized,
    /// 300: raft internal error.
    RaftInternal,
    /// 301: leader election in progress.
    LeaderElect,
    /// 400: the watcher was cleared.
    WatcherCleared,
    /// 401: the requested event index is outdated.
    EventIndexCleared,
    /// Any code without a named variant.
    Other(u64),
}

impl ErrorCode {
    /// Numeric code as sent on the wire.
    pub fn as_u64(self) -> u64 {
        match self {
            ErrorCode::KeyNotFound => 100,
            ErrorCode::TestFailed => 101,
            ErrorCode::NotFile => 102,
            ErrorCode::NotDir => 104,
            ErrorCode::NodeExist => 105,
            ErrorCode::RootReadOnly => 107,
            ErrorCode::DirNotEmpty => 108,
            ErrorCode::Unauthorized => 110,
            ErrorCode::RaftInternal => 300,
            ErrorCode::LeaderElect => 301,
            ErrorCode::WatcherCleared => 400,
            ErrorCode::EventIndexCleared => 401,
            ErrorCode::Other(code) => code,
        }
    }
}

impl From<u64> for ErrorCode {
    fn from(code: u64) -> Self {
        match code {
            100 => ErrorCode::KeyNotFound,
            101 => ErrorCode::TestFailed,
            102 => ErrorCode::NotFile,
            104 => ErrorCode::NotDir,
            105 => ErrorCode::NodeExist,
            107 => ErrorCode::RootReadOnly,
            108 => ErrorCode::DirNotEmpty,
            110 => ErrorCode::Unauthorized,
            300 => ErrorCode::RaftInternal,
            301 => ErrorCode::LeaderElect,
            400 => ErrorCode::WatcherCleared,
            401 => ErrorCode::EventIndexCleared,
            other => ErrorCode::Other(other),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u64())
    }
}

/// Error body the keys API sends with non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    /// etcd error code.
    #[serde(rename = "errorCode")]
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Usually the offending key.
    #[serde(default)]
    pub cause: String,
    /// Store index at the time of the error.
    #[serde(default)]
    pub index: u64,
}

/// Errors produced by a [`crate::KeysApi`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Structured error reported by etcd itself.
    #[error("{code}: {message} ({cause}) [{index}]")]
    Api {
        /// etcd error code.
        code: ErrorCode,
        /// Human-readable message.
        message: String,
        /// Usually the offending key.
        cause: String,
        /// Store index at the time of the error.
        index: u64,
    },

    /// The request never produced an HTTP response.
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        /// Endpoint the request was sent to.
        endpoint: String,
        /// Underlying HTTP client error.
        source: reqwest::Error,
    },

    /// Non-2xx response without an etcd error body.
    #[error("unexpected HTTP status {status} from {endpoint}")]
    Status {
        /// Endpoint that answered.
        endpoint: String,
        /// HTTP status code.
        status: u16,
    },

    /// A 2xx response whose body could not be decoded.
    #[error("malformed response from {endpoint}: {reason}")]
    Decode {
        /// Endpoint that answered.
        endpoint: String,
        /// Decoder message.
        reason: String,
    },

    /// An endpoint could not be turned into a usable URL.
    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint {
        /// Endpoint as configured.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The endpoint list was empty.
    #[error("no etcd endpoints configured")]
    NoEndpoints,

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Every endpoint failed at the transport level.
    #[error("all {attempts} etcd endpoints failed")]
    Unavailable {
        /// Number of endpoints tried.
        attempts: usize,
        /// Failure of the last endpoint tried.
        #[source]
        last: Box<StoreError>,
    },
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// etcd error code, for structured errors only.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            StoreError::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True when etcd itself reported the error.
    pub fn is_structured(&self) -> bool {
        matches!(self, StoreError::Api { .. })
    }

    /// True when another endpoint may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Transport { .. } => true,
            StoreError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<ApiError> for StoreError {
    fn from(err: ApiError) -> Self {
        StoreError::Api {
            code: err.code,
            message: err.message,
            cause: err.cause,
            index: err.index,
        }
    }
}
