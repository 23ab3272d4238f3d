//! Storage error types / 存储错误类型

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Error returned by filesystem operations / 文件系统操作错误
///
/// Backend failures keep their underlying cause so callers can tell a missing
/// object from a denied request or a network error.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found: {path}")]
    NotFound { path: String },

    #[error("permission denied: {path}")]
    PermissionDenied {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("{operation} failed for {path}: {source}")]
    Backend {
        operation: &'static str,
        path: String,
        #[source]
        source: BoxError,
    },

    /// Copy succeeded but removing the source failed; both objects exist
    #[error("rename {from} -> {to} incomplete, source not removed: {source}")]
    RenameIncomplete {
        from: String,
        to: String,
        #[source]
        source: Box<StorageError>,
    },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("refusing to delete the root directory")]
    RootViolation,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("operation not supported by this driver: {0}")]
    Unsupported(&'static str),
}

impl StorageError {
    pub fn backend(operation: &'static str, path: &str, source: impl Into<BoxError>) -> Self {
        StorageError::Backend {
            operation,
            path: path.to_string(),
            source: source.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}
