//! Core error types for the cache system

use std::path::PathBuf;
use std::sync::Arc;

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Error type for cache operations
///
/// Cloneable so that the outcome of a coalesced download can be handed to
/// every caller waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// A single gateway could not serve the request
    #[error("gateway '{endpoint}' unreachable: {reason}")]
    GatewayUnreachable { endpoint: String, reason: String },

    /// Every configured gateway failed for a CID
    #[error("all {attempts} gateways failed for '{cid}'")]
    AllGatewaysFailed { cid: String, attempts: usize },

    /// Metadata database failure
    #[error("metadata store {operation} failed: {message}")]
    Persistence {
        operation: &'static str,
        message: String,
        #[source]
        source: Option<Arc<rusqlite::Error>>,
    },

    /// File system operation failure
    #[error("file system {operation} failed for '{}': {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        operation: &'static str,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// CID that cannot be used as a cache file name
    #[error("invalid content identifier '{cid}': {reason}")]
    InvalidCid { cid: String, reason: String },

    /// Caller cancelled the operation between gateway attempts
    #[error("operation on '{cid}' was cancelled")]
    Cancelled { cid: String },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl CacheError {
    /// Create a gateway failure for one endpoint
    #[must_use]
    pub fn gateway(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Self::GatewayUnreachable {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a file system error with the failing path and operation
    #[must_use]
    pub fn filesystem(
        path: impl Into<PathBuf>,
        operation: &'static str,
        source: std::io::Error,
    ) -> Self {
        Self::Filesystem {
            path: path.into(),
            operation,
            source: Arc::new(source),
        }
    }

    /// Wrap a database error raised during `operation`
    #[must_use]
    pub fn persistence(operation: &'static str, source: rusqlite::Error) -> Self {
        Self::Persistence {
            operation,
            message: source.to_string(),
            source: Some(Arc::new(source)),
        }
    }

    /// Database failure without an underlying rusqlite error
    #[must_use]
    pub fn persistence_message(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Persistence {
            operation,
            message: message.into(),
            source: None,
        }
    }

    /// Create an invalid CID error
    #[must_use]
    pub fn invalid_cid(cid: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCid {
            cid: cid.into(),
            reason: reason.into(),
        }
    }

    /// Create a cancellation error
    #[must_use]
    pub fn cancelled(cid: impl Into<String>) -> Self {
        Self::Cancelled { cid: cid.into() }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
