//! Error conversion utilities

use super::types::CacheError;
use std::path::PathBuf;

impl From<std::io::Error> for CacheError {
    fn from(error: std::io::Error) -> Self {
        Self::filesystem(PathBuf::from("."), "unknown", error)
    }
}

impl From<rusqlite::Error> for CacheError {
    fn from(error: rusqlite::Error) -> Self {
        Self::persistence("statement", error)
    }
}

/// Config files are JSON; parse failures are configuration errors
impl From<serde_json::Error> for CacheError {
    fn from(error: serde_json::Error) -> Self {
        Self::configuration(format!("invalid JSON configuration: {error}"))
    }
}

impl From<url::ParseError> for CacheError {
    fn from(error: url::ParseError) -> Self {
        Self::configuration(format!("invalid URL: {error}"))
    }
}
