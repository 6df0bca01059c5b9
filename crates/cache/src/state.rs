//! Tri-state result for live query views

use crate::errors::{CacheError, Result};

/// State of an asynchronously produced value
#[derive(Debug, Clone)]
pub enum LoadState<T> {
    Loading,
    Success(T),
    Failure(CacheError),
}

impl<T> LoadState<T> {
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Borrow the value if loaded successfully
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Loading | Self::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&CacheError> {
        match self {
            Self::Failure(error) => Some(error),
            Self::Loading | Self::Success(_) => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> LoadState<U> {
        match self {
            Self::Loading => LoadState::Loading,
            Self::Success(value) => LoadState::Success(f(value)),
            Self::Failure(error) => LoadState::Failure(error),
        }
    }
}

impl<T> From<Result<T>> for LoadState<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(error) => Self::Failure(error),
        }
    }
}
