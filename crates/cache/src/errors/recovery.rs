//! Recovery utilities for cache errors

use super::types::CacheError;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

/// Recovery hints for error handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryHint {
    /// Move on to the next ranked gateway
    TryNextGateway,

    /// Verify network connectivity before retrying
    CheckNetwork,

    /// Retry the operation after a delay
    Retry { after: Duration },

    /// Check file permissions
    CheckPermissions { path: PathBuf },

    /// Free disk space or lower the cache limit
    CheckDiskSpace,

    /// Reopen the metadata store
    ReopenStore,

    /// Update cache configuration
    UpdateConfiguration,

    /// No recovery possible
    NoRecovery,
}

impl CacheError {
    /// Get the recovery hint for this error
    #[must_use]
    pub fn recovery_hint(&self) -> RecoveryHint {
        match self {
            Self::GatewayUnreachable { .. } => RecoveryHint::TryNextGateway,
            Self::AllGatewaysFailed { .. } => RecoveryHint::CheckNetwork,
            Self::Persistence { .. } => RecoveryHint::ReopenStore,
            Self::Filesystem { path, source, .. } => match source.kind() {
                ErrorKind::PermissionDenied => RecoveryHint::CheckPermissions { path: path.clone() },
                ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted => {
                    RecoveryHint::Retry {
                        after: Duration::from_millis(100),
                    }
                }
                _ => RecoveryHint::CheckDiskSpace,
            },
            Self::InvalidCid { .. } => RecoveryHint::NoRecovery,
            Self::Cancelled { .. } => RecoveryHint::NoRecovery,
            Self::Configuration { .. } => RecoveryHint::UpdateConfiguration,
        }
    }

    /// Check if this error is transient and can be retried
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self.recovery_hint(),
            RecoveryHint::Retry { .. } | RecoveryHint::CheckNetwork | RecoveryHint::TryNextGateway
        )
    }

    /// Check if the failure is confined to one gateway
    #[must_use]
    pub const fn is_gateway_failure(&self) -> bool {
        matches!(self, Self::GatewayUnreachable { .. })
    }

    /// Check if the caller cancelled the operation
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
