//! Sync engine error types

use monicu_common::ConfigError;
use monicu_core::DomainError;
use monicu_discord::DiscordError;

/// Errors a reconciliation step reports to the event loop
///
/// "Not found, skip" conditions never reach this type; they are absorbed by
/// the reconcilers and reported as [`Reconciled::Ignored`](super::Reconciled).
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Store failure
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Gateway, REST, or image probe failure
    #[error(transparent)]
    Discord(#[from] DiscordError),

    /// Invalid scope configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Shutdown was requested while the operation was in flight
    #[error("Operation cancelled by shutdown")]
    Cancelled,

    /// A [`SyncContextBuilder`](super::SyncContextBuilder) was missing a part
    #[error("Missing dependency: {0}")]
    MissingDependency(&'static str),
}

impl SyncError {
    /// Cancellation is expected during shutdown and is not logged as a failure
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Short code for structured logs
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Domain(e) => e.code(),
            Self::Discord(DiscordError::RateLimited { .. }) => "RATE_LIMITED",
            Self::Discord(_) => "DISCORD_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Cancelled => "CANCELLED",
            Self::MissingDependency(_) => "MISSING_DEPENDENCY",
        }
    }
}

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;
    use monicu_core::Snowflake;
    use std::time::Duration;

    #[test]
    fn test_cancelled() {
        assert!(SyncError::Cancelled.is_cancelled());
        assert!(!SyncError::from(DomainError::TransactionFinished).is_cancelled());
    }

    #[test]
    fn test_error_codes() {
        let err = SyncError::from(DiscordError::RateLimited {
            retry_after: Duration::from_secs(2),
        });
        assert_eq!(err.error_code(), "RATE_LIMITED");

        let err = SyncError::from(DomainError::PostAlreadyExists(Snowflake::new(1)));
        assert_eq!(err.error_code(), DomainError::PostAlreadyExists(Snowflake::new(1)).code());
        assert_eq!(SyncError::MissingDependency("store").to_string(), "Missing dependency: store");
    }
}
