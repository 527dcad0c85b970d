//! Process-level errors
//!
//! Failures while starting or running one of the binaries. The read API
//! also wraps these so a store outage surfaces with a status code.

use std::io;

use monicu_core::DomainError;

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Server error: {0}")]
    Server(#[source] io::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl AppError {
    /// HTTP status for this error when it reaches a client
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::StoreUnavailable(_) => 503,
            Self::Config(_) | Self::InvalidAddress(_) | Self::Bind { .. } | Self::Server(_) => 500,
            Self::Domain(e) if e.is_not_found() => 404,
            Self::Domain(e) if e.is_validation() => 400,
            Self::Domain(e) if e.is_conflict() => 409,
            Self::Domain(_) => 500,
        }
    }

    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::InvalidAddress(_) => "INVALID_ADDRESS",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Bind { .. } | Self::Server(_) => "SERVER_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Domain(e) => e.code(),
        }
    }

    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn bind(addr: impl ToString, source: io::Error) -> Self {
        Self::Bind {
            addr: addr.to_string(),
            source,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use monicu_core::Snowflake;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::not_found("post 7").status_code(), 404);
        assert_eq!(AppError::StoreUnavailable("refused".into()).status_code(), 503);
        assert_eq!(AppError::InvalidAddress("nowhere".into()).status_code(), 500);
        assert_eq!(
            AppError::Domain(DomainError::PostNotFound(Snowflake::new(1))).status_code(),
            404
        );
    }

    #[test]
    fn test_config_error_is_server_side() {
        let err = AppError::from(ConfigError::MissingVar("discord.token"));
        assert!(err.is_server_error());
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_bind_message_names_address() {
        let err = AppError::bind(
            "127.0.0.1:1",
            io::Error::new(io::ErrorKind::AddrInUse, "in use"),
        );
        assert_eq!(err.to_string(), "Failed to bind to 127.0.0.1:1: in use");
        assert_eq!(err.error_code(), "SERVER_ERROR");
    }
}
