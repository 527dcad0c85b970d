//! Domain errors - error types for the domain and storage layers

use thiserror::Error;

use crate::value_objects::Snowflake;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Community not found: {0}")]
    CommunityNotFound(Snowflake),

    #[error("Channel not found: {0}")]
    ChannelNotFound(Snowflake),

    #[error("Post not found: {0}")]
    PostNotFound(Snowflake),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid snowflake: {0:?}")]
    InvalidSnowflake(String),

    // =========================================================================
    // Conflict Errors
    // =========================================================================
    #[error("Post already exists: {0}")]
    PostAlreadyExists(Snowflake),

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Transaction already finished")]
    TransactionFinished,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::CommunityNotFound(_) => "UNKNOWN_COMMUNITY",
            Self::ChannelNotFound(_) => "UNKNOWN_CHANNEL",
            Self::PostNotFound(_) => "UNKNOWN_POST",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InvalidSnowflake(_) => "INVALID_SNOWFLAKE",
            Self::PostAlreadyExists(_) => "POST_ALREADY_EXISTS",
            Self::TransactionFinished => "TRANSACTION_FINISHED",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::CommunityNotFound(_) | Self::ChannelNotFound(_) | Self::PostNotFound(_)
        )
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError(_) | Self::InvalidSnowflake(_))
    }

    /// Check if this is a conflict error
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::PostAlreadyExists(_))
    }
}
