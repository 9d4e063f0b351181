//! Error types for the matchmaking service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific matchmaking scenarios
#[derive(Debug, thiserror::Error)]
pub enum MatchmakingError {
    #[error("Invalid join request: {reason}")]
    InvalidJoinRequest { reason: String },

    #[error("Matchmaking coordinator is not running")]
    CoordinatorUnavailable,

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}
