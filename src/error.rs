//! Error types for Querychat
//!
//! This module defines all error types used throughout the client,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Querychat operations
///
/// Covers transport failures, authentication resets, remote API rejections,
/// local state conflicts, configuration, and credential storage.
#[derive(Error, Debug)]
pub enum QuerychatError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The request never produced a response (connect failure, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Authentication errors (401/403 or rejected credentials)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Loading a session's history failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The service answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the service
        status: u16,
        /// Body or reason text returned with the status
        message: String,
    },

    /// A message exchange is already in flight for the active session
    #[error("A request is already in progress; wait for the reply")]
    Busy,

    /// Input was rejected before anything was sent
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The referenced chat session is not in the registry
    #[error("Unknown chat session: {0}")]
    SessionNotFound(String),

    /// Credential storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

impl QuerychatError {
    /// Returns `true` when `err` carries an authentication failure.
    ///
    /// Authentication failures are never handled locally in the chat pane;
    /// callers use this to let them propagate to the top level.
    pub fn is_authentication(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<QuerychatError>(),
            Some(QuerychatError::Authentication(_))
        )
    }
}

/// Result type alias for Querychat operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
