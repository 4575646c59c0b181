//! Error types for the session activity monitor.

/// Error type for session monitor operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `init` was called outside a tokio runtime.
    #[error("No tokio runtime available to drive the session monitor")]
    NoRuntime,

    /// An operation needs `init` to have been called first.
    #[error("Session monitor is not initialized")]
    NotInitialized,

    /// The configured durations are inconsistent.
    #[error("Invalid session config: {0}")]
    InvalidConfig(String),

    /// The activity store could not be read or written.
    #[error("Storage error for '{key}': {message}")]
    Storage { key: String, message: String },

    /// The auth collaborator failed.
    #[error("Auth error: {0}")]
    Auth(String),

    /// Stored data could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    pub fn storage(key: &str, message: impl std::fmt::Display) -> Self {
        Error::Storage {
            key: key.to_string(),
            message: message.to_string(),
        }
    }
}

/// Result type for session monitor operations.
pub type Result<T> = std::result::Result<T, Error>;
