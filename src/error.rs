//! Error types for the MinIO activity

use thiserror::Error;

/// MinIO activity error type.
#[derive(Error, Debug)]
pub enum MinioError {
    /// Payload missing or of the wrong shape
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A value could not be rendered in the requested format
    #[error("Encoding failure: {0}")]
    EncodingFailure(String),

    /// Storage backend error
    #[error("Backend error: {message}")]
    Backend {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Required setting is absent
    #[error("Missing required setting: {0}")]
    MissingSetting(String),

    /// TLS material could not be loaded
    #[error("TLS error: {0}")]
    Tls(String),

    /// File system error
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MinioError {
    pub(crate) fn backend(message: impl std::fmt::Display) -> Self {
        Self::Backend {
            message: message.to_string(),
        }
    }
}

/// Result type alias for MinIO activity operations.
pub type Result<T> = std::result::Result<T, MinioError>;
