//! Error types for the Vesper assistant

use thiserror::Error;

/// Result type alias for Vesper operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the assistant pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio capture or playback error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech recognition error
    #[error("recognition error: {0}")]
    Recognition(String),

    /// Backend returned a non-success HTTP status
    #[error("backend error {status}: {body}")]
    BackendStatus {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        body: String,
    },

    /// Speech synthesis error
    #[error("speech error: {0}")]
    Speech(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
