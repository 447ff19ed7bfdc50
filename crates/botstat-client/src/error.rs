//! Error types for the botstat client

use thiserror::Error;

/// Errors that can occur when using the botstat client
#[derive(Error, Debug)]
pub enum BotStatError {
    /// HTTP request failed at the transport level
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading an upload source failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Response `result` did not match the expected record shape
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A required credential was not supplied, detected before any network call
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Upload input cannot be turned into a readable stream
    #[error("unsupported upload input: {0}")]
    UnsupportedInput(String),

    /// The service returned a non-200 status or an `ok: false` envelope
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Message extracted from the envelope, or raw response text
        message: String,
    },
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, BotStatError>;
