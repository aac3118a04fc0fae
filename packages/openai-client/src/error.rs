//! Typed errors for the OpenAI client.

use thiserror::Error;

/// Errors returned by the OpenAI client.
#[derive(Debug, Error)]
pub enum OpenAIError {
    /// Client configuration problem (missing API key, bad base URL)
    #[error("config error: {0}")]
    Config(String),

    /// Transport-level failure (DNS, TLS, timeout)
    #[error("network error: {0}")]
    Network(String),

    /// Non-success response from the API
    #[error("OpenAI API error: {0}")]
    Api(String),

    /// Response body could not be parsed into the expected shape
    #[error("parse error: {0}")]
    Parse(String),
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, OpenAIError>;
