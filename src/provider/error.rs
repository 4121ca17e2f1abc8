//! Provider client error types.

use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors from the model-provider API.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP transport failed.
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a structured error body. The message is
    /// relayed to clients; the remaining fields are kept for logs.
    #[error("{message}")]
    Api {
        message: String,
        kind: Option<String>,
        param: Option<String>,
        code: Option<String>,
    },

    /// Non-success status without a parseable error body.
    #[error("provider returned HTTP {status}")]
    Status { status: u16 },

    /// The response body did not match the expected shape.
    #[error("failed to parse provider response: {0}")]
    Parse(String),

    /// The event stream failed mid-flight.
    #[error("provider stream error: {0}")]
    Stream(String),
}
