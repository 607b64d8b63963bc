//! Proxy error types. Every variant ends in a denial, never an allow.

/// Errors raised while answering a permission prompt.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The prompt arguments matched neither accepted shape.
    #[error("invalid permission prompt: {0}")]
    InvalidParams(String),

    /// The broker could not be reached or did not answer in time.
    #[error("broker unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// The broker answered with a non-success status.
    #[error("broker returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The broker's answer could not be decoded.
    #[error("malformed broker response: {0}")]
    Malformed(String),
}
