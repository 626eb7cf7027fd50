//! Web API error types

/// Errors from Web API calls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport failure: connection refused, timeout, TLS
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Non-success status from the Web API, with its body text
    #[error("Spotify API returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("invalid response body: {0}")]
    Decode(String),
}

/// Result alias for Web API calls.
pub type Result<T> = std::result::Result<T, Error>;
