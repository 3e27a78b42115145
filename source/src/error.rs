//! Source adapter error types.

/// Errors surfaced by a [`crate::client::SourceClient`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The scroll cursor's server-side TTL expired. The caller must restart scanning
    /// from the beginning and rely on skip-until semantics to avoid re-emitting work.
    #[error("scroll cursor expired")]
    CursorExpired,

    /// The HTTP request could not be sent or the connection failed.
    #[error("source transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The source cluster responded with a non-success status.
    #[error("source cluster returned {status}: {body}")]
    Response {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated for logging.
        body: String,
    },

    /// The response envelope could not be parsed as the expected scroll/hit shape.
    #[error("malformed source response: {0}")]
    MalformedResponse(String),
}
