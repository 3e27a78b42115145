//! Destination adapter error types.

/// Errors surfaced by a [`crate::client::DestinationClient`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum DestinationError {
    /// The HTTP request could not be sent or the connection failed.
    #[error("destination transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The destination cluster responded with a non-success status for the whole batch.
    #[error("destination cluster returned {status}: {body}")]
    Response {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated for logging.
        body: String,
    },
}
