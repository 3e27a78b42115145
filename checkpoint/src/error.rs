//! Checkpoint store error types.

/// Errors surfaced by a [`crate::store::CheckpointStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// The underlying store could not be reached or returned a protocol error.
    #[error("checkpoint store transport error: {0}")]
    Transport(#[from] redis::RedisError),

    /// The store could not be reached after the configured number of startup pings.
    #[error("checkpoint store unreachable after {attempts} attempts")]
    Unreachable {
        /// Number of ping attempts made before giving up.
        attempts: usize,
    },
}
