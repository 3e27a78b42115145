//! Checkpoint store adapter for the migration pipeline.
//!
//! Exposes a typed [`Checkpoint`] handle over a Redis-compatible key/value store,
//! serializing all reads and writes under one mutex so the exporter's fixed commit
//! order is never interleaved with itself across stages.

pub mod checkpoint;
pub mod error;
pub mod keys;
pub mod store;

pub use checkpoint::{Checkpoint, StartupState};
pub use error::CheckpointError;
pub use keys::CheckpointKeys;
pub use store::{CheckpointStore, RedisCheckpointStore};
