//! Checkpoint store trait and the Redis-backed implementation.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{info, warn};

use crate::error::CheckpointError;

/// Minimal get/set/ping surface the pipeline needs from a key/value store.
///
/// Missing keys are treated as "never set", not an error: implementations return
/// `Ok(None)` rather than a `NotFound` variant.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Read a value, or `None` if the key has never been set.
    async fn get(&self, key: &str) -> Result<Option<String>, CheckpointError>;

    /// Write a value, overwriting any prior value for `key`.
    async fn set(&self, key: &str, value: &str) -> Result<(), CheckpointError>;

    /// Check connectivity to the store.
    async fn ping(&self) -> Result<(), CheckpointError>;
}

/// Redis-backed [`CheckpointStore`] using a multiplexed async connection.
#[derive(Clone)]
pub struct RedisCheckpointStore {
    conn: ConnectionManager,
}

impl RedisCheckpointStore {
    /// Connect to `url`, retrying with a fixed 2s interval up to `max_attempts` times.
    ///
    /// Mirrors the startup retry loop used elsewhere in the workspace for external
    /// dependencies that may not be up yet when the process starts.
    pub async fn connect(url: &str, max_attempts: usize) -> Result<Self, CheckpointError> {
        let client = redis::Client::open(url)?;

        for attempt in 1..=max_attempts {
            match client.get_connection_manager().await {
                Ok(conn) => {
                    let store = Self { conn };
                    if store.ping().await.is_ok() {
                        info!("Connected to checkpoint store");
                        return Ok(store);
                    }
                }
                Err(e) => {
                    warn!(
                        "Checkpoint store connection attempt {}/{} failed: {}",
                        attempt, max_attempts, e
                    );
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }

        Err(CheckpointError::Unreachable {
            attempts: max_attempts,
        })
    }
}

#[async_trait]
impl CheckpointStore for RedisCheckpointStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CheckpointError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CheckpointError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CheckpointError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
