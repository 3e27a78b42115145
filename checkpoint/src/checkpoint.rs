//! Typed, mutex-serialized access to a migration's checkpoint record.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use crate::error::CheckpointError;
use crate::keys::CheckpointKeys;
use crate::store::CheckpointStore;

/// The four checkpoint keys read at exporter startup.
#[derive(Debug, Clone, Default)]
pub struct StartupState {
    /// `hit_id` of the most recently committed document, if any.
    pub last_id: Option<String>,
    /// Most recently observed scroll token, if any.
    pub last_offset: Option<String>,
}

/// Serializes all checkpoint reads and writes under a single process-wide mutex.
///
/// Writes across the four keys are not transactional: a crash between two `commit_*`
/// calls leaves a partially-updated record, which readers at startup must tolerate.
#[derive(Clone)]
pub struct Checkpoint {
    store: Arc<dyn CheckpointStore>,
    keys: CheckpointKeys,
    lock: Arc<Mutex<()>>,
}

impl Checkpoint {
    /// Wrap `store` with the given key names.
    #[must_use]
    pub fn new(store: Arc<dyn CheckpointStore>, keys: CheckpointKeys) -> Self {
        Self {
            store,
            keys,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Read `last_id` and `last_offset` for exporter startup.
    pub async fn read_startup_state(&self) -> Result<StartupState, CheckpointError> {
        let _guard = self.lock.lock().await;
        let last_id = self.store.get(&self.keys.last_id).await?;
        let last_offset = self.store.get(&self.keys.last_offset).await?;
        Ok(StartupState {
            last_id,
            last_offset,
        })
    }

    /// Read the current `last_count`, defaulting to 0 when never set.
    pub async fn read_count(&self) -> Result<u64, CheckpointError> {
        let _guard = self.lock.lock().await;
        let raw = self.store.get(&self.keys.last_count).await?;
        Ok(raw.and_then(|s| s.parse().ok()).unwrap_or(0))
    }

    /// Commit the scroll token observed for the document about to be emitted.
    ///
    /// Logs and returns `Ok(())` on a write failure: checkpoint writes are best-effort,
    /// per the checkpoint-write-error policy.
    pub async fn commit_offset(&self, token: &str) {
        self.commit(&self.keys.last_offset.clone(), token).await;
    }

    /// Commit the incremented emitted-document count.
    pub async fn commit_count(&self, count: u64) {
        self.commit(&self.keys.last_count.clone(), &count.to_string())
            .await;
    }

    /// Commit the `hit_id` of the document just placed on the raw queue.
    pub async fn commit_id(&self, hit_id: &str) {
        self.commit(&self.keys.last_id.clone(), hit_id).await;
    }

    /// Commit the raw JSON of the document just placed on the raw queue (diagnostics).
    pub async fn commit_doc(&self, doc_json: &str) {
        self.commit(&self.keys.last_doc.clone(), doc_json).await;
    }

    async fn commit(&self, key: &str, value: &str) {
        let _guard = self.lock.lock().await;
        if let Err(e) = self.store.set(key, value).await {
            warn!("Failed to write checkpoint key {}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct FakeStore {
        data: StdMutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl CheckpointStore for FakeStore {
        async fn get(&self, key: &str) -> Result<Option<String>, CheckpointError> {
            Ok(self.data.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), CheckpointError> {
            self.data
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn ping(&self) -> Result<(), CheckpointError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn startup_state_defaults_to_none() {
        let cp = Checkpoint::new(Arc::new(FakeStore::default()), CheckpointKeys::default());
        let state = cp.read_startup_state().await.unwrap();
        assert!(state.last_id.is_none());
        assert!(state.last_offset.is_none());
        assert_eq!(cp.read_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn commits_round_trip() {
        let cp = Checkpoint::new(Arc::new(FakeStore::default()), CheckpointKeys::default());
        cp.commit_offset("tok-1").await;
        cp.commit_count(1).await;
        cp.commit_id("doc-1").await;
        cp.commit_doc("{\"a\":1}").await;

        let state = cp.read_startup_state().await.unwrap();
        assert_eq!(state.last_id.as_deref(), Some("doc-1"));
        assert_eq!(state.last_offset.as_deref(), Some("tok-1"));
        assert_eq!(cp.read_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn count_is_monotonic_across_commits() {
        let cp = Checkpoint::new(Arc::new(FakeStore::default()), CheckpointKeys::default());
        for n in 1..=5u64 {
            cp.commit_count(n).await;
            assert_eq!(cp.read_count().await.unwrap(), n);
        }
    }
}
