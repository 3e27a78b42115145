//! Importer stage: batches documents and submits them to the destination.

use std::sync::Arc;

use destination::{encode_action_and_source, DestinationClient};
use serde_json::Value;
use tokio::sync::mpsc::Receiver;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::backoff::{retry, BackoffConfig};

/// Importer stage parameters.
#[derive(Debug, Clone)]
pub struct ImporterConfig {
    /// Destination index to write into.
    pub index: String,
    /// Document-count flush trigger.
    pub bulk_size: usize,
    /// Payload-byte flush trigger. A single document larger than this is still sent
    /// alone in its own payload.
    pub max_bulk_bytes: usize,
    /// Backoff applied to failed `bulk_index` submissions.
    pub backoff: BackoffConfig,
}

/// Summary returned by a completed importer run.
#[derive(Debug, Default, Clone)]
pub struct ImporterReport {
    /// Number of documents successfully submitted across all flushes.
    pub submitted: u64,
    /// Number of documents dropped after exhausting retries.
    pub dropped: u64,
}

/// Drain `rx`, batching documents by count and byte budget, submitting each batch to
/// `destination` with retry, until `rx` is closed and drained.
pub async fn run_importer(
    destination: Arc<dyn DestinationClient>,
    config: ImporterConfig,
    mut rx: Receiver<Value>,
) -> ImporterReport {
    let mut pending: Vec<Value> = Vec::new();
    let mut pending_bytes: usize = 0;
    let mut report = ImporterReport::default();

    while let Some(doc) = rx.recv().await {
        let doc_bytes = encode_action_and_source(&config.index, &doc).len();

        if !pending.is_empty() && pending_bytes + doc_bytes > config.max_bulk_bytes {
            flush(&destination, &config, &mut pending, &mut report).await;
            pending_bytes = 0;
        }

        pending_bytes += doc_bytes;
        pending.push(doc);

        if pending.len() >= config.bulk_size {
            flush(&destination, &config, &mut pending, &mut report).await;
            pending_bytes = 0;
        }
    }

    if !pending.is_empty() {
        flush(&destination, &config, &mut pending, &mut report).await;
    }

    report
}

/// Like [`run_importer`], but pulls from a `rx` shared across `import_workers`
/// concurrent importer tasks instead of owning it outright. Used by the
/// orchestrator, which fans multiple importer workers out over one ready queue.
pub async fn run_importer_shared(
    destination: Arc<dyn DestinationClient>,
    config: ImporterConfig,
    rx: Arc<Mutex<Receiver<Value>>>,
) -> ImporterReport {
    let mut pending: Vec<Value> = Vec::new();
    let mut pending_bytes: usize = 0;
    let mut report = ImporterReport::default();

    loop {
        let doc = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(doc) = doc else {
            break;
        };

        let doc_bytes = encode_action_and_source(&config.index, &doc).len();

        if !pending.is_empty() && pending_bytes + doc_bytes > config.max_bulk_bytes {
            flush(&destination, &config, &mut pending, &mut report).await;
            pending_bytes = 0;
        }

        pending_bytes += doc_bytes;
        pending.push(doc);

        if pending.len() >= config.bulk_size {
            flush(&destination, &config, &mut pending, &mut report).await;
            pending_bytes = 0;
        }
    }

    if !pending.is_empty() {
        flush(&destination, &config, &mut pending, &mut report).await;
    }

    report
}

async fn flush(
    destination: &Arc<dyn DestinationClient>,
    config: &ImporterConfig,
    pending: &mut Vec<Value>,
    report: &mut ImporterReport,
) {
    if pending.is_empty() {
        return;
    }

    let batch = std::mem::take(pending);
    let batch_len = batch.len();
    let index = config.index.clone();

    let result = retry(config.backoff, "bulk_index", || {
        let batch = batch.clone();
        let destination = Arc::clone(destination);
        let index = index.clone();
        async move { destination.bulk_index(&index, &batch).await }
    })
    .await;

    match result {
        Ok(outcome) => {
            if outcome.has_item_errors() {
                warn!(
                    "Bulk batch of {} documents had {} per-item failures",
                    batch_len, outcome.item_errors
                );
            } else {
                info!("Submitted bulk batch of {} documents", batch_len);
            }
            report.submitted += batch_len as u64;
        }
        Err(e) => {
            error!(
                "Dropping batch of {} documents after exhausting retries: {}",
                batch_len, e
            );
            report.dropped += batch_len as u64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use destination::{BulkOutcome, DestinationError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct RecordingDestination {
        batches: StdMutex<Vec<usize>>,
        fail_next_n: AtomicUsize,
    }

    #[async_trait]
    impl DestinationClient for RecordingDestination {
        async fn index_exists(&self, _index: &str) -> Result<bool, DestinationError> {
            Ok(true)
        }

        async fn bulk_index(
            &self,
            _index: &str,
            docs: &[Value],
        ) -> Result<BulkOutcome, DestinationError> {
            if self.fail_next_n.load(Ordering::SeqCst) > 0 {
                self.fail_next_n.fetch_sub(1, Ordering::SeqCst);
                return Err(DestinationError::Response {
                    status: 503,
                    body: "unavailable".into(),
                });
            }
            self.batches.lock().unwrap().push(docs.len());
            Ok(BulkOutcome {
                submitted: docs.len(),
                item_errors: 0,
            })
        }
    }

    fn fast_backoff() -> BackoffConfig {
        BackoffConfig {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            max_retries: 5,
        }
    }

    #[tokio::test]
    async fn flushes_on_count_threshold() {
        let dest = Arc::new(RecordingDestination {
            batches: StdMutex::new(vec![]),
            fail_next_n: AtomicUsize::new(0),
        });
        let (tx, rx) = mpsc::channel(100);
        let config = ImporterConfig {
            index: "dest".into(),
            bulk_size: 3,
            max_bulk_bytes: 10_000_000,
            backoff: fast_backoff(),
        };

        for n in 0..7 {
            tx.send(serde_json::json!({"n": n})).await.unwrap();
        }
        drop(tx);

        let report = run_importer(dest.clone(), config, rx).await;
        assert_eq!(report.submitted, 7);
        assert_eq!(*dest.batches.lock().unwrap(), vec![3, 3, 1]);
    }

    #[tokio::test]
    async fn oversized_single_document_goes_alone() {
        let dest = Arc::new(RecordingDestination {
            batches: StdMutex::new(vec![]),
            fail_next_n: AtomicUsize::new(0),
        });
        let (tx, rx) = mpsc::channel(100);
        let small = serde_json::json!({"v": "x"});
        let big = serde_json::json!({"v": "y".repeat(200)});

        let config = ImporterConfig {
            index: "dest".into(),
            bulk_size: 100,
            max_bulk_bytes: 50,
            backoff: fast_backoff(),
        };

        tx.send(small.clone()).await.unwrap();
        tx.send(big).await.unwrap();
        tx.send(small).await.unwrap();
        drop(tx);

        let report = run_importer(dest.clone(), config, rx).await;
        assert_eq!(report.submitted, 3);
        // Each doc exceeds the 50-byte budget combined with any sibling, so every
        // flush is forced to size 1.
        assert_eq!(*dest.batches.lock().unwrap(), vec![1, 1, 1]);
    }

    #[tokio::test]
    async fn retries_then_succeeds_on_transient_failure() {
        let dest = Arc::new(RecordingDestination {
            batches: StdMutex::new(vec![]),
            fail_next_n: AtomicUsize::new(2),
        });
        let (tx, rx) = mpsc::channel(100);
        let config = ImporterConfig {
            index: "dest".into(),
            bulk_size: 1,
            max_bulk_bytes: 10_000_000,
            backoff: fast_backoff(),
        };

        tx.send(serde_json::json!({"a": 1})).await.unwrap();
        drop(tx);

        let report = run_importer(dest.clone(), config, rx).await;
        assert_eq!(report.submitted, 1);
        assert_eq!(report.dropped, 0);
    }

    #[tokio::test]
    async fn drops_batch_after_retry_exhaustion() {
        let dest = Arc::new(RecordingDestination {
            batches: StdMutex::new(vec![]),
            fail_next_n: AtomicUsize::new(100),
        });
        let (tx, rx) = mpsc::channel(100);
        let config = ImporterConfig {
            index: "dest".into(),
            bulk_size: 1,
            max_bulk_bytes: 10_000_000,
            backoff: BackoffConfig {
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(1),
                max_retries: 1,
            },
        };

        tx.send(serde_json::json!({"a": 1})).await.unwrap();
        drop(tx);

        let report = run_importer(dest, config, rx).await;
        assert_eq!(report.submitted, 0);
        assert_eq!(report.dropped, 1);
    }

    #[tokio::test]
    async fn shared_receiver_is_split_fairly_across_workers() {
        let dest = Arc::new(RecordingDestination {
            batches: StdMutex::new(vec![]),
            fail_next_n: AtomicUsize::new(0),
        });
        let (tx, rx) = mpsc::channel(100);
        let rx = Arc::new(Mutex::new(rx));

        for n in 0..10 {
            tx.send(serde_json::json!({"n": n})).await.unwrap();
        }
        drop(tx);

        let config = ImporterConfig {
            index: "dest".into(),
            bulk_size: 1,
            max_bulk_bytes: 10_000_000,
            backoff: fast_backoff(),
        };

        let workers: Vec<_> = (0..3)
            .map(|_| {
                tokio::spawn(run_importer_shared(
                    Arc::clone(&dest) as Arc<dyn DestinationClient>,
                    config.clone(),
                    Arc::clone(&rx),
                ))
            })
            .collect();

        let mut submitted = 0u64;
        for w in workers {
            submitted += w.await.unwrap().submitted;
        }

        assert_eq!(submitted, 10);
        assert_eq!(dest.batches.lock().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn empty_ready_queue_sends_no_requests() {
        let dest = Arc::new(RecordingDestination {
            batches: StdMutex::new(vec![]),
            fail_next_n: AtomicUsize::new(0),
        });
        let (tx, rx) = mpsc::channel::<Value>(1);
        drop(tx);

        let config = ImporterConfig {
            index: "dest".into(),
            bulk_size: 10,
            max_bulk_bytes: 100,
            backoff: fast_backoff(),
        };

        let report = run_importer(dest.clone(), config, rx).await;
        assert_eq!(report.submitted, 0);
        assert!(dest.batches.lock().unwrap().is_empty());
    }
}
