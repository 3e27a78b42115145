//! Transformer stage: a pool of workers applying a [`DocTransform`] between the raw
//! and ready queues.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::Mutex;
use tracing::debug;

use crate::transform::DocTransform;

/// Transformer stage parameters.
#[derive(Debug, Clone, Copy)]
pub struct TransformerConfig {
    /// Number of concurrent workers draining the raw queue.
    pub workers: usize,
}

/// Summary returned by a completed transformer run.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransformerReport {
    /// Documents that passed through to the ready queue.
    pub passed: u64,
    /// Documents dropped by the transform.
    pub dropped: u64,
}

/// Run `config.workers` concurrent workers, each pulling from the shared `rx`,
/// applying `transform`, and forwarding survivors to `tx`. Workers race for each
/// item off `rx`, so output order across workers is not preserved. `tx` is closed
/// once every worker has exited, which happens only once `rx` is drained and closed
/// by the exporter — no worker closes it early.
pub async fn run_transformer(
    transform: Arc<dyn DocTransform>,
    config: TransformerConfig,
    rx: Receiver<Value>,
    tx: Sender<Value>,
) -> TransformerReport {
    let rx = Arc::new(Mutex::new(rx));
    let workers = config.workers.max(1);

    let mut set = tokio::task::JoinSet::new();
    for id in 0..workers {
        let rx = Arc::clone(&rx);
        let tx = tx.clone();
        let transform = Arc::clone(&transform);
        set.spawn(async move { worker_loop(id, transform, rx, tx).await });
    }
    drop(tx);

    let mut report = TransformerReport::default();
    while let Some(result) = set.join_next().await {
        let (passed, dropped) = result.unwrap_or((0, 0));
        report.passed += passed;
        report.dropped += dropped;
    }
    report
}

async fn worker_loop(
    id: usize,
    transform: Arc<dyn DocTransform>,
    rx: Arc<Mutex<Receiver<Value>>>,
    tx: Sender<Value>,
) -> (u64, u64) {
    let mut passed = 0u64;
    let mut dropped = 0u64;

    loop {
        let doc = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(doc) = doc else {
            break;
        };

        match transform.transform(doc) {
            Some(out) => {
                if tx.send(out).await.is_err() {
                    debug!("Transformer worker {} stopping: ready queue closed", id);
                    break;
                }
                passed += 1;
            }
            None => dropped += 1,
        }
    }

    (passed, dropped)
}
