//! Wires the exporter, transformer, and importer stages into a single run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use destination::DestinationClient;
use serde_json::Value;
use source::SourceClient;
use tokio::sync::mpsc::{self, Receiver};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::info;

use crate::backoff::BackoffConfig;
use crate::exporter::{run_exporter, ExporterConfig};
use crate::importer::{run_importer_shared, ImporterConfig, ImporterReport};
use crate::transform::DocTransform;
use crate::transformer::{run_transformer, TransformerConfig, TransformerReport};

/// End-to-end configuration for a single migration run.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Source index to read.
    pub index_from: String,
    /// Destination index to write.
    pub index_to: String,
    /// Scroll page size and destination batch-count trigger.
    pub bulk_size: u32,
    /// Destination payload byte cap.
    pub max_bulk_bytes: usize,
    /// Server-side scroll TTL.
    pub scroll_timeout: String,
    /// Capacity of the raw and ready channels between stages.
    pub buffer_size: usize,
    /// Number of concurrent transformer workers.
    pub transform_workers: usize,
    /// Number of concurrent importer workers.
    pub import_workers: usize,
    /// Shared backoff policy for scroll advance and bulk submission.
    pub backoff: BackoffConfig,
}

/// Totals reported once a migration run completes.
#[derive(Debug, Clone, Copy)]
pub struct MigrationReport {
    /// Documents read from the source.
    pub exported: u64,
    /// Documents dropped by the transform.
    pub transformed_out: u64,
    /// Documents successfully submitted to the destination.
    pub imported: u64,
    /// Documents dropped after exhausting bulk-submit retries.
    pub import_dropped: u64,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

/// Run exactly one exporter task, `transform_workers` transformer tasks, and
/// `import_workers` importer tasks to completion, reporting totals on exit.
pub async fn run_migration(
    source: Arc<dyn SourceClient>,
    destination: Arc<dyn DestinationClient>,
    checkpoint: checkpoint::Checkpoint,
    transform: Arc<dyn DocTransform>,
    config: MigrationConfig,
) -> anyhow::Result<MigrationReport> {
    let started = Instant::now();

    let (raw_tx, raw_rx) = mpsc::channel::<Value>(config.buffer_size);
    let (ready_tx, ready_rx) = mpsc::channel::<Value>(config.buffer_size);
    let ready_rx = Arc::new(Mutex::new(ready_rx));

    let mut set = JoinSet::new();

    let exporter_config = ExporterConfig {
        index: config.index_from.clone(),
        page_size: config.bulk_size,
        scroll_timeout: config.scroll_timeout.clone(),
        backoff: config.backoff,
    };
    set.spawn(async move {
        Stage::Exporter(run_exporter(source, checkpoint, exporter_config, raw_tx).await)
    });

    let transformer_config = TransformerConfig {
        workers: config.transform_workers,
    };
    set.spawn(async move {
        Stage::Transformer(run_transformer(transform, transformer_config, raw_rx, ready_tx).await)
    });

    for _ in 0..config.import_workers.max(1) {
        let destination = Arc::clone(&destination);
        let ready_rx = Arc::clone(&ready_rx);
        let importer_config = ImporterConfig {
            index: config.index_to.clone(),
            bulk_size: config.bulk_size as usize,
            max_bulk_bytes: config.max_bulk_bytes,
            backoff: config.backoff,
        };
        set.spawn(async move {
            Stage::Importer(run_importer_shared(destination, importer_config, ready_rx).await)
        });
    }

    let mut report = MigrationReport {
        exported: 0,
        transformed_out: 0,
        imported: 0,
        import_dropped: 0,
        elapsed: Duration::default(),
    };
    let mut exporter_err = None;

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Stage::Exporter(Ok(r))) => report.exported = r.emitted,
            Ok(Stage::Exporter(Err(e))) => exporter_err = Some(e),
            Ok(Stage::Transformer(r)) => report.transformed_out += r.dropped,
            Ok(Stage::Importer(r)) => {
                report.imported += r.submitted;
                report.import_dropped += r.dropped;
            }
            Err(e) => anyhow::bail!("pipeline task panicked: {e}"),
        }
    }

    report.elapsed = started.elapsed();
    info!(
        "Migration finished in {:?}: exported {}, imported {}, import_dropped {}",
        report.elapsed, report.exported, report.imported, report.import_dropped
    );

    if let Some(e) = exporter_err {
        return Err(e);
    }
    Ok(report)
}

enum Stage {
    Exporter(anyhow::Result<crate::exporter::ExporterReport>),
    Transformer(TransformerReport),
    Importer(ImporterReport),
}
