//! Exporter stage: drives scroll pagination and feeds the raw queue while
//! maintaining the checkpoint.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use source::{Cursor, SourceClient, SourceError};
use tokio::sync::mpsc::Sender;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::backoff::BackoffConfig;

/// Exporter stage parameters.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Source index to scroll.
    pub index: String,
    /// Page size (`size` on the scroll request, also the importer's `bulk_size`).
    pub page_size: u32,
    /// Server-side scroll TTL, e.g. `"1m"`.
    pub scroll_timeout: String,
    /// Backoff applied to `advance` failures other than `CursorExpired`.
    pub backoff: BackoffConfig,
}

/// Summary returned by a completed (or failed) exporter run.
#[derive(Debug, Default, Clone)]
pub struct ExporterReport {
    /// Number of documents placed on the raw queue this run.
    pub emitted: u64,
}

/// Drive pagination against `source`, emitting documents onto `tx` and maintaining
/// `checkpoint`, until the source signals end-of-stream or an unrecoverable error
/// occurs. Closes `tx` by returning (the caller holds the only sender clone).
pub async fn run_exporter(
    source: Arc<dyn SourceClient>,
    checkpoint: checkpoint::Checkpoint,
    config: ExporterConfig,
    tx: Sender<Value>,
) -> anyhow::Result<ExporterReport> {
    let startup = checkpoint.read_startup_state().await?;
    let mut running_count = checkpoint.read_count().await?;

    let (mut cursor, mut skip_until) = open_initial_cursor(&source, &config, &startup).await?;

    let mut report = ExporterReport::default();

    loop {
        let page_token = cursor.token().to_string();

        let page = match advance_with_recovery(&source, &mut cursor, &config.backoff).await {
            Ok(page) => page,
            Err(Recovery::Expired) => {
                warn!("Scroll cursor expired mid-stream; restarting from scratch with skip-until");
                let fresh = source
                    .open_scroll(&config.index, config.page_size, &config.scroll_timeout)
                    .await?;
                cursor = fresh;
                skip_until = checkpoint.read_startup_state().await?.last_id;
                continue;
            }
            Err(Recovery::Exhausted(e)) => {
                error!("Exporter giving up after exhausting retries: {}", e);
                anyhow::bail!("scroll advance failed after retries: {e}");
            }
        };

        if page.hits.is_empty() {
            info!("Reached end of source index {}", config.index);
            break;
        }

        for hit in page.hits {
            if let Some(target) = skip_until.clone() {
                if hit.id == target {
                    skip_until = None;
                }
                continue;
            }

            let doc: Value = match serde_json::from_slice(&hit.source) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!("Skipping hit {} with malformed source JSON: {}", hit.id, e);
                    continue;
                }
            };

            let doc_json = doc.to_string();

            if tx.send(doc).await.is_err() {
                info!("Raw queue receiver dropped; stopping exporter");
                return Ok(report);
            }

            running_count += 1;
            report.emitted += 1;

            checkpoint.commit_offset(&page_token).await;
            checkpoint.commit_count(running_count).await;
            checkpoint.commit_id(&hit.id).await;
            checkpoint.commit_doc(&doc_json).await;

            debug!(
                "Exported document {} (running count {})",
                hit.id, running_count
            );
        }
    }

    Ok(report)
}

async fn open_initial_cursor(
    source: &Arc<dyn SourceClient>,
    config: &ExporterConfig,
    startup: &checkpoint::StartupState,
) -> anyhow::Result<(Cursor, Option<String>)> {
    if let Some(offset) = &startup.last_offset {
        let cursor = source
            .open_scroll_resume(&config.index, config.page_size, &config.scroll_timeout, offset)
            .await;
        match cursor {
            Ok(cursor) => return Ok((cursor, None)),
            Err(e) => {
                warn!("Resume scroll open failed ({}), falling back to scratch", e);
            }
        }
    }

    let cursor = source
        .open_scroll(&config.index, config.page_size, &config.scroll_timeout)
        .await?;
    Ok((cursor, startup.last_id.clone()))
}

enum Recovery {
    Expired,
    Exhausted(SourceError),
}

async fn advance_with_recovery(
    source: &Arc<dyn SourceClient>,
    cursor: &mut Cursor,
    backoff: &BackoffConfig,
) -> Result<source::Page, Recovery> {
    let mut attempt = 0;
    loop {
        match source.advance(cursor).await {
            Ok(page) => return Ok(page),
            Err(SourceError::CursorExpired) => return Err(Recovery::Expired),
            Err(e) => {
                if attempt >= backoff.max_retries {
                    return Err(Recovery::Exhausted(e));
                }
                let delay: Duration = backoff.delay_for(attempt);
                warn!(
                    "Scroll advance failed (attempt {}/{}), retrying in {:?}: {}",
                    attempt + 1,
                    backoff.max_retries + 1,
                    delay,
                    e
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
