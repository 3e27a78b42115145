//! Entry point for the `migrator` binary: a resumable streaming migration from a
//! legacy (schema v2) document-search cluster to a modern (schema v8) one.

mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use config::{Cli, Command};
use destination::{DestinationClient, HttpDestinationClient};
use pipeline::{run_migration, IdentityTransform, MigrationConfig};
use source::HttpSourceClient;
use tracing::{error, info};

const CHECKPOINT_PING_ATTEMPTS: usize = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let Command::Run(args) = cli.command;

    if let Err(e) = run(args).await {
        error!("Migration failed to start or complete: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run(args: config::RunArgs) -> anyhow::Result<()> {
    let source = Arc::new(HttpSourceClient::new(
        args.source_url.clone(),
        args.source_user.clone(),
        args.source_pass.clone(),
    ));
    let destination = Arc::new(HttpDestinationClient::new(
        args.dest_url.clone(),
        args.dest_user.clone(),
        args.dest_pass.clone(),
    ));

    if !destination
        .index_exists(&args.index_to)
        .await
        .context("failed to reach destination cluster")?
    {
        anyhow::bail!(
            "destination index '{}' does not exist; create it before migrating",
            args.index_to
        );
    }

    info!("Connecting to checkpoint store at {}", args.kv_url);
    let store = checkpoint::RedisCheckpointStore::connect(
        &args.kv_connection_url(),
        CHECKPOINT_PING_ATTEMPTS,
    )
    .await
    .context("checkpoint store unreachable after retrying")?;
    let checkpoint = checkpoint::Checkpoint::new(Arc::new(store), args.checkpoint_keys());

    let config = MigrationConfig {
        index_from: args.index_from.clone(),
        index_to: args.index_to.clone(),
        bulk_size: args.bulk_size,
        max_bulk_bytes: args.max_bulk_bytes,
        scroll_timeout: args.scroll_timeout.clone(),
        buffer_size: args.buffer_size,
        transform_workers: args.transform_workers,
        import_workers: args.import_workers,
        backoff: args.backoff(),
    };

    info!(
        "Starting migration: {} -> {} (bulk_size={}, transform_workers={}, import_workers={})",
        args.index_from, args.index_to, args.bulk_size, args.transform_workers, args.import_workers
    );

    let report = run_migration(source, destination, checkpoint, Arc::new(IdentityTransform), config).await?;

    info!(
        "Migration complete in {:?}: exported {}, imported {}, import_dropped {}, transform_dropped {}",
        report.elapsed, report.exported, report.imported, report.import_dropped, report.transformed_out
    );

    Ok(())
}
