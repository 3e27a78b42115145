//! CLI surface and environment-variable configuration for the `migrator` binary.

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use pipeline::BackoffConfig;

#[derive(Parser)]
#[command(name = "migrator")]
#[command(about = "Resumable streaming migration from a legacy cluster schema to a modern one")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the migration to completion (or until a fatal error).
    Run(RunArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Source cluster base URL.
    #[arg(long, env = "SOURCE_URL", default_value = "http://127.0.0.1:9202")]
    pub source_url: String,
    /// Source cluster basic-auth username.
    #[arg(long, env = "SOURCE_USER", default_value = "elastic")]
    pub source_user: String,
    /// Source cluster basic-auth password.
    #[arg(long, env = "SOURCE_PASS", default_value = "changeme")]
    pub source_pass: String,

    /// Destination cluster base URL.
    #[arg(long, env = "DEST_URL", default_value = "http://127.0.0.1:9208")]
    pub dest_url: String,
    /// Destination cluster basic-auth username.
    #[arg(long, env = "DEST_USER", default_value = "elastic")]
    pub dest_user: String,
    /// Destination cluster basic-auth password.
    #[arg(long, env = "DEST_PASS", default_value = "changeme")]
    pub dest_pass: String,

    /// Source index name.
    #[arg(long, env = "INDEX_FROM", default_value = "idx_from")]
    pub index_from: String,
    /// Destination index name.
    #[arg(long, env = "INDEX_TO", default_value = "idx_to")]
    pub index_to: String,

    /// Scroll page size on the source, and batch-count flush trigger on the destination.
    #[arg(long, env = "BULK_SIZE", default_value_t = 1000)]
    pub bulk_size: u32,
    /// Destination payload byte cap; an oversized single document is still sent alone.
    #[arg(long, env = "MAX_BULK_BYTES", default_value_t = 10 * 1024 * 1024)]
    pub max_bulk_bytes: usize,

    /// Retry cap shared by scroll-advance and bulk-submit.
    #[arg(long, env = "MAX_RETRIES", default_value_t = 60)]
    pub max_retries: usize,
    /// Initial retry backoff delay, in milliseconds.
    #[arg(long, env = "RETRY_INITIAL_DELAY_MS", default_value_t = 1000)]
    pub retry_initial_delay_ms: u64,
    /// Retry backoff cap, in seconds.
    #[arg(long, env = "RETRY_MAX_DELAY_SECS", default_value_t = 60)]
    pub retry_max_delay_secs: u64,

    /// Server-side scroll cursor TTL.
    #[arg(long, env = "SCROLL_TIMEOUT", default_value = "1m")]
    pub scroll_timeout: String,

    /// Channel capacity between the exporter, transformer, and importer stages.
    #[arg(long, env = "BUFFER_SIZE", default_value_t = 1000)]
    pub buffer_size: usize,
    /// Concurrent transformer worker count.
    #[arg(long, env = "TRANSFORM_WORKERS", default_value_t = 4)]
    pub transform_workers: usize,
    /// Concurrent importer worker count.
    #[arg(long, env = "IMPORT_WORKERS", default_value_t = 4)]
    pub import_workers: usize,

    /// Checkpoint store connection URL.
    #[arg(long, env = "KV_URL", default_value = "redis://127.0.0.1:6379")]
    pub kv_url: String,
    /// Checkpoint store logical database index.
    #[arg(long, env = "KV_DB", default_value_t = 0)]
    pub kv_db: u32,
    /// Checkpoint store password, if required.
    #[arg(long, env = "KV_PASS")]
    pub kv_pass: Option<String>,

    /// Checkpoint key holding the most recently committed document id.
    #[arg(long, env = "KV_KEY_LAST_ID", default_value = "last_id")]
    pub kv_key_last_id: String,
    /// Checkpoint key holding the most recently observed scroll token.
    #[arg(long, env = "KV_KEY_LAST_OFFSET", default_value = "last_offset")]
    pub kv_key_last_offset: String,
    /// Checkpoint key holding the running emitted-document count.
    #[arg(long, env = "KV_KEY_LAST_COUNT", default_value = "last_count")]
    pub kv_key_last_count: String,
    /// Checkpoint key holding the raw JSON of the last emitted document.
    #[arg(long, env = "KV_KEY_LAST_DOC", default_value = "last_doc")]
    pub kv_key_last_doc: String,
}

impl RunArgs {
    pub fn backoff(&self) -> BackoffConfig {
        BackoffConfig {
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            max_delay: Duration::from_secs(self.retry_max_delay_secs),
            max_retries: self.max_retries,
        }
    }

    pub fn checkpoint_keys(&self) -> checkpoint::CheckpointKeys {
        checkpoint::CheckpointKeys {
            last_id: self.kv_key_last_id.clone(),
            last_offset: self.kv_key_last_offset.clone(),
            last_count: self.kv_key_last_count.clone(),
            last_doc: self.kv_key_last_doc.clone(),
        }
    }

    /// Full connection string, folding `kv_db` and `kv_pass` into the `redis://` URL
    /// the same way `clients.InitRedis` builds its connection options.
    pub fn kv_connection_url(&self) -> String {
        let mut url = self.kv_url.clone();
        if let Some(pass) = &self.kv_pass {
            if let Some(rest) = url.strip_prefix("redis://") {
                url = format!("redis://:{pass}@{rest}");
            }
        }
        if !url.ends_with('/') {
            url.push('/');
        }
        url.push_str(&self.kv_db.to_string());
        url
    }
}
