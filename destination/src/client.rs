//! Destination cluster client: index-exists check and bulk submission.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::DestinationError;
use crate::model::BulkOutcome;
use crate::payload::encode_batch;

/// Narrow surface the importer stage needs from a document-search destination cluster.
#[async_trait]
pub trait DestinationClient: Send + Sync {
    /// Check whether `index` already exists on the destination.
    async fn index_exists(&self, index: &str) -> Result<bool, DestinationError>;

    /// Submit `docs` as one bulk-index request against `index`.
    async fn bulk_index(
        &self,
        index: &str,
        docs: &[Value],
    ) -> Result<BulkOutcome, DestinationError>;
}

/// HTTP [`DestinationClient`] for the modern (schema v8) document-search cluster.
pub struct HttpDestinationClient {
    http: reqwest::Client,
    base_url: String,
    user: String,
    pass: String,
}

impl HttpDestinationClient {
    /// Build a client for `base_url`, authenticating with HTTP basic auth.
    #[must_use]
    pub fn new(base_url: impl Into<String>, user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            user: user.into(),
            pass: pass.into(),
        }
    }
}

#[async_trait]
impl DestinationClient for HttpDestinationClient {
    async fn index_exists(&self, index: &str) -> Result<bool, DestinationError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), index);
        let resp = self
            .http
            .head(&url)
            .basic_auth(&self.user, Some(&self.pass))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    async fn bulk_index(
        &self,
        index: &str,
        docs: &[Value],
    ) -> Result<BulkOutcome, DestinationError> {
        let payload = encode_batch(index, docs);
        let url = format!("{}/_bulk", self.base_url.trim_end_matches('/'));

        let resp = self
            .http
            .post(&url)
            .basic_auth(&self.user, Some(&self.pass))
            .header("Content-Type", "application/x-ndjson")
            .body(payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DestinationError::Response {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        let item_errors = match serde_json::from_str::<BulkResponse>(&body) {
            Ok(parsed) if parsed.errors => {
                let failed = parsed
                    .items
                    .iter()
                    .filter(|item| item.index.as_ref().is_some_and(|a| a.error.is_some()))
                    .count();
                warn!(
                    "Bulk request to {} reported {} per-item failures out of {}",
                    index,
                    failed,
                    docs.len()
                );
                failed
            }
            Ok(_) => 0,
            Err(e) => {
                warn!("Could not parse bulk response for per-item errors: {}", e);
                0
            }
        };

        Ok(BulkOutcome {
            submitted: docs.len(),
            item_errors,
        })
    }
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<BulkResponseItem>,
}

#[derive(Debug, Deserialize)]
struct BulkResponseItem {
    index: Option<BulkResponseAction>,
}

#[derive(Debug, Deserialize)]
struct BulkResponseAction {
    error: Option<Value>,
}
