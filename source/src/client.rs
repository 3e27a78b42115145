//! Source cluster client: opens and advances a scroll cursor.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::SourceError;
use crate::model::{Cursor, Hit, Page};

/// Narrow surface the exporter needs from a document-search source cluster.
///
/// Implementations must guarantee that, within one cursor, document order is
/// deterministic and every document appears exactly once.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Open a fresh scroll from the beginning of `index`.
    async fn open_scroll(
        &self,
        index: &str,
        page_size: u32,
        ttl: &str,
    ) -> Result<Cursor, SourceError>;

    /// Re-attach to a previously observed scroll token.
    ///
    /// This performs no I/O: cursor validity on the source cluster can only be
    /// observed by actually advancing it, so a stale token surfaces as
    /// [`SourceError::CursorExpired`] from the first [`SourceClient::advance`] call,
    /// not from this constructor.
    async fn open_scroll_resume(
        &self,
        index: &str,
        page_size: u32,
        ttl: &str,
        token: &str,
    ) -> Result<Cursor, SourceError>;

    /// Fetch the next page and advance `cursor`'s token in place.
    async fn advance(&self, cursor: &mut Cursor) -> Result<Page, SourceError>;
}

/// HTTP [`SourceClient`] for the legacy (schema v2) document-search cluster.
pub struct HttpSourceClient {
    http: reqwest::Client,
    base_url: String,
    user: String,
    pass: String,
}

impl HttpSourceClient {
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

    async fn send_scroll_open(
        &self,
        index: &str,
        page_size: u32,
        ttl: &str,
    ) -> Result<ScrollEnvelope, SourceError> {
        let url = format!("{}/{}/_search", self.base_url.trim_end_matches('/'), index);
        let resp = self
            .http
            .post(&url)
            .basic_auth(&self.user, Some(&self.pass))
            .query(&[("scroll", ttl), ("size", &page_size.to_string())])
            .json(&serde_json::json!({ "query": { "match_all": {} } }))
            .send()
            .await?;

        Self::parse_envelope(resp).await
    }

    async fn send_scroll_continue(&self, token: &str, ttl: &str) -> Result<ScrollEnvelope, SourceError> {
        let url = format!("{}/_search/scroll", self.base_url.trim_end_matches('/'));
        let resp = self
            .http
            .post(&url)
            .basic_auth(&self.user, Some(&self.pass))
            .json(&serde_json::json!({ "scroll": ttl, "scroll_id": token }))
            .send()
            .await?;

        Self::parse_envelope(resp).await
    }

    async fn parse_envelope(resp: reqwest::Response) -> Result<ScrollEnvelope, SourceError> {
        let status = resp.status();

        if status.as_u16() == 404 {
            return Err(SourceError::CursorExpired);
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if body.contains("search_context_missing_exception")
                || body.contains("search_phase_execution_exception")
            {
                return Err(SourceError::CursorExpired);
            }
            return Err(SourceError::Response {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| SourceError::MalformedResponse(e.to_string()))
    }

    fn decode_page(envelope: ScrollEnvelope) -> Result<Page, SourceError> {
        let hits = envelope
            .hits
            .hits
            .into_iter()
            .map(|h| {
                serde_json::to_vec(&h.source)
                    .map(|source| Hit { id: h.id, source })
                    .map_err(|e| SourceError::MalformedResponse(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            hits,
            next_token: envelope.scroll_id,
        })
    }
}

#[async_trait]
impl SourceClient for HttpSourceClient {
    async fn open_scroll(
        &self,
        index: &str,
        page_size: u32,
        ttl: &str,
    ) -> Result<Cursor, SourceError> {
        let envelope = self.send_scroll_open(index, page_size, ttl).await?;
        debug!("Opened scroll on index {}", index);
        let token = envelope.scroll_id.clone();
        // The open call returns the first page inline; buffer it so it isn't
        // lost when the exporter's next call is `advance`, which only fetches
        // page two onward.
        let page = Self::decode_page(envelope)?;
        Ok(Cursor {
            index: index.to_string(),
            page_size,
            ttl: ttl.to_string(),
            token,
            pending: Some(page),
        })
    }

    async fn open_scroll_resume(
        &self,
        index: &str,
        page_size: u32,
        ttl: &str,
        token: &str,
    ) -> Result<Cursor, SourceError> {
        Ok(Cursor {
            index: index.to_string(),
            page_size,
            ttl: ttl.to_string(),
            token: token.to_string(),
            pending: None,
        })
    }

    async fn advance(&self, cursor: &mut Cursor) -> Result<Page, SourceError> {
        if let Some(page) = cursor.pending.take() {
            cursor.token = page.next_token.clone();
            if page.hits.is_empty() {
                debug!("Scroll on index {} reached end of stream", cursor.index);
            }
            return Ok(page);
        }

        let envelope = self
            .send_scroll_continue(&cursor.token, &cursor.ttl)
            .await?;

        cursor.token = envelope.scroll_id.clone();
        let page = Self::decode_page(envelope)?;

        if page.hits.is_empty() {
            debug!("Scroll on index {} reached end of stream", cursor.index);
        }

        Ok(page)
    }
}

#[derive(Debug, Deserialize)]
struct ScrollEnvelope {
    #[serde(rename = "_scroll_id")]
    scroll_id: String,
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    hits: Vec<HitEnvelope>,
}

#[derive(Debug, Deserialize)]
struct HitEnvelope {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source")]
    source: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(scroll_id: &str, ids: &[&str]) -> ScrollEnvelope {
        let body = serde_json::json!({
            "_scroll_id": scroll_id,
            "hits": {
                "hits": ids.iter().map(|id| serde_json::json!({
                    "_id": id,
                    "_source": { "k": id },
                })).collect::<Vec<_>>(),
            },
        });
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn decode_page_carries_hits_and_next_token() {
        let page = HttpSourceClient::decode_page(envelope("tok-1", &["a", "b"])).unwrap();
        assert_eq!(page.next_token, "tok-1");
        assert_eq!(page.hits.len(), 2);
        assert_eq!(page.hits[0].id, "a");
    }

    #[tokio::test]
    async fn advance_drains_the_buffered_first_page_without_a_network_call() {
        // A client pointed at an address nothing listens on; if `advance` ever
        // tried to reach the network here the test would hang or error out.
        let client = HttpSourceClient::new("http://127.0.0.1:1", "u", "p");
        let first_page = HttpSourceClient::decode_page(envelope("tok-1", &["a", "b"])).unwrap();
        let mut cursor = Cursor {
            index: "idx".to_string(),
            page_size: 10,
            ttl: "1m".to_string(),
            token: "tok-0".to_string(),
            pending: Some(first_page),
        };

        let page = client.advance(&mut cursor).await.unwrap();

        assert_eq!(page.hits.len(), 2);
        assert_eq!(page.hits[0].id, "a");
        assert_eq!(cursor.token(), "tok-1");
        assert!(cursor.pending.is_none());
    }
}
