//! Scroll cursor and hit types.

/// A single hit returned by a scroll page, before document decoding.
#[derive(Debug, Clone)]
pub struct Hit {
    /// Stable identifier within the scroll.
    pub id: String,
    /// Raw JSON bytes of the document `_source`, undecoded.
    pub source: Vec<u8>,
}

/// One page of scroll results.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Hits in server-assigned order; empty signals end-of-stream.
    pub hits: Vec<Hit>,
    /// The scroll token to use for the next `advance` call.
    pub next_token: String,
}

/// An open scroll cursor.
///
/// Cursors are only meaningful within the process that opened them; `next_token` is
/// updated by [`crate::client::SourceClient::advance`] after every page.
#[derive(Debug, Clone)]
pub struct Cursor {
    pub(crate) index: String,
    pub(crate) page_size: u32,
    pub(crate) ttl: String,
    pub(crate) token: String,
    /// The first page, when the open call itself returned hits (real scroll opens
    /// do). `advance` must hand this back before issuing any further request, or
    /// the first `page_size` documents of the scroll are silently skipped.
    pub(crate) pending: Option<Page>,
}

impl Cursor {
    /// Build a cursor directly; for `SourceClient` implementations outside this
    /// crate (HTTP adapters living elsewhere, test doubles) that need to hand back
    /// a `Cursor` without going through [`crate::client::HttpSourceClient`].
    #[must_use]
    pub fn new(
        index: impl Into<String>,
        page_size: u32,
        ttl: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            index: index.into(),
            page_size,
            ttl: ttl.into(),
            token: token.into(),
            pending: None,
        }
    }

    /// The most recently observed scroll token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Replace the scroll token after advancing a page.
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = token.into();
    }

    /// The index this cursor was opened against.
    #[must_use]
    pub fn index(&self) -> &str {
        &self.index
    }

    /// The page size this cursor was opened with.
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// The scroll TTL this cursor was opened with.
    #[must_use]
    pub fn ttl(&self) -> &str {
        &self.ttl
    }
}
