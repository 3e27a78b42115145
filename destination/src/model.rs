//! Result type for a bulk submission.

/// Outcome of a successful `bulk_index` HTTP call.
///
/// A request is only a hard failure when transport errored or the response status
/// itself indicated an error; per-item failures inside an otherwise-successful
/// response are surfaced here so the caller can log them without failing the batch.
#[derive(Debug, Clone, Default)]
pub struct BulkOutcome {
    /// Number of documents submitted in this request.
    pub submitted: usize,
    /// Number of individual actions the response reported as failed.
    pub item_errors: usize,
}

impl BulkOutcome {
    /// Whether any individual action failed.
    #[must_use]
    pub fn has_item_errors(&self) -> bool {
        self.item_errors > 0
    }
}
