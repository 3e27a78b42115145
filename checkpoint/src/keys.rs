//! Configurable checkpoint key names.

/// Names of the four keys that make up a checkpoint record.
///
/// All four are independent; the store treats them as opaque strings and takes no view
/// on how they relate to one another.
#[derive(Debug, Clone)]
pub struct CheckpointKeys {
    /// Key holding the `hit_id` of the most recently emitted document.
    pub last_id: String,
    /// Key holding the most recently observed scroll token.
    pub last_offset: String,
    /// Key holding the monotonically increasing emitted-document count.
    pub last_count: String,
    /// Key holding the full JSON encoding of the most recently emitted document.
    pub last_doc: String,
}

impl Default for CheckpointKeys {
    fn default() -> Self {
        Self {
            last_id: "last_id".to_string(),
            last_offset: "last_offset".to_string(),
            last_count: "last_count".to_string(),
            last_doc: "last_doc".to_string(),
        }
    }
}

impl CheckpointKeys {
    /// Build key names from `KV_KEY_*` environment variables, falling back to the
    /// conventional defaults when unset.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            last_id: std::env::var("KV_KEY_LAST_ID").unwrap_or(defaults.last_id),
            last_offset: std::env::var("KV_KEY_LAST_OFFSET").unwrap_or(defaults.last_offset),
            last_count: std::env::var("KV_KEY_LAST_COUNT").unwrap_or(defaults.last_count),
            last_doc: std::env::var("KV_KEY_LAST_DOC").unwrap_or(defaults.last_doc),
        }
    }
}
