//! Bulk-index client adapter for the destination (schema v8) document-search cluster.
//!
//! Exposes only the `_bulk` and index-exists surface the importer stage needs;
//! mappings, aliases, and other control-plane operations are out of scope.

pub mod client;
pub mod error;
pub mod model;
pub mod payload;

pub use client::{DestinationClient, HttpDestinationClient};
pub use error::DestinationError;
pub use model::BulkOutcome;
pub use payload::{encode_action_and_source, encode_batch};
