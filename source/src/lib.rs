//! Scroll-cursor client adapter for the legacy (schema v2) document-search cluster.
//!
//! Exposes only the scroll/continue surface the exporter stage needs; index
//! creation, mappings, and other control-plane operations are out of scope.

pub mod client;
pub mod error;
pub mod model;

pub use client::{HttpSourceClient, SourceClient};
pub use error::SourceError;
pub use model::{Cursor, Hit, Page};
