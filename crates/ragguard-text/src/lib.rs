//! ragguard-text
//!
//! Tantivy-based keyword implementation of `SemanticIndex`. See `index` and
//! the `search` example for indexing a data directory during development.
pub mod tantivy_utils;
pub mod index;

pub use index::TantivyIndex;
