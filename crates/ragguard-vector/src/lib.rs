//! ragguard-vector
//!
//! Dense, in-memory implementation of `SemanticIndex` over any `Embedder`.
//! Insertion is split into `stage` (embed) and `commit` (publish) so callers
//! composing several engines can keep an insert all-or-nothing.
pub mod cache;
pub mod index;

pub use index::{StagedVector, VectorIndex};
