use thiserror::Error;

use crate::types::{DocumentId, SearchHit};

/// Returned (inside the `anyhow::Error`) by [`SemanticIndex::add`] when a
/// failed insertion could not be fully undone, so the index may still return
/// `id` from searches.
#[derive(Debug, Error)]
#[error("partial insert of '{id}': {reason}")]
pub struct PartialInsert {
    pub id: DocumentId,
    pub reason: String,
}

impl PartialInsert {
    pub fn new(id: &DocumentId, reason: impl std::fmt::Display) -> Self {
        Self { id: id.clone(), reason: reason.to_string() }
    }

    /// Whether `error` is, or wraps, a partial insert.
    pub fn is_partial(error: &anyhow::Error) -> bool {
        error.chain().any(|cause| cause.is::<PartialInsert>())
    }
}

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Similarity search over whole documents.
///
/// Implementations know nothing about roles and must never be relied on for
/// access control; every hit is re-checked against the registry.
pub trait SemanticIndex: Send + Sync {
    /// Make `content` searchable under `id`. Once this returns `Ok`, the
    /// document is visible to subsequent searches. On error the index must
    /// hold nothing for `id`, or the error must carry a [`PartialInsert`].
    fn add(&self, id: &DocumentId, content: &str) -> anyhow::Result<()>;

    /// At most `limit` hits ordered by descending score.
    fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<SearchHit>>;
}
