use anyhow::Result;
use std::collections::HashMap;
use tracing::debug;

use ragguard_core::traits::{PartialInsert, SemanticIndex};
use ragguard_core::types::{DocumentId, SearchHit};
use ragguard_vector::VectorIndex;

/// Keyword engine plus dense vectors behind one `SemanticIndex`.
///
/// An insert is visible in both engines or in neither: the vector is staged
/// first, the keyword engine commits, and only then is the vector published.
/// If publishing fails after the keyword commit, the error is a
/// [`PartialInsert`].
pub struct HybridIndex<T> where T: SemanticIndex {
    text: T,
    vector: VectorIndex,
}

impl<T> HybridIndex<T> where T: SemanticIndex {
    pub fn new(text: T, vector: VectorIndex) -> Self { Self { text, vector } }

    pub fn text(&self) -> &T { &self.text }

    pub fn vector(&self) -> &VectorIndex { &self.vector }
}

impl<T> SemanticIndex for HybridIndex<T> where T: SemanticIndex {
    fn add(&self, id: &DocumentId, content: &str) -> Result<()> {
        let staged = self.vector.stage(id, content)?;
        self.text.add(id, content)?;
        // The keyword engine already holds `id`; it cannot be taken back.
        self.vector.commit(staged).map_err(|e| PartialInsert::new(id, format!("vector commit failed: {e:#}")).into())
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        if limit == 0 { return Ok(Vec::new()); }
        let dense_hits = self.vector.search(query, limit)?;
        let text_hits = self.text.search(query, limit)?;
        debug!(dense = dense_hits.len(), text = text_hits.len(), "hybrid candidates");

        // merge unique ids, keep the better score
        let mut by_id: HashMap<DocumentId, SearchHit> = HashMap::new();
        for h in dense_hits.into_iter().chain(text_hits) {
            by_id.entry(h.id.clone()).and_modify(|old| { if h.score > old.score { *old = h.clone(); } }).or_insert(h);
        }
        let mut merged: Vec<SearchHit> = by_id.into_values().collect();
        merged.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        merged.truncate(limit);
        Ok(merged)
    }
}
