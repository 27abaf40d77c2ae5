use std::sync::Arc;

use anyhow::{bail, Result};
use ragguard_core::traits::SemanticIndex;
use ragguard_core::{DocumentId, SearchHit};
use ragguard_embed::HashingEmbedder;
use ragguard_hybrid::HybridIndex;
use ragguard_text::TantivyIndex;
use ragguard_vector::VectorIndex;

fn hybrid() -> HybridIndex<TantivyIndex> {
    let text = TantivyIndex::in_memory(50_000_000).expect("text index");
    let vector = VectorIndex::new(Arc::new(HashingEmbedder::new(256)));
    HybridIndex::new(text, vector)
}

/// Keyword engine that refuses every insert.
struct RejectingText;

impl SemanticIndex for RejectingText {
    fn add(&self, _id: &DocumentId, _content: &str) -> Result<()> { bail!("writer closed") }
    fn search(&self, _query: &str, _limit: usize) -> Result<Vec<SearchHit>> { Ok(Vec::new()) }
}

#[test]
fn hits_are_unique_sorted_and_limited() {
    let index = hybrid();
    index.add(&DocumentId::new("finance/q4.md"), "quarterly revenue report").expect("add");
    index.add(&DocumentId::new("marketing/plan.md"), "campaign plan for revenue growth").expect("add");
    index.add(&DocumentId::new("hr/leave.md"), "annual leave policy").expect("add");

    let hits = index.search("revenue", 10).expect("search");
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    let mut ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), hits.len(), "one hit per document");
    assert!(ids.contains(&"finance/q4.md"));
    assert!(ids.contains(&"marketing/plan.md"));

    assert_eq!(index.search("revenue", 1).expect("search").len(), 1);
    assert!(index.search("revenue", 0).expect("search").is_empty());
}

#[test]
fn documents_land_in_both_engines() {
    let index = hybrid();
    index.add(&DocumentId::new("a"), "payroll calendar").expect("add");
    assert_eq!(index.text().num_docs(), 1);
    assert_eq!(index.vector().len().expect("len"), 1);
}

#[test]
fn keyword_failure_publishes_no_vector() {
    let vector = VectorIndex::new(Arc::new(HashingEmbedder::new(64)));
    let index = HybridIndex::new(RejectingText, vector);
    assert!(index.add(&DocumentId::new("a"), "payroll calendar").is_err());
    assert!(index.vector().is_empty().expect("len"));
    assert!(index.search("payroll", 5).expect("search").is_empty());
}
