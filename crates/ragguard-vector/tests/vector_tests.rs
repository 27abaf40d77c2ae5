use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use ragguard_core::traits::{Embedder, SemanticIndex};
use ragguard_core::{DocumentId, SourceKind};
use ragguard_embed::HashingEmbedder;
use ragguard_vector::VectorIndex;

/// Counts calls and fails on any text containing "boom".
struct CountingEmbedder {
    inner: HashingEmbedder,
    calls: AtomicUsize,
}

impl Embedder for CountingEmbedder {
    fn dim(&self) -> usize { self.inner.dim() }
    fn max_len(&self) -> usize { self.inner.max_len() }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if texts.iter().any(|t| t.contains("boom")) {
            bail!("embedding backend unavailable");
        }
        self.inner.embed_batch(texts)
    }
}

fn counting() -> Arc<CountingEmbedder> {
    Arc::new(CountingEmbedder { inner: HashingEmbedder::new(256), calls: AtomicUsize::new(0) })
}

fn seeded() -> VectorIndex {
    let index = VectorIndex::new(Arc::new(HashingEmbedder::new(256)));
    let docs = [
        ("finance/q4.md", "quarterly revenue and operating margin"),
        ("marketing/campaigns.md", "campaign reach and campaign conversion"),
        ("general/handbook.md", "holiday calendar and office hours"),
    ];
    for (id, text) in docs {
        index.add(&DocumentId::new(id), text).expect("add");
    }
    index
}

#[test]
fn most_similar_document_ranks_first() {
    let index = seeded();
    let hits = index.search("campaign conversion", 3).expect("search");
    assert_eq!(hits[0].id.as_str(), "marketing/campaigns.md");
    assert_eq!(hits[0].source, SourceKind::Vector);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn limit_and_blank_query() {
    let index = seeded();
    assert!(index.search("revenue", 0).expect("search").is_empty());
    assert!(index.search("   ", 5).expect("search").is_empty());
    assert!(index.search("revenue margin office", 1).expect("search").len() <= 1);
}

#[test]
fn identical_content_is_embedded_once() {
    let embedder = counting();
    let index = VectorIndex::new(embedder.clone());
    index.add(&DocumentId::new("a"), "shared body").expect("add a");
    index.add(&DocumentId::new("b"), "shared body").expect("add b");
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    assert_eq!(index.cache().len().expect("len"), 1);
    assert_eq!(index.len().expect("len"), 2);
}

#[test]
fn staged_vectors_are_invisible_until_committed() {
    let index = VectorIndex::new(Arc::new(HashingEmbedder::new(64)));
    let staged = index.stage(&DocumentId::new("pending"), "payroll schedule").expect("stage");
    assert_eq!(staged.id().as_str(), "pending");
    assert!(index.search("payroll", 5).expect("search").is_empty());
    index.commit(staged).expect("commit");
    assert_eq!(index.search("payroll", 5).expect("search")[0].id.as_str(), "pending");
}

#[test]
fn embedder_failure_leaves_index_unchanged() {
    let index = VectorIndex::new(counting());
    assert!(index.add(&DocumentId::new("bad"), "boom").is_err());
    assert!(index.is_empty().expect("len"));
    assert!(index.cache().is_empty().expect("len"));
}
