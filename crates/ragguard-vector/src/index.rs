use anyhow::{anyhow, ensure, Result};
use std::sync::{Arc, RwLock};
use tracing::debug;

use ragguard_core::traits::{Embedder, SemanticIndex};
use ragguard_core::types::{DocumentId, SearchHit, SourceKind};

use crate::cache::{content_hash, EmbeddingCache};

struct Entry {
	id: DocumentId,
	vector: Arc<Vec<f32>>,
}

/// An embedded document that is not yet searchable. Produced by
/// [`VectorIndex::stage`] and made visible by [`VectorIndex::commit`].
pub struct StagedVector {
	id: DocumentId,
	vector: Arc<Vec<f32>>,
}

impl StagedVector {
	pub fn id(&self) -> &DocumentId { &self.id }
}

/// Exhaustive cosine-similarity search over L2-normalised document vectors.
/// Ties keep insertion order.
pub struct VectorIndex {
	embedder: Arc<dyn Embedder>,
	cache: EmbeddingCache,
	entries: RwLock<Vec<Entry>>,
}

impl VectorIndex {
	pub fn new(embedder: Arc<dyn Embedder>) -> Self {
		let cache = EmbeddingCache::new(format!("d{}", embedder.dim()));
		Self { embedder, cache, entries: RwLock::new(Vec::new()) }
	}

	/// Embed `content` without making it searchable. This is the only
	/// fallible part of an insertion that depends on the embedder.
	pub fn stage(&self, id: &DocumentId, content: &str) -> Result<StagedVector> {
		let hash = content_hash(content);
		let vector = match self.cache.get(&hash)? {
			Some(vector) => { debug!(id = %id, "embedding cache hit"); vector }
			None => {
				let vector = Arc::new(self.embed(content)?);
				self.cache.put(hash, Arc::clone(&vector))?;
				vector
			}
		};
		Ok(StagedVector { id: id.clone(), vector })
	}

	pub fn commit(&self, staged: StagedVector) -> Result<()> {
		let mut entries = self.entries.write().map_err(|_| anyhow!("vector index lock poisoned"))?;
		entries.push(Entry { id: staged.id, vector: staged.vector });
		Ok(())
	}

	pub fn len(&self) -> Result<usize> {
		Ok(self.entries.read().map_err(|_| anyhow!("vector index lock poisoned"))?.len())
	}

	pub fn is_empty(&self) -> Result<bool> { Ok(self.len()? == 0) }

	pub fn cache(&self) -> &EmbeddingCache { &self.cache }

	fn embed(&self, text: &str) -> Result<Vec<f32>> {
		let mut vectors = self.embedder.embed_batch(&[text.to_string()])?;
		ensure!(vectors.len() == 1, "embedder returned {} vectors for one input", vectors.len());
		let mut v = vectors.remove(0);
		ensure!(v.len() == self.embedder.dim(), "embedder returned {} dims, expected {}", v.len(), self.embedder.dim());
		let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
		if norm > 0.0 { for x in &mut v { *x /= norm; } }
		Ok(v)
	}
}

impl SemanticIndex for VectorIndex {
	fn add(&self, id: &DocumentId, content: &str) -> Result<()> {
		let staged = self.stage(id, content)?;
		self.commit(staged)
	}

	fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
		if limit == 0 || query.trim().is_empty() { return Ok(Vec::new()); }
		let q = self.embed(query)?;
		let entries = self.entries.read().map_err(|_| anyhow!("vector index lock poisoned"))?;
		let mut scored: Vec<(usize, f32)> = entries
			.iter()
			.enumerate()
			.map(|(i, e)| (i, e.vector.iter().zip(&q).map(|(a, b)| a * b).sum()))
			.filter(|(_, score): &(usize, f32)| *score > 0.0)
			.collect();
		scored.sort_by(|a, b| b.1.total_cmp(&a.1));
		scored.truncate(limit);
		Ok(scored.into_iter().map(|(i, score)| SearchHit::new(entries[i].id.clone(), score, SourceKind::Vector)).collect())
	}
}
