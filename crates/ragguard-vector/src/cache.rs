//! In-process embedding cache keyed by `(embedder_id, content_hash)`.
//!
//! Consulted before calling the embedder and written through on misses, so
//! identical document bodies are embedded once.
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub fn content_hash(text: &str) -> String { blake3::hash(text.as_bytes()).to_hex().to_string() }

pub struct EmbeddingCache {
    embedder_id: String,
    entries: Mutex<HashMap<String, Arc<Vec<f32>>>>,
}

impl EmbeddingCache {
    pub fn new(embedder_id: impl Into<String>) -> Self {
        Self { embedder_id: embedder_id.into(), entries: Mutex::new(HashMap::new()) }
    }

    pub fn embedder_id(&self) -> &str { &self.embedder_id }

    pub fn get(&self, hash: &str) -> Result<Option<Arc<Vec<f32>>>> {
        Ok(self.lock()?.get(hash).cloned())
    }

    pub fn put(&self, hash: String, vector: Arc<Vec<f32>>) -> Result<()> {
        self.lock()?.insert(hash, vector);
        Ok(())
    }

    pub fn len(&self) -> Result<usize> { Ok(self.lock()?.len()) }

    pub fn is_empty(&self) -> Result<bool> { Ok(self.len()? == 0) }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Arc<Vec<f32>>>>> {
        self.entries.lock().map_err(|_| anyhow!("embedding cache lock poisoned"))
    }
}
