//! Embedding backends for the dense document index.
//!
//! `HashingEmbedder` needs no model files and is deterministic, which makes it
//! the default for development and tests. `BertEmbedder` runs a local
//! XLM-RoBERTa (BGE-M3) checkpoint through candle.
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::hash::Hasher;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{XLMRobertaModel, Config as XLMRobertaConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info};
use twox_hash::XxHash64;

use ragguard_core::config::{resolve_with_base, EmbedderKind, IndexSettings};
use ragguard_core::traits::Embedder;

pub mod device;
pub mod pool;
pub mod tokenize;

pub use pool::masked_mean_l2;

const HASHING_MAX_TOKENS: usize = 8192;

/// Feature-hashing bag of words: each lowercase alphanumeric token adds one
/// to the bucket picked by its xxHash64, then the vector is L2-normalised.
#[derive(Debug, Clone)]
pub struct HashingEmbedder { dim: usize }

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .take(HASHING_MAX_TOKENS);
        for token in tokens {
            let mut hasher = XxHash64::with_seed(0);
            hasher.write(token.to_lowercase().as_bytes());
            let idx = (hasher.finish() % self.dim as u64) as usize;
            v[idx] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 { for x in &mut v { *x /= norm; } }
        v
    }
}

impl Embedder for HashingEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { HASHING_MAX_TOKENS }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

pub struct BertEmbedder { model: XLMRobertaModel, tokenizer: Tokenizer, device: Device, dim: usize, max_len: usize }

impl BertEmbedder {
    /// Load `config.json`, `tokenizer.json` and `pytorch_model.bin` from `model_dir`.
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = device::select_device();
        info!(dir = %model_dir.display(), "loading embedding model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let raw_config: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(model_dir.join("config.json"))?)?;
        let dim = raw_config.get("hidden_size").and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("config.json has no hidden_size"))? as usize;
        let config: XLMRobertaConfig = serde_json::from_value(raw_config)?;
        let weights = candle_core::pickle::read_all(model_dir.join("pytorch_model.bin"))?;
        let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        info!(dim, "embedding model loaded");
        Ok(Self { model, tokenizer, device, dim, max_len })
    }

    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize::tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let emb = pooled.squeeze(0)?.to_device(&Device::Cpu)?.to_vec1::<f32>()?;
        if emb.len() != self.dim { return Err(anyhow!("expected {}-dim embedding, got {}", self.dim, emb.len())); }
        debug!(elapsed_ms = start.elapsed().as_millis() as u64, "embedded text");
        Ok(emb)
    }
}

impl Embedder for BertEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }
}

/// Build the embedder named by `settings.embedder`; `base` resolves a
/// relative `model_dir`.
pub fn build_embedder(settings: &IndexSettings, base: &Path) -> Result<Arc<dyn Embedder>> {
    match settings.embedder {
        EmbedderKind::Hashing => Ok(Arc::new(HashingEmbedder::new(settings.embedding_dim))),
        EmbedderKind::Bert => {
            let dir = settings.model_dir.as_deref().ok_or_else(|| anyhow!("index.model_dir is not set"))?;
            Ok(Arc::new(BertEmbedder::load(&resolve_with_base(base, dir), 256)?))
        }
    }
}
