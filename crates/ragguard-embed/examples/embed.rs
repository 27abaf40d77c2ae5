use std::path::Path;

use ragguard_core::traits::Embedder;
use ragguard_embed::{BertEmbedder, HashingEmbedder};

// Usage: cargo run -p ragguard-embed --example embed -- [MODEL_DIR]
// Without a model directory the hashing embedder is used.
fn main() -> anyhow::Result<()> {
    let texts = vec!["hello world".to_string(), "rust embeddings".to_string()];
    let embedder: Box<dyn Embedder> = match std::env::args().nth(1) {
        Some(dir) => Box::new(BertEmbedder::load(Path::new(&dir), 256)?),
        None => Box::new(HashingEmbedder::new(384)),
    };
    let embs = embedder.embed_batch(&texts)?;
    println!("B={} dim={}", embs.len(), embedder.dim());
    Ok(())
}
