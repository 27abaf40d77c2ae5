use std::env;
use std::path::{Path, PathBuf};

use ragguard_core::config::AccessSettings;
use ragguard_core::loader::DocumentLoader;
use ragguard_core::traits::SemanticIndex;
use ragguard_core::AccessPolicy;
use ragguard_text::TantivyIndex;

// Index a department data directory in RAM and print raw keyword hits.
// No access filtering happens here; this shows what the engine alone returns.
// Usage:
//   cargo run -p ragguard-text --example search -- "your query" [--dir sample_data] [--limit 10]

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("Usage: cargo run -p ragguard-text --example search -- <query> [--dir DIR] [--limit N]");
        std::process::exit(1);
    }
    let mut query = String::new();
    let mut data_dir: Option<PathBuf> = None;
    let mut limit: usize = 10;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--dir" => {
                if i + 1 >= args.len() { eprintln!("--dir requires a path"); std::process::exit(2); }
                data_dir = Some(PathBuf::from(&args[i + 1]));
                i += 2; continue;
            }
            "--limit" => {
                if i + 1 >= args.len() { eprintln!("--limit requires a number"); std::process::exit(2); }
                limit = args[i + 1].parse().unwrap_or(limit);
                i += 2; continue;
            }
            s if s.starts_with('-') => {
                eprintln!("Unknown flag: {}", s); std::process::exit(2);
            }
            s => {
                if query.is_empty() { query = s.to_string(); }
                i += 1; continue;
            }
        }
    }

    // Compute workspace root from this crate's manifest dir: ../../
    let data_dir = data_dir.unwrap_or_else(|| {
        Path::new(env!("CARGO_MANIFEST_DIR")).ancestors().nth(2).unwrap_or(Path::new(".")).join("sample_data")
    });

    let policy = AccessPolicy::from_settings(&AccessSettings::default())?;
    let documents = DocumentLoader::new(&policy).load_directory(&data_dir)?;
    let index = TantivyIndex::in_memory(50_000_000)?;
    for doc in &documents {
        index.add(doc.id(), doc.content())?;
    }

    println!("Tantivy search\n==============");
    println!("Data : {} ({} documents)", data_dir.display(), documents.len());
    println!("Query: {} (limit {})\n", query, limit);
    for (i, h) in index.search(&query, limit)?.iter().enumerate() {
        println!("{:>2}. score={:.3} id={}", i + 1, h.score, h.id);
    }
    Ok(())
}
