use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ragguard_core::config::{Config, IndexBackend, Settings};
use ragguard_core::loader::{DepartmentKeywords, DocumentLoader};
use ragguard_core::traits::SemanticIndex;
use ragguard_core::{AccessPolicy, Department, Role};
use ragguard_embed::build_embedder;
use ragguard_hybrid::HybridIndex;
use ragguard_retrieval::{Assistant, Corpus, ExcerptGenerator, Upload};
use ragguard_text::TantivyIndex;
use ragguard_vector::VectorIndex;

#[derive(Debug, Parser)]
#[command(name = "ragguard")]
#[command(about = "Role-aware document retrieval over a department data directory")]
struct Cli {
    /// Configuration file; `<stem>.<env>.toml` next to it and RAGGUARD_* variables are layered on top.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ranked documents visible to a role.
    Query {
        #[arg(long)]
        role: String,
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        json: bool,
        question: String,
    },
    /// Answer a question from the documents visible to a role.
    Ask {
        #[arg(long)]
        role: String,
        #[arg(long)]
        top_k: Option<usize>,
        question: String,
    },
    /// Documents a role may read.
    Docs {
        #[arg(long)]
        role: String,
    },
    /// Department to role table.
    Roles,
    /// Add a file to the corpus on behalf of a role.
    Upload {
        #[arg(long = "as")]
        uploader: String,
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        department: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "ragguard=info,warn".into()))
        .init();

    let cli = Cli::parse();
    let config = Config::load_from(&cli.config)?;
    let settings = config.settings()?;
    let policy = AccessPolicy::from_settings(&settings.access)?;

    if let Command::Roles = cli.command {
        print_roles(&policy);
        return Ok(());
    }

    let corpus = load_corpus(&settings, config.base_dir(), policy)?;
    match cli.command {
        Command::Query { role, top_k, json, question } => {
            let retriever = corpus.retriever(settings.retrieval.clone());
            let top_k = top_k.unwrap_or(settings.retrieval.default_top_k);
            let result = retriever.retrieve(&question, &Role::new(role.as_str()), top_k).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
                return Ok(());
            }
            if result.is_empty() {
                println!("No documents accessible to {role} matched the query.");
            }
            for (i, doc) in result.iter().enumerate() {
                println!("{:>2}. [{}] {}  score={:.3}", i + 1, doc.department, doc.source_label, doc.score);
                println!("    {}", preview(&doc.content, 160));
            }
        }
        Command::Ask { role, top_k, question } => {
            let retriever = corpus.retriever(settings.retrieval.clone());
            let assistant = Assistant::new(retriever, Arc::new(ExcerptGenerator::default()));
            let role = Role::new(role);
            let answer = match top_k {
                Some(top_k) => assistant.ask_top_k(&question, &role, top_k).await?,
                None => assistant.ask(&question, &role).await?,
            };
            println!("{}", answer.answer);
            if !answer.sources.is_empty() {
                println!("\nSources:");
                for source in &answer.sources {
                    println!("  - {source}");
                }
            }
        }
        Command::Docs { role } => {
            let role = Role::new(role);
            let visible: Vec<_> = corpus
                .registry()
                .all()?
                .into_iter()
                .filter(|doc| corpus.policy().is_visible(&role, doc))
                .collect();
            println!("{} of {} documents visible to {role}", visible.len(), corpus.registry().len()?);
            for doc in visible {
                println!("  [{}] {}", doc.department(), doc.source_label());
            }
        }
        Command::Upload { uploader, file, department } => {
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .with_context(|| format!("{} has no file name", file.display()))?;
            let bytes = fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let upload = Upload { filename, bytes, department: department.map(Department::new) };
            let keywords = DepartmentKeywords::from_settings(&settings.ingest);
            let doc = corpus.admit_upload(upload, &Role::new(uploader), &keywords)?;
            let roles: Vec<&str> = doc.allowed_roles().iter().map(Role::as_str).collect();
            println!("Uploaded {} to {}", doc.id(), doc.department());
            println!("Accessible to: {}", roles.join(", "));
        }
        Command::Roles => {}
    }
    Ok(())
}

fn build_index(settings: &Settings, base: &Path) -> Result<Arc<dyn SemanticIndex>> {
    let heap = settings.index.writer_heap_bytes;
    let index: Arc<dyn SemanticIndex> = match settings.index.backend {
        IndexBackend::Text => Arc::new(TantivyIndex::in_memory(heap)?),
        IndexBackend::Vector => Arc::new(VectorIndex::new(build_embedder(&settings.index, base)?)),
        IndexBackend::Hybrid => Arc::new(HybridIndex::new(
            TantivyIndex::in_memory(heap)?,
            VectorIndex::new(build_embedder(&settings.index, base)?),
        )),
    };
    Ok(index)
}

fn load_corpus(settings: &Settings, base: &Path, policy: AccessPolicy) -> Result<Corpus> {
    let data_dir = settings.data_dir(base);
    let documents = DocumentLoader::new(&policy).load_directory(&data_dir)?;
    if documents.is_empty() {
        bail!("no documents found under {}", data_dir.display());
    }
    let corpus = Corpus::new(policy, build_index(settings, base)?);

    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents {msg}")?
            .progress_chars("#>-"),
    );
    for doc in documents {
        pb.set_message(doc.source_label().to_string());
        corpus.admit(doc)?;
        pb.inc(1);
    }
    pb.finish_and_clear();
    info!(documents = corpus.registry().len()?, backend = ?settings.index.backend, "corpus ready");
    Ok(corpus)
}

fn print_roles(policy: &AccessPolicy) {
    println!("Full access: {}", policy.full_access_role());
    for (department, roles) in policy.departments() {
        let roles: Vec<&str> = roles.iter().map(Role::as_str).collect();
        println!("  {department:<12} {}", roles.join(", "));
    }
}

fn preview(content: &str, max_chars: usize) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        format!("{}...", flat.chars().take(max_chars).collect::<String>())
    }
}
