use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use ragguard_core::types::Role;
use ragguard_core::{Error, Result};

use crate::retriever::{RetrievedDocument, Retriever};

/// Produces an answer from a question and the documents retrieved for it.
/// Implementations only ever see documents the caller may read.
pub trait AnswerGenerator: Send + Sync {
    fn generate(&self, question: &str, context: &[RetrievedDocument]) -> anyhow::Result<String>;
}

/// Prompt text for a hosted model: one `[Source i: label]` block per
/// document followed by the question.
pub fn build_prompt(question: &str, context: &[RetrievedDocument]) -> String {
    let mut documents = String::new();
    for (i, doc) in context.iter().enumerate() {
        documents.push_str(&format!("\n[Source {}: {}]\n{}\n", i + 1, doc.source_label, doc.content));
    }
    format!(
        "Based on these company documents, answer the question clearly and concisely.\n\n\
         DOCUMENTS:\n{documents}\nQUESTION: {question}\n\nANSWER:"
    )
}

/// Offline generator: quotes the most relevant line of each source.
#[derive(Debug, Clone)]
pub struct ExcerptGenerator {
    max_chars: usize,
}

impl Default for ExcerptGenerator {
    fn default() -> Self { Self { max_chars: 240 } }
}

impl ExcerptGenerator {
    pub fn new(max_chars: usize) -> Self { Self { max_chars: max_chars.max(1) } }

    fn excerpt(&self, question: &str, content: &str) -> String {
        let terms: Vec<String> = question
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() > 2)
            .map(str::to_lowercase)
            .collect();
        let lines = content.lines().map(str::trim).filter(|l| !l.is_empty());
        let line = lines
            .clone()
            .find(|l| {
                let lower = l.to_lowercase();
                terms.iter().any(|t| lower.contains(t.as_str()))
            })
            .or_else(|| lines.clone().next())
            .unwrap_or_default();
        if line.chars().count() > self.max_chars {
            let cut: String = line.chars().take(self.max_chars).collect();
            format!("{}...", cut.trim_end())
        } else {
            line.to_string()
        }
    }
}

impl AnswerGenerator for ExcerptGenerator {
    fn generate(&self, question: &str, context: &[RetrievedDocument]) -> anyhow::Result<String> {
        let mut out = String::from("Relevant excerpts:");
        for (i, doc) in context.iter().enumerate() {
            out.push_str(&format!("\n[{}] {}: {}", i + 1, doc.source_label, self.excerpt(question, &doc.content)));
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<String>,
    pub role: Role,
    pub query: String,
}

/// Retrieval followed by answer generation.
pub struct Assistant {
    retriever: Retriever,
    generator: Arc<dyn AnswerGenerator>,
}

impl Assistant {
    pub fn new(retriever: Retriever, generator: Arc<dyn AnswerGenerator>) -> Self {
        Self { retriever, generator }
    }

    pub async fn ask(&self, question: &str, role: &Role) -> Result<Answer> {
        self.ask_top_k(question, role, self.retriever.settings().default_top_k).await
    }

    pub async fn ask_top_k(&self, question: &str, role: &Role, top_k: usize) -> Result<Answer> {
        let retrieved = self.retriever.retrieve(question, role, top_k).await?;
        if retrieved.is_empty() {
            return Ok(Answer {
                answer: format!("No documents found accessible to {role} role for this query."),
                sources: Vec::new(),
                role: role.clone(),
                query: question.to_string(),
            });
        }

        let sources = retrieved.sources();
        let generator = Arc::clone(&self.generator);
        let owned_question = question.to_string();
        let task = tokio::task::spawn_blocking(move || generator.generate(&owned_question, &retrieved.items));
        let answer = match task.await {
            Ok(Ok(answer)) => answer,
            Ok(Err(e)) => {
                warn!(error = %e, "answer generation failed");
                return Err(Error::Generation(format!("{e:#}")));
            }
            Err(join) => return Err(Error::Generation(format!("generator task failed: {join}"))),
        };
        debug!(role = %role, sources = sources.len(), "answer generated");
        Ok(Answer { answer, sources, role: role.clone(), query: question.to_string() })
    }
}
