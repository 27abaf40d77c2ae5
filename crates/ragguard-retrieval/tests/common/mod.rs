#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::time::Duration;

use anyhow::bail;
use ragguard_core::config::AccessSettings;
use ragguard_core::traits::{PartialInsert, SemanticIndex};
use ragguard_core::{AccessPolicy, Department, Document, DocumentDraft, DocumentId, SearchHit, SourceKind};
use ragguard_retrieval::Corpus;

/// Semantic index whose search output is written by the test: it returns the
/// scripted ranking verbatim (cut to `limit`) whatever the query is.
#[derive(Default)]
pub struct ScriptedIndex {
    ranking: Mutex<Vec<SearchHit>>,
    added: Mutex<Vec<DocumentId>>,
    delay: Mutex<Option<Duration>>,
    fail_search: AtomicBool,
    fail_add: AtomicBool,
    last_limit: AtomicUsize,
}

impl ScriptedIndex {
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    /// Replace the ranking with `(id, score)` pairs, in the given order.
    pub fn script(&self, ranking: &[(&str, f32)]) {
        *self.ranking.lock().unwrap() =
            ranking.iter().map(|(id, score)| SearchHit::new(*id, *score, SourceKind::Vector)).collect();
    }

    pub fn set_delay(&self, delay: Duration) { *self.delay.lock().unwrap() = Some(delay); }
    pub fn fail_searches(&self) { self.fail_search.store(true, Ordering::SeqCst); }
    pub fn fail_adds(&self) { self.fail_add.store(true, Ordering::SeqCst); }
    pub fn last_limit(&self) -> usize { self.last_limit.load(Ordering::SeqCst) }
    pub fn added(&self) -> Vec<DocumentId> { self.added.lock().unwrap().clone() }
}

impl SemanticIndex for ScriptedIndex {
    fn add(&self, id: &DocumentId, _content: &str) -> anyhow::Result<()> {
        if self.fail_add.load(Ordering::SeqCst) {
            bail!("index writer unavailable");
        }
        self.added.lock().unwrap().push(id.clone());
        Ok(())
    }

    fn search(&self, _query: &str, limit: usize) -> anyhow::Result<Vec<SearchHit>> {
        self.last_limit.store(limit, Ordering::SeqCst);
        if let Some(delay) = *self.delay.lock().unwrap() {
            std::thread::sleep(delay);
        }
        if self.fail_search.load(Ordering::SeqCst) {
            bail!("similarity engine offline");
        }
        Ok(self.ranking.lock().unwrap().iter().take(limit).cloned().collect())
    }
}

/// How [`RecordingIndex::add`] finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Succeed,
    /// Fails cleanly: the id is forgotten again.
    Fail,
    /// Fails with the id still searchable.
    FailPartially,
}

/// Semantic index whose search returns every id `add` has started on, so a
/// document is searchable from the moment its insertion begins.
pub struct RecordingIndex {
    seen: Mutex<Vec<DocumentId>>,
    add_delay: Duration,
    outcome: Mutex<AddOutcome>,
    hold: Mutex<Option<Arc<Barrier>>>,
}

impl RecordingIndex {
    pub fn new(add_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            add_delay,
            outcome: Mutex::new(AddOutcome::Succeed),
            hold: Mutex::new(None),
        })
    }

    pub fn set_outcome(&self, outcome: AddOutcome) { *self.outcome.lock().unwrap() = outcome; }

    /// The next `add` meets the returned barrier twice once it has recorded
    /// its id: once on entry, once before finishing.
    pub fn hold_next_add(&self) -> Arc<Barrier> {
        let barrier = Arc::new(Barrier::new(2));
        *self.hold.lock().unwrap() = Some(Arc::clone(&barrier));
        barrier
    }

    pub fn seen(&self) -> Vec<DocumentId> { self.seen.lock().unwrap().clone() }
}

impl SemanticIndex for RecordingIndex {
    fn add(&self, id: &DocumentId, _content: &str) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push(id.clone());
        let held = self.hold.lock().unwrap().take();
        if let Some(barrier) = held {
            barrier.wait();
            barrier.wait();
        }
        std::thread::sleep(self.add_delay);
        let outcome = *self.outcome.lock().unwrap();
        match outcome {
            AddOutcome::Succeed => Ok(()),
            AddOutcome::Fail => {
                self.seen.lock().unwrap().retain(|seen| seen != id);
                bail!("index writer unavailable")
            }
            AddOutcome::FailPartially => Err(PartialInsert::new(id, "second engine rejected the insert").into()),
        }
    }

    fn search(&self, _query: &str, limit: usize) -> anyhow::Result<Vec<SearchHit>> {
        let seen = self.seen.lock().unwrap();
        Ok(seen
            .iter()
            .rev()
            .take(limit)
            .enumerate()
            .map(|(rank, id)| SearchHit::new(id.as_str(), 1.0 / (rank as f32 + 1.0), SourceKind::Vector))
            .collect())
    }
}

pub fn default_policy() -> AccessPolicy {
    AccessPolicy::from_settings(&AccessSettings::default()).expect("default policy")
}

pub fn document(policy: &AccessPolicy, id: &str, department: &str, content: &str) -> Document {
    let draft = DocumentDraft {
        id: DocumentId::new(id),
        content: content.to_string(),
        department: Department::new(department),
        source_label: id.to_string(),
    };
    Document::new(draft, policy).expect("document")
}

/// Corpus over a scripted index with `(id, department)` documents admitted.
pub fn scripted_corpus(documents: &[(&str, &str)]) -> (Corpus, Arc<ScriptedIndex>) {
    let index = ScriptedIndex::new();
    let policy = default_policy();
    let docs: Vec<Document> =
        documents.iter().map(|(id, dept)| document(&policy, id, dept, &format!("body of {id}"))).collect();
    let corpus = Corpus::new(policy, index.clone());
    corpus.admit_all(docs).expect("admit");
    (corpus, index)
}
