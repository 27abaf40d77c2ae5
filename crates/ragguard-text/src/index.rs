use anyhow::{anyhow, Result};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::Value;
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::{debug, warn};

use ragguard_core::traits::{PartialInsert, SemanticIndex};
use ragguard_core::types::{DocumentId, SearchHit, SourceKind};

use crate::tantivy_utils::{build_schema, register_tokenizer, DocumentFields};

/// BM25 keyword index over whole documents.
///
/// Only identifiers are stored; content and access metadata live in the
/// registry. The reader reloads manually after each commit, so a document is
/// searchable exactly when [`SemanticIndex::add`] returns.
pub struct TantivyIndex {
	index: Index,
	reader: IndexReader,
	writer: Mutex<IndexWriter>,
	fields: DocumentFields,
}

impl TantivyIndex {
	pub fn in_memory(writer_heap_bytes: usize) -> Result<Self> {
		let (schema, fields) = build_schema();
		Self::open(Index::create_in_ram(schema), fields, writer_heap_bytes)
	}

	/// Create a fresh index in `index_dir`, replacing whatever was there.
	pub fn create_in_dir(index_dir: &Path, writer_heap_bytes: usize) -> Result<Self> {
		let (schema, fields) = build_schema();
		if index_dir.exists() { std::fs::remove_dir_all(index_dir)?; }
		std::fs::create_dir_all(index_dir)?;
		Self::open(Index::create_in_dir(index_dir, schema)?, fields, writer_heap_bytes)
	}

	fn open(index: Index, fields: DocumentFields, writer_heap_bytes: usize) -> Result<Self> {
		register_tokenizer(&index);
		let writer = index.writer_with_num_threads(1, writer_heap_bytes)?;
		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
		Ok(Self { index, reader, writer: Mutex::new(writer), fields })
	}

	pub fn num_docs(&self) -> u64 { self.reader.searcher().num_docs() }

	fn writer(&self) -> Result<MutexGuard<'_, IndexWriter>> {
		self.writer.lock().map_err(|_| anyhow!("tantivy writer lock poisoned"))
	}

	// A failed add must leave nothing behind for a later commit to expose.
	fn undo(&self, writer: &mut IndexWriter, id: &DocumentId) -> tantivy::Result<()> {
		writer.delete_term(Term::from_field_text(self.fields.id, id.as_str()));
		writer.commit().and_then(|_| self.reader.reload())
	}
}

impl SemanticIndex for TantivyIndex {
	fn add(&self, id: &DocumentId, content: &str) -> Result<()> {
		let mut writer = self.writer()?;
		writer.add_document(doc!(self.fields.id => id.as_str(), self.fields.text => content))?;
		if let Err(e) = writer.commit() {
			if let Err(rollback) = writer.rollback() {
				warn!(id = %id, error = %rollback, "could not roll back failed tantivy commit");
				return Err(PartialInsert::new(id, format!("commit failed ({e}), rollback failed ({rollback})")).into());
			}
			return Err(e.into());
		}
		if let Err(e) = self.reader.reload() {
			if let Err(undo) = self.undo(&mut writer, id) {
				warn!(id = %id, error = %undo, "could not undo partial tantivy insert");
				return Err(PartialInsert::new(id, format!("reload failed ({e}), undo failed ({undo})")).into());
			}
			return Err(e.into());
		}
		Ok(())
	}

	fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
		if query.trim().is_empty() { return Ok(Vec::new()); }
		let searcher = self.reader.searcher();
		// TopDocs allocates for `limit` up front; never ask for more than the index holds.
		let limit = limit.min(usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX));
		if limit == 0 { return Ok(Vec::new()); }
		let parser = QueryParser::for_index(&self.index, vec![self.fields.text]);
		let (parsed, errors) = parser.parse_query_lenient(query);
		if !errors.is_empty() { debug!(dropped = errors.len(), "lenient query parse ignored fragments"); }
		let top_docs = searcher.search(parsed.as_ref(), &TopDocs::with_limit(limit))?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			let id = doc.get_first(self.fields.id).and_then(|v| v.as_str()).ok_or_else(|| anyhow!("indexed document without id"))?;
			hits.push(SearchHit::new(id, score, SourceKind::Text));
		}
		Ok(hits)
	}
}
