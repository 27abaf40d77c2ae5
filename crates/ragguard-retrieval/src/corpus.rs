use std::sync::Arc;

use tracing::{debug, info, warn};

use ragguard_core::config::RetrievalSettings;
use ragguard_core::loader::{parse_document, DepartmentKeywords};
use ragguard_core::traits::{PartialInsert, SemanticIndex};
use ragguard_core::types::{Department, Document, DocumentDraft, DocumentId, Role};
use ragguard_core::{AccessPolicy, DocumentRegistry, Error, Result};

use crate::retriever::Retriever;

/// A file submitted for ingestion after the caller has been authenticated.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
    /// Explicit department; inferred from the filename when absent.
    pub department: Option<Department>,
}

/// Owns the registry and index pair and is the only way documents enter
/// either of them.
pub struct Corpus {
    policy: Arc<AccessPolicy>,
    registry: Arc<DocumentRegistry>,
    index: Arc<dyn SemanticIndex>,
}

impl Corpus {
    pub fn new(policy: AccessPolicy, index: Arc<dyn SemanticIndex>) -> Self {
        Self { policy: Arc::new(policy), registry: Arc::new(DocumentRegistry::new()), index }
    }

    pub fn policy(&self) -> &AccessPolicy { &self.policy }

    pub fn registry(&self) -> &DocumentRegistry { &self.registry }

    /// Reserve the identifier, index the document, then publish its access
    /// metadata. Until publication the document is invisible to the
    /// registry and retrieval skips any hit for it. If indexing fails the
    /// reservation is released, or kept as a tombstone when the index may
    /// still hold part of the document.
    pub fn admit(&self, document: Document) -> Result<Arc<Document>> {
        let reservation = self.registry.reserve(document.id())?;
        if let Err(e) = self.index.add(document.id(), document.content()) {
            if PartialInsert::is_partial(&e) {
                warn!(id = %document.id(), error = %format!("{e:#}"), "index holds a partial entry, identifier retired");
                reservation.abandon()?;
            } else {
                warn!(id = %document.id(), error = %format!("{e:#}"), "indexing failed, reservation released");
                drop(reservation);
            }
            return Err(Error::UpstreamUnavailable(format!("indexing {} failed: {e:#}", document.id())));
        }
        let document = reservation.publish(document)?;
        debug!(id = %document.id(), department = %document.department(), "admitted document");
        Ok(document)
    }

    /// Admit documents in order, stopping at the first failure.
    pub fn admit_all(&self, documents: impl IntoIterator<Item = Document>) -> Result<usize> {
        let mut admitted = 0;
        for document in documents {
            self.admit(document)?;
            admitted += 1;
        }
        info!(admitted, "corpus loaded");
        Ok(admitted)
    }

    /// Ingest an uploaded file on behalf of `uploader`. Only the full-access
    /// role may upload.
    pub fn admit_upload(&self, upload: Upload, uploader: &Role, keywords: &DepartmentKeywords) -> Result<Arc<Document>> {
        if !self.policy.is_full_access(uploader) {
            return Err(Error::UploadNotPermitted(uploader.to_string()));
        }
        let content = parse_document(&upload.filename, &upload.bytes)?;
        let department = match upload.department {
            Some(department) => department,
            None => keywords.infer(&upload.filename).ok_or_else(|| {
                Error::InvalidArgument(format!("cannot infer a department for '{}'; specify one", upload.filename))
            })?,
        };
        let draft = DocumentDraft {
            id: DocumentId::new(upload.filename.as_str()),
            content,
            department,
            source_label: upload.filename,
        };
        let document = self.admit(Document::new(draft, &self.policy)?)?;
        info!(id = %document.id(), department = %document.department(), uploader = %uploader, "upload admitted");
        Ok(document)
    }

    /// A retriever over this corpus. Later admissions are visible to it.
    pub fn retriever(&self, settings: RetrievalSettings) -> Retriever {
        Retriever::new(Arc::clone(&self.policy), Arc::clone(&self.registry), Arc::clone(&self.index), settings)
    }
}
