//! In-memory, append-only store of document access metadata.
//!
//! Registration is two-phase. [`DocumentRegistry::reserve`] claims an
//! identifier without exposing anything; the caller indexes the document and
//! then calls [`Reservation::publish`]. `lookup`, `all` and `len` only ever
//! see published documents, so metadata never exists for a document that is
//! not yet searchable.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Error, Result};
use crate::types::{Document, DocumentId};

#[derive(Debug, Default)]
struct Entries {
    published: HashMap<DocumentId, Arc<Document>>,
    /// Reserved while the index insertion is in flight.
    pending: HashSet<DocumentId>,
    /// Insertions that failed part-way; the index may still return these.
    abandoned: HashSet<DocumentId>,
}

impl Entries {
    fn is_claimed(&self, id: &DocumentId) -> bool {
        self.published.contains_key(id) || self.pending.contains(id) || self.abandoned.contains(id)
    }
}

#[derive(Debug, Default)]
pub struct DocumentRegistry {
    entries: RwLock<Entries>,
}

/// A claimed identifier. Dropping it without publishing releases the claim.
#[must_use = "a reservation is released when dropped"]
pub struct Reservation<'a> {
    registry: &'a DocumentRegistry,
    id: Option<DocumentId>,
}

impl Reservation<'_> {
    /// Make `document` visible to `lookup` and `all`. It must carry the
    /// reserved identifier.
    pub fn publish(mut self, document: Document) -> Result<Arc<Document>> {
        let id = self.take()?;
        if document.id() != &id {
            return Err(Error::Operation(format!("reservation for '{id}' cannot publish '{}'", document.id())));
        }
        let mut entries = self.registry.write()?;
        entries.pending.remove(&id);
        let document = Arc::new(document);
        entries.published.insert(id, Arc::clone(&document));
        Ok(document)
    }

    /// Keep the identifier claimed but never published. Used when the index
    /// may hold a partial entry for it.
    pub fn abandon(mut self) -> Result<()> {
        let id = self.take()?;
        let mut entries = self.registry.write()?;
        entries.pending.remove(&id);
        entries.abandoned.insert(id);
        Ok(())
    }

    fn take(&mut self) -> Result<DocumentId> {
        self.id.take().ok_or_else(|| Error::Operation("reservation already settled".into()))
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            let mut entries = self.registry.entries.write().unwrap_or_else(PoisonError::into_inner);
            entries.pending.remove(&id);
        }
    }
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `id`. An identifier that is published, pending or abandoned is
    /// never handed out again: a replacement could carry looser access
    /// metadata than the original.
    pub fn reserve(&self, id: &DocumentId) -> Result<Reservation<'_>> {
        let mut entries = self.write()?;
        if entries.is_claimed(id) {
            return Err(Error::DuplicateIdentifier(id.to_string()));
        }
        entries.pending.insert(id.clone());
        Ok(Reservation { registry: self, id: Some(id.clone()) })
    }

    /// Reserve and publish at once, for documents that need no indexing.
    pub fn register(&self, document: Document) -> Result<Arc<Document>> {
        self.reserve(document.id())?.publish(document)
    }

    pub fn lookup(&self, id: &str) -> Result<Arc<Document>> {
        self.read()?
            .published
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Like [`lookup`](Self::lookup), but `Ok(None)` for an identifier that
    /// is reserved or abandoned rather than unknown.
    pub fn resolve(&self, id: &str) -> Result<Option<Arc<Document>>> {
        let entries = self.read()?;
        if let Some(document) = entries.published.get(id) {
            return Ok(Some(Arc::clone(document)));
        }
        if entries.pending.contains(id) || entries.abandoned.contains(id) {
            return Ok(None);
        }
        Err(Error::NotFound(id.to_string()))
    }

    /// All published documents ordered by identifier. Startup and tests only.
    pub fn all(&self) -> Result<Vec<Arc<Document>>> {
        let mut documents: Vec<Arc<Document>> = self.read()?.published.values().cloned().collect();
        documents.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(documents)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.published.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Entries>> {
        self.entries.read().map_err(|_| Error::Operation("document registry lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Entries>> {
        self.entries.write().map_err(|_| Error::Operation("document registry lock poisoned".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccessSettings;
    use crate::policy::AccessPolicy;
    use crate::types::{Department, DocumentDraft};

    fn doc(id: &str, department: &str) -> Document {
        let policy = AccessPolicy::from_settings(&AccessSettings::default()).unwrap();
        let draft = DocumentDraft {
            id: DocumentId::new(id),
            content: format!("content of {id}"),
            department: Department::new(department),
            source_label: id.to_string(),
        };
        Document::new(draft, &policy).unwrap()
    }

    #[test]
    fn register_then_lookup() {
        let registry = DocumentRegistry::new();
        registry.register(doc("hr/handbook.md", "hr")).unwrap();
        let found = registry.lookup("hr/handbook.md").unwrap();
        assert_eq!(found.department().as_str(), "hr");
        assert!(matches!(registry.lookup("nope"), Err(Error::NotFound(id)) if id == "nope"));
    }

    #[test]
    fn duplicate_identifier_leaves_registry_unchanged() {
        let registry = DocumentRegistry::new();
        registry.register(doc("report", "finance")).unwrap();

        let err = registry.register(doc("report", "general")).unwrap_err();
        assert!(matches!(err, Error::DuplicateIdentifier(id) if id == "report"));
        assert_eq!(registry.len().unwrap(), 1);
        assert_eq!(registry.lookup("report").unwrap().department().as_str(), "finance");
    }

    #[test]
    fn all_is_sorted() {
        let registry = DocumentRegistry::new();
        for id in ["b", "c", "a"] {
            registry.register(doc(id, "general")).unwrap();
        }
        let ids: Vec<String> = registry.all().unwrap().iter().map(|d| d.id().to_string()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn reservation_is_invisible_until_published() {
        let registry = DocumentRegistry::new();
        let payroll = doc("hr/payroll.md", "hr");
        let reservation = registry.reserve(payroll.id()).unwrap();

        assert!(matches!(registry.lookup("hr/payroll.md"), Err(Error::NotFound(_))));
        assert!(registry.resolve("hr/payroll.md").unwrap().is_none());
        assert!(registry.all().unwrap().is_empty());
        assert!(registry.is_empty().unwrap());
        assert!(matches!(registry.register(doc("hr/payroll.md", "general")), Err(Error::DuplicateIdentifier(_))));

        reservation.publish(payroll).unwrap();
        assert_eq!(registry.lookup("hr/payroll.md").unwrap().department().as_str(), "hr");
        assert!(registry.resolve("hr/payroll.md").unwrap().is_some());
        assert_eq!(registry.len().unwrap(), 1);
    }

    #[test]
    fn publish_rejects_a_different_document() {
        let registry = DocumentRegistry::new();
        let reservation = registry.reserve(&DocumentId::new("a")).unwrap();
        assert!(matches!(reservation.publish(doc("b", "general")), Err(Error::Operation(_))));
        assert!(registry.is_empty().unwrap());
        assert!(matches!(registry.resolve("a"), Err(Error::NotFound(_))));
    }

    #[test]
    fn dropped_reservation_frees_the_identifier() {
        let registry = DocumentRegistry::new();
        drop(registry.reserve(&DocumentId::new("a")).unwrap());
        assert!(matches!(registry.resolve("a"), Err(Error::NotFound(_))));
        registry.register(doc("a", "general")).unwrap();
        assert_eq!(registry.len().unwrap(), 1);
    }

    #[test]
    fn abandoned_identifier_stays_claimed_and_unpublished() {
        let registry = DocumentRegistry::new();
        registry.reserve(&DocumentId::new("a")).unwrap().abandon().unwrap();
        assert!(registry.resolve("a").unwrap().is_none());
        assert!(matches!(registry.lookup("a"), Err(Error::NotFound(_))));
        assert!(matches!(registry.register(doc("a", "general")), Err(Error::DuplicateIdentifier(_))));
        assert!(registry.is_empty().unwrap());
    }

    #[test]
    fn poisoned_lock_is_reported_not_hidden() {
        let registry = Arc::new(DocumentRegistry::new());
        registry.register(doc("a", "general")).unwrap();
        let poisoner = Arc::clone(&registry);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.entries.write().unwrap();
            panic!("writer died");
        })
        .join();
        assert!(matches!(registry.len(), Err(Error::Operation(_))));
        assert!(matches!(registry.is_empty(), Err(Error::Operation(_))));
        assert!(matches!(registry.lookup("a"), Err(Error::Operation(_))));
    }
}
