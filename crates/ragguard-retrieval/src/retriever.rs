use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use ragguard_core::config::RetrievalSettings;
use ragguard_core::traits::SemanticIndex;
use ragguard_core::types::{Department, Document, DocumentId, Role, SearchHit};
use ragguard_core::{AccessPolicy, DocumentRegistry, Error, Result};

/// One visible document in a retrieval, with what a caller needs to cite it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedDocument {
    pub id: DocumentId,
    pub content: String,
    pub source_label: String,
    pub department: Department,
    /// Raw similarity score reported by the index.
    pub score: f32,
}

/// Ranked, access-filtered documents. Empty when nothing is visible.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub items: Vec<RetrievedDocument>,
}

impl RetrievalResult {
    pub fn len(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn iter(&self) -> std::slice::Iter<'_, RetrievedDocument> { self.items.iter() }

    pub fn sources(&self) -> Vec<String> {
        self.items.iter().map(|d| d.source_label.clone()).collect()
    }
}

impl<'a> IntoIterator for &'a RetrievalResult {
    type Item = &'a RetrievedDocument;
    type IntoIter = std::slice::Iter<'a, RetrievedDocument>;
    fn into_iter(self) -> Self::IntoIter { self.items.iter() }
}

#[derive(Clone)]
pub struct Retriever {
    policy: Arc<AccessPolicy>,
    registry: Arc<DocumentRegistry>,
    index: Arc<dyn SemanticIndex>,
    settings: RetrievalSettings,
}

impl Retriever {
    pub fn new(
        policy: Arc<AccessPolicy>,
        registry: Arc<DocumentRegistry>,
        index: Arc<dyn SemanticIndex>,
        settings: RetrievalSettings,
    ) -> Self {
        Self { policy, registry, index, settings }
    }

    pub fn settings(&self) -> &RetrievalSettings { &self.settings }

    pub fn policy(&self) -> &AccessPolicy { &self.policy }

    /// Up to `top_k` documents visible to `role`, most relevant first, with
    /// documents from the role's primary department ahead of the rest.
    pub async fn retrieve(&self, query: &str, role: &Role, top_k: usize) -> Result<RetrievalResult> {
        if top_k == 0 {
            return Err(Error::InvalidArgument("top_k must be positive".into()));
        }
        if top_k > self.settings.max_top_k {
            return Err(Error::InvalidArgument(format!(
                "top_k {top_k} exceeds the configured maximum of {}",
                self.settings.max_top_k
            )));
        }
        if query.trim().is_empty() {
            return Err(Error::InvalidArgument("query must not be blank".into()));
        }

        let over_fetch = self.settings.over_fetch(top_k);
        let hits = self.search(query, over_fetch).await?;
        let candidates = hits.len();

        let mut visible = Vec::with_capacity(hits.len());
        for hit in hits {
            // `None`: still being admitted, or retired after a partial insert.
            let Some(document) = self.registry.resolve(hit.id.as_str()).map_err(|e| match e {
                Error::NotFound(_) => {
                    Error::Inconsistent(format!("index returned '{}' which has no registry entry", hit.id))
                }
                other => other,
            })?
            else {
                continue;
            };
            if self.policy.is_visible(role, &document) {
                visible.push((document, hit.score));
            }
        }
        let eligible = visible.len();

        let items = rank(self.policy.primary_department(role), visible, top_k);
        debug!(role = %role, over_fetch, candidates, eligible, returned = items.len(), "retrieval finished");
        Ok(RetrievalResult { items })
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let index = Arc::clone(&self.index);
        let query = query.to_string();
        let timeout = self.settings.search_timeout();
        let task = tokio::task::spawn_blocking(move || index.search(&query, limit));
        match tokio::time::timeout(timeout, task).await {
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "semantic index search timed out");
                Err(Error::UpstreamTimeout(timeout))
            }
            Ok(Err(join)) => Err(Error::UpstreamUnavailable(format!("search task failed: {join}"))),
            Ok(Ok(Err(e))) => Err(Error::UpstreamUnavailable(format!("{e:#}"))),
            Ok(Ok(Ok(hits))) => Ok(hits),
        }
    }
}

/// Stable partition on `primary` (when present), then truncate to `top_k`.
/// Relative similarity order is kept inside each partition.
fn rank(primary: Option<&Department>, visible: Vec<(Arc<Document>, f32)>, top_k: usize) -> Vec<RetrievedDocument> {
    let ordered: Vec<(Arc<Document>, f32)> = match primary {
        Some(department) => {
            let (own, rest): (Vec<_>, Vec<_>) =
                visible.into_iter().partition(|(doc, _)| doc.department() == department);
            own.into_iter().chain(rest).collect()
        }
        None => visible,
    };
    ordered
        .into_iter()
        .take(top_k)
        .map(|(doc, score)| RetrievedDocument {
            id: doc.id().clone(),
            content: doc.content().to_string(),
            source_label: doc.source_label().to_string(),
            department: doc.department().clone(),
            score,
        })
        .collect()
}
