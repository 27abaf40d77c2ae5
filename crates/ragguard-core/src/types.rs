//! Domain types shared by the index engines and the retrieval layer.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::Result;
use crate::policy::AccessPolicy;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }
            pub fn as_str(&self) -> &str { &self.0 }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.pad(&self.0) }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self { Self(value.to_string()) }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self { Self(value) }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str { &self.0 }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str { &self.0 }
        }
    };
}

string_newtype!(
    /// Opaque authorization class of a caller. Ordinary roles do not inherit
    /// from each other; only the policy's full-access role is special.
    Role
);

string_newtype!(
    /// Owning/topical category of a document.
    Department
);

string_newtype!(
    /// Stable, caller-chosen document identifier.
    DocumentId
);

/// Input for [`Document::new`]. Carries everything except the allowed roles,
/// which only the access policy may decide.
#[derive(Debug, Clone)]
pub struct DocumentDraft {
    pub id: DocumentId,
    pub content: String,
    pub department: Department,
    pub source_label: String,
}

/// One retrieval unit: the whole document, never chunked.
///
/// Fields are private so `allowed_roles` can only originate from an
/// [`AccessPolicy`]; there is no way to construct a document with an ad hoc
/// or empty role set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    id: DocumentId,
    content: String,
    department: Department,
    allowed_roles: BTreeSet<Role>,
    source_label: String,
}

impl Document {
    pub fn new(draft: DocumentDraft, policy: &AccessPolicy) -> Result<Self> {
        let allowed_roles = policy.allowed_roles_for(&draft.department)?;
        Ok(Self {
            id: draft.id,
            content: draft.content,
            department: draft.department,
            allowed_roles,
            source_label: draft.source_label,
        })
    }

    pub fn id(&self) -> &DocumentId { &self.id }
    pub fn content(&self) -> &str { &self.content }
    pub fn department(&self) -> &Department { &self.department }
    pub fn allowed_roles(&self) -> &BTreeSet<Role> { &self.allowed_roles }
    pub fn source_label(&self) -> &str { &self.source_label }
}

/// Indicates which engine produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Text,
}

/// The minimal surface returned by all engines.
///
/// `score` is engine-specific but higher is always better. Hits carry no
/// access metadata: the registry is the only authority for that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: DocumentId,
    pub score: f32,
    pub source: SourceKind,
}

impl SearchHit {
    pub fn new(id: impl Into<DocumentId>, score: f32, source: SourceKind) -> Self {
        Self { id: id.into(), score, source }
    }
}
