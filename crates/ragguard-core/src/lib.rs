//! Access-controlled retrieval primitives: the role/department policy, the
//! document registry, engine capability traits and the directory loader.

pub mod config;
pub mod error;
pub mod loader;
pub mod policy;
pub mod registry;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use policy::AccessPolicy;
pub use registry::{DocumentRegistry, Reservation};
pub use types::{Department, Document, DocumentDraft, DocumentId, Role, SearchHit, SourceKind};
