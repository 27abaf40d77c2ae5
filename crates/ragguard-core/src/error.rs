use std::time::Duration;

use thiserror::Error;

/// Failure outcomes of registration, retrieval and configuration.
///
/// Filtering a query down to zero visible documents is *not* an error: an
/// empty result is the observable form of access denial.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate document identifier: {0}")]
    DuplicateIdentifier(String),

    #[error("Unknown department: {0}")]
    UnknownDepartment(String),

    /// The semantic index and the registry disagree about a document.
    #[error("Registry inconsistency: {0}")]
    Inconsistent(String),

    #[error("Semantic index did not respond within {0:?}")]
    UpstreamTimeout(Duration),

    #[error("Semantic index unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to parse {source_label}: {reason}")]
    Parse { source_label: String, reason: String },

    #[error("Role '{0}' may not upload documents")]
    UploadNotPermitted(String),

    #[error("Answer generation failed: {0}")]
    Generation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    /// Upstream failures may succeed on a later attempt; the caller owns the
    /// retry policy.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::UpstreamTimeout(_) | Error::UpstreamUnavailable(_))
    }

    /// Faults that indicate a bug or broken invariant rather than bad input.
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Inconsistent(_) | Error::Operation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
