//! Typed failure taxonomy for the generation pipeline.
//!
//! The Revision Controller and the Merge/Split Resolver branch on error
//! kinds (transient vs. integrity vs. budget exhaustion), so these are
//! concrete enums rather than stringly `anyhow` errors. `anyhow` still
//! wraps them at binary and test boundaries.

use thiserror::Error;
use uuid::Uuid;

/// Failures raised while validating or reading the requirements profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("requirements profile is missing required section '{0}'")]
    Incomplete(String),
    #[error("requirements profile is not a JSON object: {0}")]
    Malformed(String),
}

/// Failures raised while expanding a domain into document specifications.
#[derive(Debug, Error)]
pub enum DecomposeError {
    #[error("document '{title}' cannot be traced to any requirement of domain '{domain}'")]
    Untraceable { domain: String, title: String },
}

/// Transient failures from content or reviewer oracle calls.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle backend unavailable: {0}")]
    Unavailable(String),
    #[error("oracle call exceeded the {0} ms budget")]
    Timeout(u64),
    #[error("oracle returned malformed output: {0}")]
    Malformed(String),
}

impl OracleError {
    /// Transient failures may be retried within the caller's budget;
    /// malformed output is handled by the shape validators instead.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OracleError::Unavailable(_) | OracleError::Timeout(_))
    }
}

/// Failures raised by the Architectural Reviewer decision engine.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("reviewer verdict failed schema validation: {0}")]
    ParseFailure(String),
    #[error("'{0}' disposition carries no evidence citation")]
    Unsubstantiated(String),
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

/// Integrity violations in the Corpus Store. Never retried: they indicate
/// a logic or data problem, abort the mutation, and leave the store
/// consistent.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("corpus entry id {0} already exists")]
    DuplicateId(Uuid),
    #[error("mutation would create a dependency cycle through entry {0}")]
    Cycle(Uuid),
    #[error("retiring entry {retired} leaves dependent {dependent} without a successor")]
    DanglingDependency { retired: Uuid, dependent: Uuid },
    #[error("corpus entry {0} not found")]
    UnknownEntry(Uuid),
    #[error("corpus storage failure: {0}")]
    Storage(anyhow::Error),
}

/// Controller-visible failures from structural corpus mutations.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("merge into entry {target} failed: {reason}")]
    MergeConflict { target: Uuid, reason: String },
    #[error("split of '{spec}' leaves requirement indices {missing:?} uncovered")]
    SplitCoverage { spec: String, missing: Vec<usize> },
    #[error(transparent)]
    Corpus(#[from] CorpusError),
}
