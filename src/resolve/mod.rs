//! Merge/split resolution against the corpus store.
//!
//! A thin adapter between review dispositions and store mutations: it
//! distills the mergeable section out of a draft, re-enters split parts
//! through the decomposer, and translates store integrity failures into
//! the errors the Revision Controller reports.

use uuid::Uuid;

use crate::corpus::CorpusStore;
use crate::decompose::{specs_from_split, DocumentSpec, ProposedPart};
use crate::errors::{CorpusError, ResolveError};
use crate::oracle::Draft;
use crate::render::parse_document;

/// Applies a merge disposition: the draft's body section is appended to
/// the target entry under the draft's title. No new entry id is created
/// and the corpus entry count is unchanged.
pub fn apply_merge(
    store: &mut CorpusStore,
    spec: &DocumentSpec,
    draft: &Draft,
    target: Uuid,
) -> Result<(), ResolveError> {
    let parsed = parse_document(&draft.content);
    let body = parsed
        .section(spec.doc_type.body_section())
        .map(|section| section.body.clone())
        .unwrap_or_else(|| draft.content.trim().to_string());
    store
        .merge(&target, &spec.title, &body)
        .map_err(|err| match err {
            CorpusError::UnknownEntry(id) => ResolveError::MergeConflict {
                target: id,
                reason: "merge target is not in the corpus".into(),
            },
            other => ResolveError::Corpus(other),
        })
}

/// Builds the replacement specs for a split disposition. Coverage of the
/// parent's traced requirements is validated before anything re-enters
/// the queue.
pub fn resolve_split(
    parent: &DocumentSpec,
    parts: &[ProposedPart],
) -> Result<Vec<DocumentSpec>, ResolveError> {
    specs_from_split(parent, parts)
}

/// Retires an entry whose coverage moved into approved successors,
/// rewriting inbound dependency edges. Used when a split supersedes an
/// existing corpus entry; the call is deferred until every successor is
/// committed.
pub fn apply_retire(
    store: &mut CorpusStore,
    retired: &Uuid,
    successors: &[Uuid],
) -> Result<(), ResolveError> {
    store
        .retire(retired, successors)
        .map_err(ResolveError::from)
}
