use std::collections::BTreeSet;

use policyforge::corpus::{CorpusEntry, CorpusStore};
use policyforge::decompose::DocumentType;
use policyforge::errors::{CorpusError, ResolveError};
use policyforge::oracle::Draft;
use policyforge::resolve;

use crate::support::{draft_for, spec_named};

fn entry(title: &str, content: &str) -> CorpusEntry {
    entry_with_deps(title, content, BTreeSet::new())
}

fn entry_with_deps(title: &str, content: &str, deps: BTreeSet<uuid::Uuid>) -> CorpusEntry {
    CorpusEntry::new(
        title,
        "Operations Security",
        DocumentType::Policy,
        content,
        deps,
    )
}

#[test]
fn insert_rejects_duplicate_ids() {
    let mut store = CorpusStore::in_memory();
    let first = entry("Change Management Policy", "## Policy\nChanges are reviewed.");
    let clone = first.clone();
    store.insert(first).unwrap();
    let err = store.insert(clone).unwrap_err();
    assert!(matches!(err, CorpusError::DuplicateId(_)));
    assert_eq!(store.len(), 1);
}

#[test]
fn retired_ids_are_never_reused() {
    let mut store = CorpusStore::in_memory();
    let old = entry("Malware Protection Policy", "## Policy\nEndpoints run protection.");
    let old_id = store.insert(old.clone()).unwrap();
    let successor = entry("Endpoint Defense Policy", "## Policy\nEndpoints run protection.");
    let successor_id = store.insert(successor).unwrap();
    store.retire(&old_id, &[successor_id]).unwrap();

    let mut revived = old;
    revived.order_index = 0;
    let err = store.insert(revived).unwrap_err();
    assert!(matches!(err, CorpusError::DuplicateId(id) if id == old_id));
}

#[test]
fn insert_rejects_unknown_dependencies() {
    let mut store = CorpusStore::in_memory();
    let ghost = uuid::Uuid::new_v4();
    let err = store
        .insert(entry_with_deps(
            "Network Security Policy",
            "## Policy\nTraffic is segmented.",
            [ghost].into_iter().collect(),
        ))
        .unwrap_err();
    assert!(matches!(err, CorpusError::UnknownEntry(id) if id == ghost));
    assert!(store.is_empty());
}

#[test]
fn replace_rejects_dependency_cycles() {
    let mut store = CorpusStore::in_memory();
    let key_id = store
        .insert(entry("Key Management Policy", "## Policy\nKeys rotate yearly."))
        .unwrap();
    let enc_id = store
        .insert(entry_with_deps(
            "Encryption Policy",
            "## Policy\nSee the Key Management Policy.",
            [key_id].into_iter().collect(),
        ))
        .unwrap();

    let mut reversed = store.entry(&key_id).unwrap().clone();
    reversed.dependency_refs = [enc_id].into_iter().collect();
    let err = store.replace(reversed).unwrap_err();
    assert!(matches!(err, CorpusError::Cycle(_)));
    // Store must stay acyclic and queryable after the failed mutation.
    assert!(store.graph().is_acyclic());
    assert_eq!(store.len(), 2);
}

#[test]
fn merge_appends_section_without_new_entry() {
    let mut store = CorpusStore::in_memory();
    let target_id = store
        .insert(entry(
            "Infrastructure Security Policy",
            "## Policy\nAll hosts follow the hardening baseline, including VM hardening.",
        ))
        .unwrap();
    let before = store.len();

    store
        .merge(
            &target_id,
            "Azure VM Hardening Policy",
            "Azure virtual machines apply the CIS baseline before exposure.",
        )
        .unwrap();

    assert_eq!(store.len(), before, "merge must not change entry count");
    let target = store.entry(&target_id).unwrap();
    assert!(target.content.contains("## Azure VM Hardening Policy"));
    assert!(target.content.contains("CIS baseline"));
}

#[test]
fn retire_rewrites_dependents_onto_successors() {
    let mut store = CorpusStore::in_memory();
    let umbrella = store
        .insert(entry("Data Handling Policy", "## Policy\nData is classified."))
        .unwrap();
    let dependent = store
        .insert(entry_with_deps(
            "Records Retention Policy",
            "## Policy\nPer the Data Handling Policy, records are retained.",
            [umbrella].into_iter().collect(),
        ))
        .unwrap();
    let part_a = store
        .insert(entry("Data Classification Policy", "## Policy\nLevels are defined."))
        .unwrap();
    let part_b = store
        .insert(entry("Data Disposal Policy", "## Policy\nMedia are sanitized."))
        .unwrap();

    store.retire(&umbrella, &[part_a, part_b]).unwrap();

    let deps = store.graph().dependencies_of(&dependent);
    assert!(deps.contains(&part_a) && deps.contains(&part_b));
    assert!(!deps.contains(&umbrella));
    assert!(store.entry(&umbrella).is_none());
    assert!(store.graph().is_acyclic());
}

#[test]
fn retire_without_successor_leaves_dangling_dependency_error() {
    let mut store = CorpusStore::in_memory();
    let umbrella = store
        .insert(entry("Data Handling Policy", "## Policy\nData is classified."))
        .unwrap();
    store
        .insert(entry_with_deps(
            "Records Retention Policy",
            "## Policy\nPer the Data Handling Policy.",
            [umbrella].into_iter().collect(),
        ))
        .unwrap();

    let err = store.retire(&umbrella, &[]).unwrap_err();
    assert!(matches!(err, CorpusError::DanglingDependency { .. }));
    // Failed mutation aborts cleanly: the umbrella entry is still live.
    assert!(store.entry(&umbrella).is_some());
    assert_eq!(store.verify(), Vec::<String>::new());
}

#[test]
fn resolver_merge_against_missing_target_is_a_conflict() {
    let mut store = CorpusStore::in_memory();
    let spec = spec_named("Azure VM Hardening Policy", "Operations Security", DocumentType::Policy);
    let draft = Draft::new(spec.id, 1, draft_for(&spec));
    let ghost = uuid::Uuid::new_v4();

    let err = resolve::apply_merge(&mut store, &spec, &draft, ghost).unwrap_err();
    assert!(matches!(err, ResolveError::MergeConflict { target, .. } if target == ghost));
    assert!(store.is_empty());
}

#[test]
fn resolver_retire_moves_coverage_onto_successors() {
    let mut store = CorpusStore::in_memory();
    let umbrella = store
        .insert(entry("Data Handling Policy", "## Policy\nData is classified."))
        .unwrap();
    let dependent = store
        .insert(entry_with_deps(
            "Records Retention Policy",
            "## Policy\nSee the Data Handling Policy.",
            [umbrella].into_iter().collect(),
        ))
        .unwrap();
    let successor = store
        .insert(entry("Data Classification Policy", "## Policy\nLevels are defined."))
        .unwrap();

    resolve::apply_retire(&mut store, &umbrella, &[successor]).unwrap();
    assert!(store.entry(&umbrella).is_none());
    assert!(store.graph().dependencies_of(&dependent).contains(&successor));
}

#[test]
fn overlap_probe_finds_covering_entry_of_same_type() {
    let mut store = CorpusStore::in_memory();
    let infra = store
        .insert(entry(
            "Infrastructure Security Policy",
            "## Policy\nHost baselines cover VM hardening for every azure subscription.",
        ))
        .unwrap();
    let snapshot = store.snapshot();

    assert_eq!(
        snapshot.find_overlap("Azure VM Hardening Policy", DocumentType::Policy),
        Some(infra)
    );
    // A procedure with the same topic is not merge material for a policy.
    assert_eq!(
        snapshot.find_overlap("Azure VM Hardening Policy", DocumentType::Procedure),
        None
    );
    // Single-token titles never qualify as material overlap.
    assert_eq!(
        snapshot.find_overlap("Encryption Policy", DocumentType::Policy),
        None
    );
}
