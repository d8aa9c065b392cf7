//! The authoritative, mutable set of approved documents plus their
//! dependency graph.
//!
//! All mutations go through `&mut self` (the pipeline wraps the store in
//! a single-writer lock); each mutation validates integrity, commits to
//! disk atomically, and leaves the store consistent on failure. Reads run
//! against cheap immutable snapshots.

pub mod graph;
pub mod persistence;

pub use graph::DependencyGraph;
pub use persistence::{CorpusIndex, IndexEntry, LedgerRecord};

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decompose::{DocumentSpec, DocumentStatus, DocumentType};
use crate::errors::CorpusError;

use persistence::{
    entry_slug, load_index, read_json, unique_slug, write_json_atomic, ENTRIES_SUBDIR,
};

/// Words too generic to signal topical overlap between documents.
const OVERLAP_STOPWORDS: [&str; 12] = [
    "policy",
    "procedure",
    "security",
    "management",
    "plan",
    "the",
    "and",
    "for",
    "of",
    "a",
    "an",
    "to",
];

/// Minimum share of a draft's significant title tokens that must land in
/// one existing entry before the overlap is material.
const OVERLAP_RATIO: f64 = 0.6;

/// The durable, queryable output unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub doc_type: DocumentType,
    /// Position in the publishing order; assigned at insert.
    #[serde(default)]
    pub order_index: usize,
    pub content: String,
    /// Ids of entries this document depends on.
    #[serde(default)]
    pub dependency_refs: BTreeSet<Uuid>,
    /// Hash of `content`, tying the entry back to its approved draft.
    pub content_hash: String,
    pub approved_at: DateTime<Utc>,
}

impl CorpusEntry {
    pub fn new(
        title: impl Into<String>,
        category: impl Into<String>,
        doc_type: DocumentType,
        content: impl Into<String>,
        dependency_refs: BTreeSet<Uuid>,
    ) -> Self {
        let content = content.into();
        let content_hash = persistence::hex_hash(content.as_bytes());
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            category: category.into(),
            doc_type,
            order_index: 0,
            content,
            dependency_refs,
            content_hash,
            approved_at: Utc::now(),
        }
    }
}

/// Read-only view of one entry inside a snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub doc_type: DocumentType,
    pub order_index: usize,
    pub content: String,
}

/// Consistent read view the Reviewer works against. Cloned out of the
/// store under the read lock; never blocks writers afterwards.
#[derive(Debug, Clone, Default)]
pub struct CorpusSnapshot {
    pub entries: Vec<SnapshotEntry>,
    pub edges: Vec<(Uuid, Uuid)>,
}

impl CorpusSnapshot {
    pub fn entry(&self, id: &Uuid) -> Option<&SnapshotEntry> {
        self.entries.iter().find(|entry| entry.id == *id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.entry(id).is_some()
    }

    /// Answers "does an entry covering this topic already exist".
    ///
    /// Material overlap: at least two significant title tokens appearing
    /// in a single existing entry of the same document type (its title or
    /// body prose, headings excluded), covering at least `OVERLAP_RATIO`
    /// of the draft's significant tokens. Entries are probed in
    /// publishing order, so the earliest covering document wins
    /// deterministically.
    pub fn find_overlap(&self, title: &str, doc_type: DocumentType) -> Option<Uuid> {
        let tokens = significant_tokens(title);
        if tokens.len() < 2 {
            return None;
        }
        let mut ordered: Vec<&SnapshotEntry> = self.entries.iter().collect();
        ordered.sort_by_key(|entry| entry.order_index);
        for entry in ordered {
            if entry.doc_type != doc_type {
                continue;
            }
            let haystack = format!("{}\n{}", entry.title, prose_of(&entry.content)).to_lowercase();
            let hits = tokens
                .iter()
                .filter(|token| haystack.contains(token.as_str()))
                .count();
            if hits >= 2 && hits as f64 / tokens.len() as f64 >= OVERLAP_RATIO {
                return Some(entry.id);
            }
        }
        None
    }

    /// Dependency ids implied by a draft body: any existing entry whose
    /// title the draft references becomes a dependency of the new entry.
    pub fn referenced_entries(&self, content: &str) -> BTreeSet<Uuid> {
        let haystack = content.to_lowercase();
        self.entries
            .iter()
            .filter(|entry| haystack.contains(&entry.title.to_lowercase()))
            .map(|entry| entry.id)
            .collect()
    }

    /// Compact context object serialized into oracle calls.
    pub fn context(&self) -> CorpusContext {
        let mut entries: Vec<ContextEntry> = self
            .entries
            .iter()
            .map(|entry| ContextEntry {
                id: entry.id,
                title: entry.title.clone(),
                category: entry.category.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.title.cmp(&b.title));
        CorpusContext { entries }
    }
}

/// What the oracles are told about the existing corpus.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusContext {
    pub entries: Vec<ContextEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEntry {
    pub id: Uuid,
    pub title: String,
    pub category: String,
}

/// The corpus store. Mutations are serialized by the owning lock; every
/// committed mutation is durable before the method returns.
#[derive(Debug)]
pub struct CorpusStore {
    dir: Option<PathBuf>,
    entries: BTreeMap<Uuid, CorpusEntry>,
    slugs: BTreeMap<Uuid, String>,
    graph: DependencyGraph,
    retired: BTreeSet<Uuid>,
    ledger: BTreeMap<Uuid, LedgerRecord>,
    next_order: usize,
}

impl CorpusStore {
    /// Volatile store for tests and dry runs.
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            entries: BTreeMap::new(),
            slugs: BTreeMap::new(),
            graph: DependencyGraph::new(),
            retired: BTreeSet::new(),
            ledger: BTreeMap::new(),
            next_order: 0,
        }
    }

    /// Creates or reopens a durable corpus rooted at `dir`.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(dir.join(ENTRIES_SUBDIR))
            .with_context(|| format!("Failed creating corpus directory {}", dir.display()))?;
        let index = load_index(&dir)?;
        persistence::reconcile_entry_files(&dir, &index)?;

        let mut store = Self {
            dir: Some(dir.clone()),
            entries: BTreeMap::new(),
            slugs: BTreeMap::new(),
            graph: DependencyGraph::new(),
            retired: index.retired.iter().copied().collect(),
            ledger: index
                .ledger
                .iter()
                .map(|record| (record.spec_id, record.clone()))
                .collect(),
            next_order: 0,
        };
        for indexed in &index.entries {
            let path = dir
                .join(ENTRIES_SUBDIR)
                .join(format!("{}.json", indexed.slug));
            let entry: CorpusEntry = read_json(&path)?;
            store.graph.add_node(entry.id);
            store.next_order = store.next_order.max(entry.order_index + 1);
            store.slugs.insert(entry.id, indexed.slug.clone());
            store.entries.insert(entry.id, entry);
        }
        for (dependent, dependency) in &index.edges {
            let mut deps = store.graph.dependencies_of(dependent);
            deps.insert(*dependency);
            store
                .graph
                .set_dependencies(*dependent, deps)
                .map_err(|err| anyhow::anyhow!("Corrupt corpus index: {err}"))?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, id: &Uuid) -> Option<&CorpusEntry> {
        self.entries.get(id)
    }

    /// Entries in publishing order.
    pub fn entries_ordered(&self) -> Vec<&CorpusEntry> {
        let mut entries: Vec<&CorpusEntry> = self.entries.values().collect();
        entries.sort_by_key(|entry| entry.order_index);
        entries
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Inserts a new entry, assigning its publishing order. Fails on id
    /// reuse (including retired ids), unknown dependencies, or a cycle;
    /// on failure the store is unchanged.
    pub fn insert(&mut self, mut entry: CorpusEntry) -> Result<Uuid, CorpusError> {
        if self.entries.contains_key(&entry.id) || self.retired.contains(&entry.id) {
            return Err(CorpusError::DuplicateId(entry.id));
        }
        for dependency in &entry.dependency_refs {
            if !self.entries.contains_key(dependency) {
                return Err(CorpusError::UnknownEntry(*dependency));
            }
        }
        self.graph.add_node(entry.id);
        if let Err(err) = self
            .graph
            .set_dependencies(entry.id, entry.dependency_refs.clone())
        {
            self.graph.remove_node(&entry.id);
            return Err(err);
        }
        entry.order_index = self.next_order;
        self.next_order += 1;

        let taken: BTreeSet<String> = self.slugs.values().cloned().collect();
        let slug = unique_slug(&taken, &entry.title);
        let id = entry.id;
        self.slugs.insert(id, slug);
        self.entries.insert(id, entry);
        self.commit_entry(&id)?;
        Ok(id)
    }

    /// Replaces the content and dependencies of an existing entry while
    /// keeping its id and publishing order (re-approval after resume).
    pub fn replace(&mut self, entry: CorpusEntry) -> Result<(), CorpusError> {
        let existing = self
            .entries
            .get(&entry.id)
            .ok_or(CorpusError::UnknownEntry(entry.id))?;
        let order_index = existing.order_index;
        for dependency in &entry.dependency_refs {
            if !self.entries.contains_key(dependency) {
                return Err(CorpusError::UnknownEntry(*dependency));
            }
        }
        self.graph
            .set_dependencies(entry.id, entry.dependency_refs.clone())?;
        let id = entry.id;
        let mut entry = entry;
        entry.order_index = order_index;
        self.entries.insert(id, entry);
        self.commit_entry(&id)?;
        Ok(())
    }

    /// Appends a new section to an existing entry. Never creates a new
    /// id; the total entry count is unchanged.
    pub fn merge(
        &mut self,
        target_id: &Uuid,
        section_title: &str,
        section_body: &str,
    ) -> Result<(), CorpusError> {
        let entry = self
            .entries
            .get_mut(target_id)
            .ok_or(CorpusError::UnknownEntry(*target_id))?;
        entry.content = format!(
            "{}\n\n## {}\n{}",
            entry.content.trim_end(),
            section_title,
            section_body.trim()
        );
        entry.content_hash = persistence::hex_hash(entry.content.as_bytes());
        self.commit_entry(target_id)?;
        Ok(())
    }

    /// Removes an entry whose coverage moved into `successors`, rewriting
    /// dependency edges onto the successors. The id is never reused.
    pub fn retire(&mut self, entry_id: &Uuid, successors: &[Uuid]) -> Result<(), CorpusError> {
        if !self.entries.contains_key(entry_id) {
            return Err(CorpusError::UnknownEntry(*entry_id));
        }
        for successor in successors {
            if !self.entries.contains_key(successor) {
                return Err(CorpusError::UnknownEntry(*successor));
            }
        }
        self.graph.rewrite_edges(entry_id, successors)?;
        self.entries.remove(entry_id);
        self.retired.insert(*entry_id);
        if let (Some(dir), Some(slug)) = (self.dir.clone(), self.slugs.remove(entry_id)) {
            let path = dir.join(ENTRIES_SUBDIR).join(format!("{}.json", slug));
            if path.exists() {
                fs::remove_file(&path)
                    .map_err(|err| CorpusError::Storage(anyhow::Error::new(err)))?;
            }
        }
        self.commit_index()?;
        Ok(())
    }

    /// Records the status of a document spec in the durable ledger.
    pub fn record_spec_status(
        &mut self,
        spec: &DocumentSpec,
        entry_id: Option<Uuid>,
        reject_cycles: u32,
    ) -> Result<(), CorpusError> {
        self.ledger.insert(
            spec.id,
            LedgerRecord {
                spec_id: spec.id,
                title: spec.title.clone(),
                status: spec.status,
                entry_id,
                reject_cycles,
                updated_at: Utc::now(),
            },
        );
        self.commit_index()
    }

    pub fn ledger_records(&self) -> Vec<&LedgerRecord> {
        self.ledger.values().collect()
    }

    /// Finds the committed status for a spec title from an earlier run.
    /// Spec ids are freshly generated each run, so resume matches on the
    /// deterministic title/category identity instead.
    pub fn committed_status(&self, title: &str) -> Option<&LedgerRecord> {
        self.ledger
            .values()
            .filter(|record| record.title == title)
            .max_by_key(|record| record.updated_at)
    }

    pub fn snapshot(&self) -> CorpusSnapshot {
        CorpusSnapshot {
            entries: self
                .entries
                .values()
                .map(|entry| SnapshotEntry {
                    id: entry.id,
                    title: entry.title.clone(),
                    category: entry.category.clone(),
                    doc_type: entry.doc_type,
                    order_index: entry.order_index,
                    content: entry.content.clone(),
                })
                .collect(),
            edges: self.graph.edge_list(),
        }
    }

    /// Integrity scan used by the verifier binary and by tests: returns
    /// human-readable problems, empty when the store is sound.
    pub fn verify(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if let Some(node) = self.graph.find_cycle() {
            problems.push(format!("dependency graph has a cycle through {}", node));
        }
        for (dependent, dependency) in self.graph.edge_list() {
            if !self.entries.contains_key(&dependency) {
                problems.push(format!(
                    "entry {} depends on missing entry {}",
                    dependent, dependency
                ));
            }
        }
        for entry in self.entries.values() {
            if persistence::hex_hash(entry.content.as_bytes()) != entry.content_hash {
                problems.push(format!("entry '{}' content hash mismatch", entry.title));
            }
        }
        for record in self.ledger.values() {
            if matches!(record.status, DocumentStatus::Approved) {
                let live = record
                    .entry_id
                    .map(|id| self.entries.contains_key(&id) || self.retired.contains(&id))
                    .unwrap_or(false);
                if !live {
                    problems.push(format!(
                        "approved spec '{}' has no corpus entry",
                        record.title
                    ));
                }
            }
        }
        problems
    }

    fn rebuild_index(&self) -> CorpusIndex {
        let mut entries: Vec<IndexEntry> = Vec::new();
        for entry in self.entries_ordered() {
            let slug = self
                .slugs
                .get(&entry.id)
                .cloned()
                .unwrap_or_else(|| entry_slug(&entry.title));
            let payload = serde_json::to_vec_pretty(entry).unwrap_or_default();
            entries.push(IndexEntry {
                id: entry.id,
                slug,
                title: entry.title.clone(),
                category: entry.category.clone(),
                order_index: entry.order_index,
                file_hash: persistence::hex_hash(&payload),
            });
        }
        CorpusIndex {
            entries,
            edges: self.graph.edge_list(),
            retired: self.retired.iter().copied().collect(),
            ledger: self.ledger.values().cloned().collect(),
        }
    }

    fn commit_entry(&mut self, id: &Uuid) -> Result<(), CorpusError> {
        let Some(dir) = self.dir.clone() else {
            return Ok(());
        };
        let entry = self
            .entries
            .get(id)
            .ok_or(CorpusError::UnknownEntry(*id))?;
        let slug = self
            .slugs
            .get(id)
            .cloned()
            .unwrap_or_else(|| entry_slug(&entry.title));
        let path = dir.join(ENTRIES_SUBDIR).join(format!("{}.json", slug));
        write_json_atomic(&path, entry).map_err(CorpusError::Storage)?;
        self.commit_index()
    }

    fn commit_index(&self) -> Result<(), CorpusError> {
        let Some(dir) = self.dir.clone() else {
            return Ok(());
        };
        let index = self.rebuild_index();
        write_json_atomic(&dir.join(persistence::INDEX_FILE), &index)
            .map(|_| ())
            .map_err(CorpusError::Storage)
    }
}

/// Body lines only; section headings are template boilerplate shared by
/// every document and would make any two entries look related.
fn prose_of(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
}

fn significant_tokens(title: &str) -> Vec<String> {
    title
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| token.len() >= 2 && !OVERLAP_STOPWORDS.contains(token))
        .map(str::to_string)
        .collect()
}
