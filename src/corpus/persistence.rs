//! Durable layout for the corpus: one JSON file per entry under
//! `entries/`, plus `index.json` describing edges, retired ids, and the
//! per-spec status ledger. Writes are atomic (temp file + rename) so an
//! interrupted run can always reopen the last committed state.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::decompose::DocumentStatus;

pub const INDEX_FILE: &str = "index.json";
pub const ENTRIES_SUBDIR: &str = "entries";
pub const EVENTS_FILE: &str = "events.jsonl";
pub const REPORT_FILE: &str = "report.json";

/// Index entry describing one persisted corpus document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub category: String,
    pub order_index: usize,
    /// Hash of the persisted entry file payload.
    pub file_hash: String,
}

/// Per-spec status record, persisted so interrupted runs resume from the
/// last committed state instead of re-drafting completed documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub spec_id: Uuid,
    pub title: String,
    pub status: DocumentStatus,
    #[serde(default)]
    pub entry_id: Option<Uuid>,
    #[serde(default)]
    pub reject_cycles: u32,
    pub updated_at: DateTime<Utc>,
}

/// The corpus index file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CorpusIndex {
    #[serde(default)]
    pub entries: Vec<IndexEntry>,
    /// (dependent, dependency) pairs.
    #[serde(default)]
    pub edges: Vec<(Uuid, Uuid)>,
    /// Ids that once existed; never reused, even after a merge or split
    /// retires the entry.
    #[serde(default)]
    pub retired: Vec<Uuid>,
    #[serde(default)]
    pub ledger: Vec<LedgerRecord>,
}

/// Derives a filesystem-safe slug from a document title.
pub fn entry_slug(title: &str) -> String {
    let mut slug = String::new();
    let mut last_dash = true;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "entry".to_string()
    } else {
        slug
    }
}

/// Allocates a slug not present in `taken`, suffixing a short random tag
/// on collision.
pub fn unique_slug(taken: &BTreeSet<String>, title: &str) -> String {
    let base = entry_slug(title);
    if !taken.contains(&base) {
        return base;
    }
    loop {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(4)
            .map(|c| (c as char).to_ascii_lowercase())
            .collect();
        let candidate = format!("{}-{}", base, suffix);
        if !taken.contains(&candidate) {
            return candidate;
        }
    }
}

/// Serializes `value` as pretty JSON and writes it atomically, returning
/// the content hash recorded in the index.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<String> {
    let payload = serde_json::to_vec_pretty(value)
        .with_context(|| format!("Failed serializing {}", path.display()))?;
    let hash = hex_hash(&payload);
    write_bytes_atomic(path, &payload)?;
    Ok(hash)
}

/// Atomic byte write: temp file in the target directory, then rename.
pub fn write_bytes_atomic(path: &Path, payload: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("No parent directory for {}", path.display()))?;
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed creating directory {}", parent.display()))?;
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    let temp = parent.join(format!(".{}.tmp-{}", file_stem(path), suffix));
    fs::write(&temp, payload)
        .with_context(|| format!("Failed writing temp file {}", temp.display()))?;
    fs::rename(&temp, path)
        .with_context(|| format!("Failed committing {}", path.display()))?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw =
        fs::read(path).with_context(|| format!("Failed reading {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("Failed parsing {}", path.display()))
}

/// Loads the index of a corpus directory, defaulting to empty for a fresh
/// directory.
pub fn load_index(dir: &Path) -> Result<CorpusIndex> {
    let path = dir.join(INDEX_FILE);
    if !path.exists() {
        return Ok(CorpusIndex::default());
    }
    read_json(&path)
}

/// Verifies that every indexed entry file exists with a matching content
/// hash, and reports stray entry files the index does not know about.
pub fn reconcile_entry_files(dir: &Path, index: &CorpusIndex) -> Result<Vec<PathBuf>> {
    let entries_dir = dir.join(ENTRIES_SUBDIR);
    for indexed in &index.entries {
        let path = entries_dir.join(format!("{}.json", indexed.slug));
        if !path.exists() {
            bail!(
                "Corpus index lists '{}' but {} is missing",
                indexed.title,
                path.display()
            );
        }
        let payload = fs::read(&path)
            .with_context(|| format!("Failed reading {}", path.display()))?;
        if hex_hash(&payload) != indexed.file_hash {
            bail!(
                "Corpus entry {} does not match its indexed hash",
                path.display()
            );
        }
    }
    let known: BTreeSet<String> = index
        .entries
        .iter()
        .map(|entry| format!("{}.json", entry.slug))
        .collect();
    let mut strays = Vec::new();
    if entries_dir.exists() {
        for item in WalkDir::new(&entries_dir).min_depth(1).max_depth(1) {
            let item = item.context("Failed walking corpus entries")?;
            let name = item.file_name().to_string_lossy().to_string();
            if item.file_type().is_file() && !known.contains(&name) && !name.starts_with('.') {
                strays.push(item.path().to_path_buf());
            }
        }
    }
    Ok(strays)
}

pub fn hex_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{:x}", digest)
}

fn file_stem(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string())
}
