//! JSONL event log for pipeline runs.
//!
//! Every state advance (queueing, drafting, review dispositions, corpus
//! mutations, escalations) appends one line, making a run replayable and
//! auditable after the fact. Workers share the log, so appends are
//! serialized internally.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::corpus::persistence::EVENTS_FILE;

/// Type of run events that can be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEventType {
    RunStarted,
    DomainSelected,
    SpecQueued,
    SpecSkipped,
    DraftRequested,
    DraftProduced,
    ReviewCompleted,
    CorpusInserted,
    CorpusMerged,
    CorpusRetired,
    SpecSplit,
    SpecEscalated,
    SpecFailed,
    RunCompleted,
}

/// General-purpose run event stored as JSONL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub event_id: Uuid,
    pub run_id: Uuid,
    pub event_type: RunEventType,
    pub timestamp: DateTime<Utc>,
    pub details: serde_json::Value,
}

/// Append-only event log rooted in the corpus directory.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    write_guard: Mutex<()>,
}

impl RunLog {
    pub fn for_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            path: dir.as_ref().join(EVENTS_FILE),
            write_guard: Mutex::new(()),
        }
    }

    pub fn append(
        &self,
        run_id: Uuid,
        event_type: RunEventType,
        details: serde_json::Value,
    ) -> Result<Uuid> {
        let event = RunEvent {
            event_id: Uuid::new_v4(),
            run_id,
            event_type,
            timestamp: Utc::now(),
            details,
        };
        let _guard = self
            .write_guard
            .lock()
            .map_err(|_| anyhow::anyhow!("run log lock poisoned"))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed opening run log {}", self.path.display()))?;
        file.write_all(serde_json::to_string(&event)?.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(event.event_id)
    }

    /// Reads back every event, oldest first.
    pub fn load_events(&self) -> Result<Vec<RunEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed reading run log {}", self.path.display()))?;
        let mut events = Vec::new();
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(line).context("Malformed run log line")?);
        }
        Ok(events)
    }
}
