//! Final run report: what was approved, what merged where, and every
//! escalation with its full feedback history.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::corpus::persistence::{write_json_atomic, REPORT_FILE};
use crate::review::ReviewResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovedDocument {
    pub entry_id: Uuid,
    pub title: String,
    pub category: String,
    pub order_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedDocument {
    pub spec_title: String,
    pub target_id: Uuid,
    pub target_title: String,
}

/// A spec that exhausted its revision budget; carries everything an
/// operator needs to pick the document up manually.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationRecord {
    pub spec_id: Uuid,
    pub title: String,
    pub category: String,
    pub reason: String,
    pub reject_cycles: u32,
    pub reviews: Vec<ReviewResult>,
}

/// A spec whose pipeline aborted on a corpus integrity failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub title: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedSpec {
    pub title: String,
    pub committed_status: String,
}

/// User-visible outcome of a complete pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub profile_digest: String,
    pub approved: Vec<ApprovedDocument>,
    pub merged: Vec<MergedDocument>,
    pub escalations: Vec<EscalationRecord>,
    pub failures: Vec<FailureRecord>,
    pub skipped: Vec<SkippedSpec>,
}

impl RunReport {
    /// One-line progress summary for chat/CLI surfaces.
    pub fn summary(&self) -> String {
        format!(
            "Run {} -> approved {}, merged {}, escalated {}, failed {}, skipped {} (profile {}).",
            self.run_id,
            self.approved.len(),
            self.merged.len(),
            self.escalations.len(),
            self.failures.len(),
            self.skipped.len(),
            &self.profile_digest[..12.min(self.profile_digest.len())]
        )
    }

    /// Writes the report artifact into the corpus directory.
    pub fn write<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let path = dir.as_ref().join(REPORT_FILE);
        write_json_atomic(&path, self)?;
        Ok(path)
    }
}
