//! Configuration primitives for policyforge runs.
//!
//! Stored in a machine-readable TOML file located at:
//!   %APPDATA%/Policyforge/config/config.toml on Windows
//!   $XDG_DATA_HOME/policyforge/config/config.toml on Linux
//!   ~/Library/Application Support/Policyforge/config/config.toml on macOS
//!
//! The config tracks the revision/oracle budgets and pipeline knobs. Every
//! field carries a serde default so partial files from older installs keep
//! loading.

use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Root configuration persisted per installation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeneratorConfig {
    /// Revision-loop budgets (reject cycles, split recursion).
    #[serde(default)]
    pub revision: RevisionSettings,
    /// Oracle call budgets (retries, timeout, reviewer re-prompts).
    #[serde(default)]
    pub oracle: OracleSettings,
    /// Pipeline worker knobs.
    #[serde(default)]
    pub pipeline: PipelineSettings,
    /// Optional override for the corpus directory; defaults to
    /// `<workspace>/corpus` when unset.
    #[serde(default)]
    pub corpus_dir: Option<PathBuf>,
}

/// Bounds applied by the Revision Controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionSettings {
    /// Reject cycles allowed before a spec terminates in escalation.
    /// The controller never approves on exhaustion.
    #[serde(default = "default_max_reject_cycles")]
    pub max_reject_cycles: u32,
    /// Maximum split recursion depth; deeper split recommendations are
    /// demoted to reject-for-revision so every spec terminates.
    #[serde(default = "default_max_split_depth")]
    pub max_split_depth: u32,
}

impl Default for RevisionSettings {
    fn default() -> Self {
        Self {
            max_reject_cycles: default_max_reject_cycles(),
            max_split_depth: default_max_split_depth(),
        }
    }
}

const fn default_max_reject_cycles() -> u32 {
    3
}

const fn default_max_split_depth() -> u32 {
    2
}

/// Budgets for content/reviewer oracle calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleSettings {
    /// Retries for transient oracle failures (unavailable, timeout)
    /// within a single drafting cycle.
    #[serde(default = "default_oracle_retry_limit")]
    pub retry_limit: u32,
    /// Wall-clock budget (ms) for one oracle call; overruns are treated
    /// as retryable timeouts.
    #[serde(default = "default_oracle_timeout_ms")]
    pub timeout_ms: u64,
    /// Re-prompts allowed when a reviewer verdict fails schema
    /// validation or lacks required evidence.
    #[serde(default = "default_review_reprompt_limit")]
    pub review_reprompt_limit: u32,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            retry_limit: default_oracle_retry_limit(),
            timeout_ms: default_oracle_timeout_ms(),
            review_reprompt_limit: default_review_reprompt_limit(),
        }
    }
}

const fn default_oracle_retry_limit() -> u32 {
    3
}

const fn default_oracle_timeout_ms() -> u64 {
    120_000
}

const fn default_review_reprompt_limit() -> u32 {
    2
}

/// Worker-pool knobs for the document pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Number of document pipelines drafted/reviewed concurrently.
    #[serde(default = "default_max_parallel_documents")]
    pub max_parallel_documents: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_parallel_documents: default_max_parallel_documents(),
        }
    }
}

const fn default_max_parallel_documents() -> u32 {
    4
}

/// Standard relative path to the config file (resolved per OS at runtime).
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Returns the root directory where policyforge stores durable state.
///
/// Order of precedence:
/// 1. `POLICYFORGE_HOME` environment variable.
/// 2. OS-specific data directory via `directories::BaseDirs`.
pub fn workspace_root() -> Result<PathBuf> {
    if let Ok(path) = env::var("POLICYFORGE_HOME") {
        return Ok(PathBuf::from(path));
    }
    let base_dirs = BaseDirs::new().context("Unable to determine OS data directory")?;
    Ok(base_dirs.data_dir().join("Policyforge"))
}

/// Returns the config directory under the workspace root.
pub fn config_dir() -> Result<PathBuf> {
    Ok(workspace_root()?.join("config"))
}

/// Path to the config file.
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Default corpus directory when the config does not override it.
pub fn default_corpus_dir() -> Result<PathBuf> {
    Ok(workspace_root()?.join("corpus"))
}

impl GeneratorConfig {
    /// Loads the config file, falling back to defaults when absent.
    pub fn load() -> Result<Self> {
        let path = config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed reading config {}", path.display()))?;
        let config = toml::from_str(&raw)
            .with_context(|| format!("Failed parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Persists the config, creating the config directory when needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = config_file_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed creating config directory {}", parent.display()))?;
        }
        let raw = toml::to_string_pretty(self).context("Failed serializing config")?;
        fs::write(&path, raw)
            .with_context(|| format!("Failed writing config {}", path.display()))?;
        Ok(path)
    }

    /// Resolved corpus directory for this run.
    pub fn corpus_dir(&self) -> Result<PathBuf> {
        match &self.corpus_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_corpus_dir(),
        }
    }
}
