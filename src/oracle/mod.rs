//! Contracts for the external content-generation backends.
//!
//! Both oracles are opaque request/response collaborators: callers hand
//! over an explicit, immutable context object and receive raw text. No
//! conversational state lives behind the trait — every invocation is
//! replayable from its request alone. Backends are slow, blocking, and
//! fallible; `OracleCaller` applies the wall-clock budget and bounded
//! retry the pipeline requires.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::OracleSettings;
use crate::corpus::CorpusContext;
use crate::decompose::DocumentSpec;
use crate::errors::OracleError;
use crate::profile::RequirementsProfile;
use crate::render::{DocumentTemplate, StyleLexicon};
use crate::review::FeedbackItem;

/// One produced draft version. Ephemeral: superseded by the next version
/// or discarded once the owning spec reaches a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub spec_id: Uuid,
    /// Monotonic, starting at 1.
    pub version: u32,
    pub content: String,
    pub content_hash: String,
    pub produced_at: DateTime<Utc>,
}

impl Draft {
    pub fn new(spec_id: Uuid, version: u32, content: String) -> Self {
        let content_hash = content_hash(&content);
        Self {
            spec_id,
            version,
            content,
            content_hash,
            produced_at: Utc::now(),
        }
    }
}

/// Context object handed to the content oracle for one drafting call.
pub struct GenerationRequest<'a> {
    pub spec: &'a DocumentSpec,
    pub profile: &'a RequirementsProfile,
    pub context: &'a CorpusContext,
    /// Accumulated reviewer feedback from earlier versions, oldest first.
    pub prior_feedback: &'a [FeedbackItem],
    pub template: &'a DocumentTemplate,
}

/// Context object handed to the reviewer oracle for one judgment call.
pub struct ReviewRequest<'a> {
    pub draft: &'a Draft,
    pub spec: &'a DocumentSpec,
    pub profile: &'a RequirementsProfile,
    pub context: &'a CorpusContext,
    pub template: &'a DocumentTemplate,
    pub style_guide: &'a StyleLexicon,
    /// Zero on the first attempt; increments per re-prompt after a
    /// schema or evidence failure.
    pub reprompt: u32,
}

/// External capability that drafts document content.
pub trait ContentOracle: Send + Sync {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, OracleError>;
}

/// External capability that returns a structured review verdict as JSON.
pub trait ReviewerOracle: Send + Sync {
    fn review(&self, request: &ReviewRequest<'_>) -> Result<String, OracleError>;
}

/// Unwraps a JSON payload that may arrive fenced in a markdown code
/// block, then parses it. Backends routinely wrap structured replies in
/// json fences despite instructions.
pub fn extract_json_payload(raw: &str) -> Result<Value, OracleError> {
    let trimmed = raw.trim();
    let candidate = if trimmed.starts_with("```") {
        let start = trimmed.find('{');
        let end = trimmed.rfind('}');
        match (start, end) {
            (Some(start), Some(end)) if start < end => &trimmed[start..=end],
            _ => trimmed,
        }
    } else {
        trimmed
    };
    serde_json::from_str(candidate).map_err(|err| OracleError::Malformed(err.to_string()))
}

/// Applies the oracle call budget: wall-clock timeout plus bounded retry
/// of transient failures. The backend call is blocking, so the timeout is
/// enforced by measuring elapsed time and converting overruns into
/// retryable timeouts.
pub struct OracleCaller {
    retry_limit: u32,
    timeout_ms: u64,
}

impl OracleCaller {
    pub fn new(settings: &OracleSettings) -> Self {
        Self {
            retry_limit: settings.retry_limit,
            timeout_ms: settings.timeout_ms,
        }
    }

    /// Invokes `call` until it succeeds within budget, a non-retryable
    /// error occurs, or the retry limit is exhausted.
    pub fn invoke<F>(&self, call: F) -> Result<String, OracleError>
    where
        F: Fn() -> Result<String, OracleError>,
    {
        let mut last_error = OracleError::Unavailable("oracle was never invoked".into());
        for _attempt in 0..=self.retry_limit {
            let started = Instant::now();
            match call() {
                Ok(output) => {
                    if started.elapsed().as_millis() as u64 > self.timeout_ms {
                        last_error = OracleError::Timeout(self.timeout_ms);
                        continue;
                    }
                    return Ok(output);
                }
                Err(err) if err.is_retryable() => {
                    last_error = err;
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_error)
    }
}

pub(crate) fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    format!("{:x}", digest)
}
