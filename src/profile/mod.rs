//! Requirements profile produced by the upstream interview subsystem.
//!
//! The profile is an immutable nested fact tree; the generation core only
//! reads it. Required top-level sections are validated once at
//! construction so every later component can assume a complete profile.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::errors::ProfileError;

/// Top-level sections the interview subsystem must always produce.
pub const REQUIRED_SECTIONS: [&str; 5] = [
    "organization",
    "data_governance",
    "technology",
    "workforce",
    "policy_scope",
];

/// Immutable organizational fact tree.
#[derive(Debug, Clone)]
pub struct RequirementsProfile {
    facts: Value,
    digest: String,
}

impl RequirementsProfile {
    /// Validates and wraps an interview result document.
    pub fn from_value(facts: Value) -> Result<Self, ProfileError> {
        let object = facts
            .as_object()
            .ok_or_else(|| ProfileError::Malformed(facts.to_string()))?;
        for section in REQUIRED_SECTIONS {
            if !object.contains_key(section) {
                return Err(ProfileError::Incomplete(section.to_string()));
            }
        }
        let digest = hex_digest(&facts);
        Ok(Self { facts, digest })
    }

    /// Parses a profile from the interview subsystem's JSON output.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw).context("Interview result is not JSON")?;
        Ok(Self::from_value(value)?)
    }

    /// Loads a profile file written by the interview subsystem.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed reading interview result {}", path.display()))?;
        Self::from_json_str(&raw)
    }

    /// Looks up a fact by dotted path, e.g. `organization.industry`.
    pub fn fact(&self, path: &str) -> Option<&Value> {
        let mut current = &self.facts;
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        Some(current)
    }

    /// String fact lookup; returns `None` for non-string values.
    pub fn fact_str(&self, path: &str) -> Option<&str> {
        self.fact(path).and_then(Value::as_str)
    }

    /// Boolean fact lookup; absent facts read as `false`.
    pub fn fact_bool(&self, path: &str) -> bool {
        self.fact(path).and_then(Value::as_bool).unwrap_or(false)
    }

    /// List-of-strings fact lookup; absent or non-list facts read empty.
    pub fn fact_list(&self, path: &str) -> Vec<String> {
        self.fact(path)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Case-insensitive substring scan across every string fact. Selector
    /// rules use this for free-text answers the interview did not
    /// normalize into dedicated fields.
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        value_mentions(&self.facts, &needle)
    }

    /// Stable content hash of the fact tree; recorded in run artifacts so
    /// a corpus can be tied back to the exact profile that produced it.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Raw fact tree, for serializing into oracle context objects.
    pub fn as_value(&self) -> &Value {
        &self.facts
    }
}

fn value_mentions(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(s) => s.to_lowercase().contains(needle),
        Value::Array(items) => items.iter().any(|item| value_mentions(item, needle)),
        Value::Object(map) => map.values().any(|item| value_mentions(item, needle)),
        _ => false,
    }
}

fn hex_digest(value: &Value) -> String {
    let payload = serde_json::to_vec(value).unwrap_or_default();
    let digest = Sha256::digest(&payload);
    format!("{:x}", digest)
}
