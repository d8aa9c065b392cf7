//! The five review gates and their score bookkeeping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Independent criteria a draft must satisfy for approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    TemplateAdherence,
    StyleAndAuditability,
    CorpusConsistency,
    ScopeAndArchitecture,
    FrameworkCompleteness,
}

pub const ALL_GATES: [Gate; 5] = [
    Gate::TemplateAdherence,
    Gate::StyleAndAuditability,
    Gate::CorpusConsistency,
    Gate::ScopeAndArchitecture,
    Gate::FrameworkCompleteness,
];

/// Highest score a gate can earn; approval requires it on every gate.
pub const MAX_GATE_SCORE: u8 = 3;

/// Total at or below which a draft is rejected outright.
pub const REJECT_TOTAL: u8 = 12;

/// Scores for all five gates, each 0..=3.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GateScores(BTreeMap<Gate, u8>);

impl GateScores {
    /// Validates a raw score map from the reviewer oracle: every gate
    /// present, every score within range.
    pub fn from_raw(raw: &BTreeMap<Gate, u8>) -> Result<Self, String> {
        let mut scores = BTreeMap::new();
        for gate in ALL_GATES {
            let score = raw
                .get(&gate)
                .ok_or_else(|| format!("missing score for gate {:?}", gate))?;
            if *score > MAX_GATE_SCORE {
                return Err(format!("gate {:?} score {} out of range", gate, score));
            }
            scores.insert(gate, *score);
        }
        Ok(Self(scores))
    }

    pub fn get(&self, gate: Gate) -> u8 {
        self.0.get(&gate).copied().unwrap_or(0)
    }

    /// Lowers a gate to `ceiling` if it currently scores higher.
    pub fn clamp(&mut self, gate: Gate, ceiling: u8) {
        let entry = self.0.entry(gate).or_insert(0);
        if *entry > ceiling {
            *entry = ceiling;
        }
    }

    pub fn total(&self) -> u8 {
        self.0.values().sum()
    }

    pub fn all_perfect(&self) -> bool {
        ALL_GATES
            .iter()
            .all(|gate| self.get(*gate) == MAX_GATE_SCORE)
    }

    pub fn any_at_most(&self, threshold: u8) -> bool {
        ALL_GATES.iter().any(|gate| self.get(*gate) <= threshold)
    }
}
