//! The architectural review decision engine.
//!
//! Sub-judgments (gate scoring, overlap rationale, split proposals) come
//! from the reviewer oracle, but the disposition itself is computed here
//! under a fixed contract: approval only on a perfect gate slate, merge
//! whenever material overlap exists, rejection as the conservative
//! default. Deterministic lints clamp the template and style gates so an
//! over-generous oracle cannot pass an untestable or malformed draft, and
//! every non-approval must be substantiated with evidence.

mod gates;

pub use gates::{Gate, GateScores, ALL_GATES, MAX_GATE_SCORE, REJECT_TOTAL};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::OracleSettings;
use crate::corpus::CorpusSnapshot;
use crate::decompose::{specs_from_split, DocumentSpec, ProposedPart};
use crate::errors::ReviewError;
use crate::oracle::{extract_json_payload, Draft, OracleCaller, ReviewRequest, ReviewerOracle};
use crate::profile::RequirementsProfile;
use crate::render::{missing_sections, DocumentTemplate, StyleLexicon};

/// A citation substantiating a review judgment, pointing into the corpus
/// or the compliance framework set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceCitation {
    /// Where the evidence lives: an entry title, framework name, or one
    /// of the built-in lint sources (`document_template`, `style_guide`).
    pub source: String,
    pub reference: String,
    #[serde(default)]
    pub detail: Option<String>,
}

/// One actionable reviewer remark tied to a draft section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackItem {
    pub section: String,
    pub issue: String,
    pub suggestion: String,
}

/// Terminal judgment of a review pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Disposition {
    Approve,
    RejectForRevision,
    RecommendMerge { target: Uuid },
    RecommendSplit { parts: Vec<ProposedPart> },
}

impl Disposition {
    pub fn label(&self) -> &'static str {
        match self {
            Disposition::Approve => "approve",
            Disposition::RejectForRevision => "reject_for_revision",
            Disposition::RecommendMerge { .. } => "recommend_merge",
            Disposition::RecommendSplit { .. } => "recommend_split",
        }
    }
}

/// The validated outcome of reviewing one draft version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResult {
    pub spec_id: Uuid,
    pub draft_version: u32,
    pub disposition: Disposition,
    pub gate_scores: GateScores,
    pub evidence: Vec<EvidenceCitation>,
    pub feedback: Vec<FeedbackItem>,
}

/// Overlap flag the oracle may raise against an existing entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlapFlag {
    pub target_id: Uuid,
    pub rationale: String,
}

/// Schema of the reviewer oracle's structured reply.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewerVerdict {
    pub gate_scores: BTreeMap<Gate, u8>,
    #[serde(default)]
    pub evidence: Vec<EvidenceCitation>,
    #[serde(default)]
    pub feedback: Vec<FeedbackItem>,
    #[serde(default)]
    pub overlap: Option<OverlapFlag>,
    #[serde(default)]
    pub split: Option<Vec<ProposedPart>>,
}

/// Parses and schema-validates a raw reviewer reply.
pub fn parse_verdict(raw: &str) -> Result<ReviewerVerdict, ReviewError> {
    let value =
        extract_json_payload(raw).map_err(|err| ReviewError::ParseFailure(err.to_string()))?;
    let verdict: ReviewerVerdict = serde_json::from_value(value)
        .map_err(|err| ReviewError::ParseFailure(err.to_string()))?;
    GateScores::from_raw(&verdict.gate_scores).map_err(ReviewError::ParseFailure)?;
    Ok(verdict)
}

/// The decision engine. Holds the shape contract and style lexicon the
/// deterministic lints run against.
pub struct ReviewEngine {
    template: DocumentTemplate,
    lexicon: StyleLexicon,
    reprompt_limit: u32,
}

impl ReviewEngine {
    pub fn new(settings: &OracleSettings) -> Self {
        Self {
            template: DocumentTemplate::builtin(),
            lexicon: StyleLexicon::builtin(),
            reprompt_limit: settings.review_reprompt_limit,
        }
    }

    pub fn template(&self) -> &DocumentTemplate {
        &self.template
    }

    pub fn style_guide(&self) -> &StyleLexicon {
        &self.lexicon
    }

    /// Runs one full review pass: oracle call, schema validation with
    /// bounded re-prompts, deterministic adjudication. A verdict that
    /// still fails after the re-prompt budget surfaces the last error.
    pub fn review(
        &self,
        oracle: &dyn ReviewerOracle,
        caller: &OracleCaller,
        spec: &DocumentSpec,
        draft: &Draft,
        profile: &RequirementsProfile,
        snapshot: &CorpusSnapshot,
    ) -> Result<ReviewResult, ReviewError> {
        let context = snapshot.context();
        let mut last_error = ReviewError::ParseFailure("reviewer was never invoked".into());
        for reprompt in 0..=self.reprompt_limit {
            let request = ReviewRequest {
                draft,
                spec,
                profile,
                context: &context,
                template: &self.template,
                style_guide: &self.lexicon,
                reprompt,
            };
            let raw = caller.invoke(|| oracle.review(&request))?;
            let verdict = match parse_verdict(&raw) {
                Ok(verdict) => verdict,
                Err(err) => {
                    last_error = err;
                    continue;
                }
            };
            match self.adjudicate(spec, draft, snapshot, verdict) {
                Ok(result) => return Ok(result),
                Err(err @ ReviewError::Unsubstantiated(_)) => {
                    last_error = err;
                    continue;
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_error)
    }

    /// Applies the code-level gating contract to a validated verdict.
    pub fn adjudicate(
        &self,
        spec: &DocumentSpec,
        draft: &Draft,
        snapshot: &CorpusSnapshot,
        verdict: ReviewerVerdict,
    ) -> Result<ReviewResult, ReviewError> {
        let mut scores =
            GateScores::from_raw(&verdict.gate_scores).map_err(ReviewError::ParseFailure)?;
        let mut evidence = verdict.evidence;
        let mut feedback = verdict.feedback;

        // Template lint: the shape contract is not negotiable.
        let missing = missing_sections(&draft.content, spec.doc_type, &self.template);
        if !missing.is_empty() {
            let required = self.template.required_for(spec.doc_type).len();
            let present = required.saturating_sub(missing.len());
            let ceiling = if present * 2 < required { 0 } else { 1 };
            scores.clamp(Gate::TemplateAdherence, ceiling);
            feedback.push(FeedbackItem {
                section: missing.join(", "),
                issue: format!("Required sections missing: {}", missing.join(", ")),
                suggestion: "Add every mandated section in template order.".into(),
            });
            evidence.push(EvidenceCitation {
                source: "document_template".into(),
                reference: missing.join(", "),
                detail: None,
            });
        }

        // Auditability lint: vague control language cannot pass review.
        for phrase in self.vague_phrases(&draft.content) {
            scores.clamp(Gate::StyleAndAuditability, 1);
            feedback.push(FeedbackItem {
                section: spec.doc_type.body_section().into(),
                issue: format!("Control statement relies on the untestable phrase '{}'", phrase),
                suggestion: "Restate the control with a measurable, binding requirement.".into(),
            });
            evidence.push(EvidenceCitation {
                source: "style_guide".into(),
                reference: phrase,
                detail: None,
            });
        }

        // Corpus-consistency analysis: the deterministic probe decides,
        // with the oracle's flag accepted when it names a live entry.
        let overlap_target = snapshot.find_overlap(&spec.title, spec.doc_type).or_else(|| {
            verdict
                .overlap
                .as_ref()
                .map(|flag| flag.target_id)
                .filter(|target| snapshot.contains(target))
        });
        if let Some(target) = overlap_target {
            let title = snapshot
                .entry(&target)
                .map(|entry| entry.title.clone())
                .unwrap_or_else(|| target.to_string());
            evidence.push(EvidenceCitation {
                source: "corpus".into(),
                reference: title.clone(),
                detail: Some(format!(
                    "'{}' already covers this ground; fold the draft in as a section.",
                    title
                )),
            });
            let result = ReviewResult {
                spec_id: spec.id,
                draft_version: draft.version,
                disposition: Disposition::RecommendMerge { target },
                gate_scores: scores,
                evidence,
                feedback,
            };
            return Ok(result);
        }

        if scores.all_perfect() {
            return Ok(ReviewResult {
                spec_id: spec.id,
                draft_version: draft.version,
                disposition: Disposition::Approve,
                gate_scores: scores,
                evidence,
                feedback,
            });
        }

        // Hard rejection band: a floor-level gate or a failing total means
        // the content itself must be revised before any structural move.
        let hard_reject = scores.any_at_most(1) || scores.total() <= REJECT_TOTAL;

        // Split is a specialization of reject: honored outside the hard
        // band, and only when the proposal covers every requirement the
        // parent traced to.
        let disposition = match verdict.split {
            Some(parts) if !hard_reject && specs_from_split(spec, &parts).is_ok() => {
                Disposition::RecommendSplit { parts }
            }
            Some(_) if !hard_reject => {
                feedback.push(FeedbackItem {
                    section: "Scope".into(),
                    issue: "Proposed split drops requirements the document traces to.".into(),
                    suggestion: "Cover every traced requirement across the split parts.".into(),
                });
                Disposition::RejectForRevision
            }
            // Conservative default: any gate below the maximum rejects.
            _ => Disposition::RejectForRevision,
        };

        if evidence.is_empty() {
            return Err(ReviewError::Unsubstantiated(
                disposition.label().to_string(),
            ));
        }
        Ok(ReviewResult {
            spec_id: spec.id,
            draft_version: draft.version,
            disposition,
            gate_scores: scores,
            evidence,
            feedback,
        })
    }

    fn vague_phrases(&self, content: &str) -> Vec<String> {
        let haystack = content.to_lowercase();
        self.lexicon
            .vague_phrases
            .iter()
            .filter(|phrase| haystack.contains(&phrase.to_lowercase()))
            .cloned()
            .collect()
    }
}
