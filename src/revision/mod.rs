//! Per-document revision control.
//!
//! Drives one DocumentSpec through the drafting/review loop until a
//! terminal disposition or the revision budget runs out. Oracle failures
//! and timeouts are retried within their own bound and otherwise consume
//! reject cycles like an ordinary rejection; exhausting the budget always
//! surfaces an escalation, never a forced approval.

use std::sync::RwLock;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use serde_json::json;
use uuid::Uuid;

use crate::config::GeneratorConfig;
use crate::corpus::{CorpusEntry, CorpusStore};
use crate::decompose::{DocumentSpec, DocumentStatus};
use crate::errors::{OracleError, ReviewError};
use crate::oracle::{ContentOracle, Draft, GenerationRequest, OracleCaller, ReviewerOracle};
use crate::pipeline::events::{RunEventType, RunLog};
use crate::profile::RequirementsProfile;
use crate::render::missing_sections;
use crate::review::{Disposition, FeedbackItem, ReviewEngine, ReviewResult};
use crate::resolve;

/// Terminal result of one spec's revision pipeline.
#[derive(Debug, Clone)]
pub enum SpecOutcome {
    Approved { entry_id: Uuid },
    Merged { target: Uuid },
    /// Replacement specs re-enter the work queue.
    Split { specs: Vec<DocumentSpec> },
    /// Revision budget exhausted or the reviewer could not produce a
    /// usable verdict; surfaced to the operator with full history.
    EscalationRequired { reason: String },
}

impl SpecOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            SpecOutcome::Approved { .. } => "approved",
            SpecOutcome::Merged { .. } => "merged",
            SpecOutcome::Split { .. } => "split",
            SpecOutcome::EscalationRequired { .. } => "escalation_required",
        }
    }
}

/// Everything the run report needs about one finished spec.
#[derive(Debug, Clone)]
pub struct SpecRun {
    pub spec: DocumentSpec,
    pub outcome: SpecOutcome,
    pub reject_cycles: u32,
    /// Every review verdict, oldest first.
    pub reviews: Vec<ReviewResult>,
}

/// Drives the state machine of a single DocumentSpec.
pub struct RevisionController<'a> {
    content_oracle: &'a dyn ContentOracle,
    reviewer_oracle: &'a dyn ReviewerOracle,
    engine: &'a ReviewEngine,
    caller: OracleCaller,
    config: &'a GeneratorConfig,
    run_id: Uuid,
}

impl<'a> RevisionController<'a> {
    pub fn new(
        content_oracle: &'a dyn ContentOracle,
        reviewer_oracle: &'a dyn ReviewerOracle,
        engine: &'a ReviewEngine,
        config: &'a GeneratorConfig,
        run_id: Uuid,
    ) -> Self {
        Self {
            content_oracle,
            reviewer_oracle,
            engine,
            caller: OracleCaller::new(&config.oracle),
            config,
            run_id,
        }
    }

    /// Runs the spec to a terminal outcome. Corpus integrity violations
    /// propagate as errors; everything else resolves into a `SpecOutcome`.
    pub fn run_spec(
        &self,
        mut spec: DocumentSpec,
        profile: &RequirementsProfile,
        store: &RwLock<CorpusStore>,
        log: &RunLog,
    ) -> Result<SpecRun> {
        let mut feedback_history: Vec<FeedbackItem> = Vec::new();
        let mut reviews: Vec<ReviewResult> = Vec::new();
        let mut reject_cycles: u32 = 0;
        let mut version: u32 = 1;

        loop {
            spec.status = DocumentStatus::Drafting;
            self.record_status(store, &spec, None, reject_cycles)?;
            log.append(
                self.run_id,
                RunEventType::DraftRequested,
                json!({ "spec_id": spec.id, "title": spec.title, "version": version }),
            )?;

            let draft = match self.produce_draft(&spec, profile, store, &feedback_history, version)
            {
                Ok(draft) => draft,
                Err(err) => {
                    reject_cycles += 1;
                    if reject_cycles >= self.config.revision.max_reject_cycles {
                        return self.escalate(
                            spec,
                            store,
                            log,
                            reviews,
                            reject_cycles,
                            format!("content oracle failed after retries: {err}"),
                        );
                    }
                    continue;
                }
            };
            log.append(
                self.run_id,
                RunEventType::DraftProduced,
                json!({
                    "spec_id": spec.id,
                    "version": draft.version,
                    "content_hash": draft.content_hash,
                }),
            )?;

            spec.status = DocumentStatus::InReview;
            self.record_status(store, &spec, None, reject_cycles)?;

            let snapshot = store
                .read()
                .map_err(|_| anyhow!("corpus store lock poisoned"))?
                .snapshot();
            let review = match self.engine.review(
                self.reviewer_oracle,
                &self.caller,
                &spec,
                &draft,
                profile,
                &snapshot,
            ) {
                Ok(review) => review,
                Err(ReviewError::Oracle(err)) => {
                    // Transient reviewer trouble burns a cycle like an
                    // ordinary rejection.
                    reject_cycles += 1;
                    if reject_cycles >= self.config.revision.max_reject_cycles {
                        return self.escalate(
                            spec,
                            store,
                            log,
                            reviews,
                            reject_cycles,
                            format!("reviewer oracle failed after retries: {err}"),
                        );
                    }
                    continue;
                }
                Err(err) => {
                    return self.escalate(
                        spec,
                        store,
                        log,
                        reviews,
                        reject_cycles,
                        format!("review engine could not produce a usable verdict: {err}"),
                    );
                }
            };
            log.append(
                self.run_id,
                RunEventType::ReviewCompleted,
                json!({
                    "spec_id": spec.id,
                    "version": draft.version,
                    "disposition": review.disposition.label(),
                    "total_score": review.gate_scores.total(),
                }),
            )?;
            reviews.push(review.clone());

            match review.disposition {
                Disposition::Approve => {
                    let entry_id =
                        self.commit_approval(&mut spec, &draft, store, &snapshot, reject_cycles)?;
                    log.append(
                        self.run_id,
                        RunEventType::CorpusInserted,
                        json!({ "spec_id": spec.id, "entry_id": entry_id, "title": spec.title }),
                    )?;
                    return Ok(SpecRun {
                        spec,
                        outcome: SpecOutcome::Approved { entry_id },
                        reject_cycles,
                        reviews,
                    });
                }
                Disposition::RecommendMerge { target } => {
                    {
                        let mut guard = store
                            .write()
                            .map_err(|_| anyhow!("corpus store lock poisoned"))?;
                        resolve::apply_merge(&mut guard, &spec, &draft, target)
                            .with_context(|| format!("Merging '{}' failed", spec.title))?;
                        spec.status = DocumentStatus::Merged;
                        guard
                            .record_spec_status(&spec, Some(target), reject_cycles)
                            .context("Failed recording merged status")?;
                    }
                    log.append(
                        self.run_id,
                        RunEventType::CorpusMerged,
                        json!({ "spec_id": spec.id, "target": target, "title": spec.title }),
                    )?;
                    return Ok(SpecRun {
                        spec,
                        outcome: SpecOutcome::Merged { target },
                        reject_cycles,
                        reviews,
                    });
                }
                Disposition::RecommendSplit { ref parts } => {
                    if spec.split_depth >= self.config.revision.max_split_depth {
                        // Too deep to decompose further; treat as an
                        // ordinary rejection so the spec still terminates.
                        feedback_history.push(FeedbackItem {
                            section: "Scope".into(),
                            issue: "Further decomposition exceeds the split depth bound".into(),
                            suggestion: "Tighten this document instead of splitting it.".into(),
                        });
                        reject_cycles += 1;
                        if reject_cycles >= self.config.revision.max_reject_cycles {
                            return self.escalate(
                                spec,
                                store,
                                log,
                                reviews,
                                reject_cycles,
                                "split recommended beyond depth bound".to_string(),
                            );
                        }
                        version += 1;
                        continue;
                    }
                    let replacements = resolve::resolve_split(&spec, parts)
                        .with_context(|| format!("Splitting '{}' failed", spec.title))?;
                    spec.status = DocumentStatus::Superseded;
                    self.record_status(store, &spec, None, reject_cycles)?;
                    log.append(
                        self.run_id,
                        RunEventType::SpecSplit,
                        json!({
                            "spec_id": spec.id,
                            "title": spec.title,
                            "parts": replacements.iter().map(|s| s.title.clone()).collect::<Vec<_>>(),
                        }),
                    )?;
                    return Ok(SpecRun {
                        spec,
                        outcome: SpecOutcome::Split {
                            specs: replacements,
                        },
                        reject_cycles,
                        reviews,
                    });
                }
                Disposition::RejectForRevision => {
                    reject_cycles += 1;
                    if reject_cycles >= self.config.revision.max_reject_cycles {
                        return self.escalate(
                            spec,
                            store,
                            log,
                            reviews,
                            reject_cycles,
                            format!(
                                "rejected on {} consecutive cycles without a passing gate slate",
                                reject_cycles
                            ),
                        );
                    }
                    feedback_history.extend(review.feedback.clone());
                    version += 1;
                }
            }
        }
    }

    /// Drafting call with template-shape validation; transient failures
    /// and malformed output are retried within the oracle budget.
    fn produce_draft(
        &self,
        spec: &DocumentSpec,
        profile: &RequirementsProfile,
        store: &RwLock<CorpusStore>,
        feedback: &[FeedbackItem],
        version: u32,
    ) -> Result<Draft, OracleError> {
        let context = store
            .read()
            .map(|guard| guard.snapshot().context())
            .unwrap_or_default();
        let request = GenerationRequest {
            spec,
            profile,
            context: &context,
            prior_feedback: feedback,
            template: self.engine.template(),
        };
        let mut last_error = OracleError::Unavailable("content oracle was never invoked".into());
        for _attempt in 0..=self.config.oracle.retry_limit {
            let started = Instant::now();
            match self.content_oracle.generate(&request) {
                Ok(content) => {
                    if started.elapsed().as_millis() as u64 > self.config.oracle.timeout_ms {
                        last_error = OracleError::Timeout(self.config.oracle.timeout_ms);
                        continue;
                    }
                    let missing =
                        missing_sections(&content, spec.doc_type, self.engine.template());
                    if !missing.is_empty() {
                        last_error = OracleError::Malformed(format!(
                            "draft lacks required sections: {}",
                            missing.join(", ")
                        ));
                        continue;
                    }
                    return Ok(Draft::new(spec.id, version, content));
                }
                Err(err) if err.is_retryable() => last_error = err,
                Err(err) => return Err(err),
            }
        }
        Err(last_error)
    }

    /// Insert path for a clean approval: dependencies are derived from
    /// the titles the draft references, then the entry commits under the
    /// single writer.
    fn commit_approval(
        &self,
        spec: &mut DocumentSpec,
        draft: &Draft,
        store: &RwLock<CorpusStore>,
        snapshot: &crate::corpus::CorpusSnapshot,
        reject_cycles: u32,
    ) -> Result<Uuid> {
        let dependency_refs = snapshot.referenced_entries(&draft.content);
        let entry = CorpusEntry::new(
            spec.title.clone(),
            spec.category.clone(),
            spec.doc_type,
            draft.content.clone(),
            dependency_refs,
        );
        let mut guard = store
            .write()
            .map_err(|_| anyhow!("corpus store lock poisoned"))?;
        let entry_id = guard
            .insert(entry)
            .with_context(|| format!("Inserting '{}' into the corpus failed", spec.title))?;
        spec.status = DocumentStatus::Approved;
        guard
            .record_spec_status(spec, Some(entry_id), reject_cycles)
            .context("Failed recording approved status")?;
        Ok(entry_id)
    }

    fn escalate(
        &self,
        spec: DocumentSpec,
        store: &RwLock<CorpusStore>,
        log: &RunLog,
        reviews: Vec<ReviewResult>,
        reject_cycles: u32,
        reason: String,
    ) -> Result<SpecRun> {
        self.record_status(store, &spec, None, reject_cycles)?;
        log.append(
            self.run_id,
            RunEventType::SpecEscalated,
            json!({ "spec_id": spec.id, "title": spec.title, "reason": reason }),
        )?;
        Ok(SpecRun {
            spec,
            outcome: SpecOutcome::EscalationRequired { reason },
            reject_cycles,
            reviews,
        })
    }

    fn record_status(
        &self,
        store: &RwLock<CorpusStore>,
        spec: &DocumentSpec,
        entry_id: Option<Uuid>,
        reject_cycles: u32,
    ) -> Result<()> {
        let mut guard = store
            .write()
            .map_err(|_| anyhow!("corpus store lock poisoned"))?;
        guard
            .record_spec_status(spec, entry_id, reject_cycles)
            .with_context(|| format!("Failed recording status for '{}'", spec.title))?;
        Ok(())
    }
}
