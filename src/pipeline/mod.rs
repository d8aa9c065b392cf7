//! End-to-end generation pipeline.
//!
//! Selection and decomposition are pure and run up front; per-document
//! pipelines then run as parallel workers against the single-writer
//! corpus store. Splits re-enter the queue as a fresh wave. The pipeline
//! resumes from the durable ledger, so documents committed by an earlier
//! interrupted run are skipped rather than re-drafted.

pub mod events;

pub use events::{RunEvent, RunEventType, RunLog};

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rayon::prelude::*;
use serde_json::json;
use uuid::Uuid;

use crate::config::GeneratorConfig;
use crate::corpus::persistence::{entry_slug, write_bytes_atomic};
use crate::corpus::CorpusStore;
use crate::decompose::{decompose_domain, DocumentSpec, DocumentStatus};
use crate::domains::select_domains;
use crate::oracle::{ContentOracle, ReviewerOracle};
use crate::profile::RequirementsProfile;
use crate::render::{serialize_document, DocumentTemplate};
use crate::report::{
    ApprovedDocument, EscalationRecord, FailureRecord, MergedDocument, RunReport, SkippedSpec,
};
use crate::review::ReviewEngine;
use crate::revision::{RevisionController, SpecOutcome, SpecRun};

/// Subdirectory of the corpus holding rendered publishing output.
pub const DOCUMENTS_SUBDIR: &str = "documents";

pub struct PolicyPipeline<'a> {
    config: &'a GeneratorConfig,
    content_oracle: &'a dyn ContentOracle,
    reviewer_oracle: &'a dyn ReviewerOracle,
}

impl<'a> PolicyPipeline<'a> {
    pub fn new(
        config: &'a GeneratorConfig,
        content_oracle: &'a dyn ContentOracle,
        reviewer_oracle: &'a dyn ReviewerOracle,
    ) -> Self {
        Self {
            config,
            content_oracle,
            reviewer_oracle,
        }
    }

    /// Runs the full pipeline against the corpus at `corpus_dir`.
    pub fn run(&self, profile: &RequirementsProfile, corpus_dir: &Path) -> Result<RunReport> {
        self.run_with_cancel(profile, corpus_dir, &AtomicBool::new(false))
    }

    /// Cancellable variant: once `cancel` flips, no further spec starts;
    /// in-flight mutations still commit atomically, so the store stays
    /// consistent for a later resume.
    pub fn run_with_cancel(
        &self,
        profile: &RequirementsProfile,
        corpus_dir: &Path,
        cancel: &AtomicBool,
    ) -> Result<RunReport> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        let log = RunLog::for_dir(corpus_dir);
        let store = RwLock::new(CorpusStore::open(corpus_dir)?);
        log.append(
            run_id,
            RunEventType::RunStarted,
            json!({ "profile_digest": profile.digest() }),
        )?;

        let domains = select_domains(profile)?;
        for domain in &domains {
            log.append(
                run_id,
                RunEventType::DomainSelected,
                json!({
                    "domain": domain.name.title(),
                    "citations": domain.compliance_citations,
                }),
            )?;
        }

        let mut queue: Vec<DocumentSpec> = Vec::new();
        let mut skipped: Vec<SkippedSpec> = Vec::new();
        for domain in &domains {
            for spec in decompose_domain(domain)? {
                let committed = {
                    let guard = store
                        .read()
                        .map_err(|_| anyhow!("corpus store lock poisoned"))?;
                    guard.committed_status(&spec.title).map(|r| r.status)
                };
                match committed {
                    Some(
                        status @ (DocumentStatus::Approved
                        | DocumentStatus::Merged
                        | DocumentStatus::Superseded),
                    ) => {
                        log.append(
                            run_id,
                            RunEventType::SpecSkipped,
                            json!({ "title": spec.title, "status": status }),
                        )?;
                        skipped.push(SkippedSpec {
                            title: spec.title.clone(),
                            committed_status: format!("{:?}", status),
                        });
                    }
                    _ => {
                        log.append(
                            run_id,
                            RunEventType::SpecQueued,
                            json!({ "spec_id": spec.id, "title": spec.title }),
                        )?;
                        queue.push(spec);
                    }
                }
            }
        }

        let engine = ReviewEngine::new(&self.config.oracle);
        let controller = RevisionController::new(
            self.content_oracle,
            self.reviewer_oracle,
            &engine,
            self.config,
            run_id,
        );
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.pipeline.max_parallel_documents.max(1) as usize)
            .build()
            .context("Failed building pipeline worker pool")?;

        let mut finished: Vec<SpecRun> = Vec::new();
        let mut failures: Vec<FailureRecord> = Vec::new();
        let mut wave = queue;
        while !wave.is_empty() && !cancel.load(Ordering::SeqCst) {
            let results: Vec<(String, Result<Option<SpecRun>>)> = pool.install(|| {
                wave.into_par_iter()
                    .map(|spec| {
                        let title = spec.title.clone();
                        if cancel.load(Ordering::SeqCst) {
                            return (title, Ok(None));
                        }
                        let outcome = controller
                            .run_spec(spec, profile, &store, &log)
                            .map(Some);
                        (title, outcome)
                    })
                    .collect()
            });

            let mut next_wave: Vec<DocumentSpec> = Vec::new();
            for (title, result) in results {
                match result {
                    Ok(Some(run)) => {
                        if let SpecOutcome::Split { specs } = &run.outcome {
                            next_wave.extend(specs.clone());
                        }
                        finished.push(run);
                    }
                    Ok(None) => {}
                    Err(err) => {
                        log.append(
                            run_id,
                            RunEventType::SpecFailed,
                            json!({ "title": title, "error": err.to_string() }),
                        )?;
                        failures.push(FailureRecord {
                            title,
                            error: format!("{err:#}"),
                        });
                    }
                }
            }
            wave = next_wave;
        }

        let report = self.assemble_report(
            run_id,
            started_at,
            profile,
            &store,
            finished,
            failures,
            skipped,
        )?;
        self.export_documents(corpus_dir, &store)?;
        report.write(corpus_dir)?;
        log.append(
            run_id,
            RunEventType::RunCompleted,
            json!({ "summary": report.summary() }),
        )?;
        Ok(report)
    }

    fn assemble_report(
        &self,
        run_id: Uuid,
        started_at: chrono::DateTime<Utc>,
        profile: &RequirementsProfile,
        store: &RwLock<CorpusStore>,
        finished: Vec<SpecRun>,
        failures: Vec<FailureRecord>,
        skipped: Vec<SkippedSpec>,
    ) -> Result<RunReport> {
        let guard = store
            .read()
            .map_err(|_| anyhow!("corpus store lock poisoned"))?;
        let mut approved = Vec::new();
        let mut merged = Vec::new();
        let mut escalations = Vec::new();
        for run in finished {
            match run.outcome {
                SpecOutcome::Approved { entry_id } => {
                    let order_index = guard
                        .entry(&entry_id)
                        .map(|entry| entry.order_index)
                        .unwrap_or_default();
                    approved.push(ApprovedDocument {
                        entry_id,
                        title: run.spec.title,
                        category: run.spec.category,
                        order_index,
                    });
                }
                SpecOutcome::Merged { target } => {
                    let target_title = guard
                        .entry(&target)
                        .map(|entry| entry.title.clone())
                        .unwrap_or_else(|| target.to_string());
                    merged.push(MergedDocument {
                        spec_title: run.spec.title,
                        target_id: target,
                        target_title,
                    });
                }
                SpecOutcome::Split { .. } => {
                    // Superseded by its parts; the parts report themselves.
                }
                SpecOutcome::EscalationRequired { reason } => {
                    escalations.push(EscalationRecord {
                        spec_id: run.spec.id,
                        title: run.spec.title,
                        category: run.spec.category,
                        reason,
                        reject_cycles: run.reject_cycles,
                        reviews: run.reviews,
                    });
                }
            }
        }
        approved.sort_by_key(|doc| doc.order_index);
        Ok(RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            profile_digest: profile.digest().to_string(),
            approved,
            merged,
            escalations,
            failures,
            skipped,
        })
    }

    /// Renders every corpus entry into the publishing layout:
    /// `documents/<order>-<slug>.md` with the fixed section order.
    fn export_documents(&self, corpus_dir: &Path, store: &RwLock<CorpusStore>) -> Result<()> {
        let guard = store
            .read()
            .map_err(|_| anyhow!("corpus store lock poisoned"))?;
        let template = DocumentTemplate::builtin();
        let out_dir = corpus_dir.join(DOCUMENTS_SUBDIR);
        for entry in guard.entries_ordered() {
            let rendered = serialize_document(
                &entry.title,
                &entry.category,
                entry.order_index,
                entry.doc_type,
                &entry.content,
                &template,
            );
            let path = out_dir.join(format!(
                "{:03}-{}.md",
                entry.order_index,
                entry_slug(&entry.title)
            ));
            write_bytes_atomic(&path, rendered.as_bytes())?;
        }
        Ok(())
    }
}
