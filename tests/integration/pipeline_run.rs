use std::sync::atomic::AtomicBool;

use anyhow::Result;
use serde_json::json;

use policyforge::config::GeneratorConfig;
use policyforge::corpus::CorpusStore;
use policyforge::decompose::decompose_domain;
use policyforge::domains::select_domains;
use policyforge::pipeline::{PolicyPipeline, RunEventType, RunLog};

use crate::support::{
    healthcare_profile, read_json_file, verdict_json_with, CorpusFixture, ScriptedReviewer,
    ScriptedWriter,
};

fn expected_spec_count() -> usize {
    let domains = select_domains(&healthcare_profile()).unwrap();
    domains
        .iter()
        .map(|domain| decompose_domain(domain).unwrap().len())
        .sum()
}

#[test]
fn full_run_builds_a_durable_corpus() -> Result<()> {
    let fixture = CorpusFixture::new();
    let config = GeneratorConfig::default();
    let writer = ScriptedWriter::new();
    let reviewer = ScriptedReviewer::approving();
    let pipeline = PolicyPipeline::new(&config, &writer, &reviewer);
    let profile = healthcare_profile();

    let report = pipeline.run(&profile, &fixture.corpus_dir())?;

    let expected = expected_spec_count();
    assert_eq!(report.approved.len(), expected, "{}", report.summary());
    assert!(report.merged.is_empty());
    assert!(report.escalations.is_empty());
    assert!(report.failures.is_empty());

    // Durable state survives the run.
    let store = CorpusStore::open(fixture.corpus_dir())?;
    assert_eq!(store.len(), expected);
    assert_eq!(store.verify(), Vec::<String>::new());

    // Publishing output: one rendered document per entry, fixed section
    // order, metadata block first.
    let docs_dir = fixture.corpus_dir().join("documents");
    let mut rendered: Vec<_> = std::fs::read_dir(&docs_dir)?
        .map(|item| item.unwrap().path())
        .collect();
    rendered.sort();
    assert_eq!(rendered.len(), expected);
    let first = std::fs::read_to_string(&rendered[0])?;
    assert!(first.starts_with("---\ntitle:"));
    let purpose = first.find("## Purpose").expect("Purpose section");
    let scope = first.find("## Scope").expect("Scope section");
    let roles = first.find("## Roles and Responsibilities").expect("Roles section");
    assert!(purpose < scope && scope < roles, "section order is contractual");

    // Report artifact and event log.
    let report_json = read_json_file(&fixture.corpus_dir().join("report.json"));
    assert_eq!(
        report_json["approved"].as_array().map(|a| a.len()),
        Some(expected)
    );
    let events = RunLog::for_dir(fixture.corpus_dir()).load_events()?;
    assert!(matches!(events.first().unwrap().event_type, RunEventType::RunStarted));
    assert!(matches!(events.last().unwrap().event_type, RunEventType::RunCompleted));
    let reviews = events
        .iter()
        .filter(|e| e.event_type == RunEventType::ReviewCompleted)
        .count();
    assert!(reviews >= expected);
    Ok(())
}

#[test]
fn second_run_resumes_from_committed_ledger() -> Result<()> {
    let fixture = CorpusFixture::new();
    let config = GeneratorConfig::default();
    let writer = ScriptedWriter::new();
    let reviewer = ScriptedReviewer::approving();
    let pipeline = PolicyPipeline::new(&config, &writer, &reviewer);
    let profile = healthcare_profile();

    let first = pipeline.run(&profile, &fixture.corpus_dir())?;
    let second = pipeline.run(&profile, &fixture.corpus_dir())?;

    assert!(second.approved.is_empty(), "committed specs must not re-draft");
    assert_eq!(second.skipped.len(), first.approved.len());
    let store = CorpusStore::open(fixture.corpus_dir())?;
    assert_eq!(store.len(), first.approved.len(), "resume must not duplicate entries");
    Ok(())
}

#[test]
fn split_disposition_requeues_parts_in_next_wave() -> Result<()> {
    let fixture = CorpusFixture::new();
    let config = GeneratorConfig::default();
    let writer = ScriptedWriter::new();
    let split_verdict = {
        let mut value: serde_json::Value =
            serde_json::from_str(&verdict_json_with(&[("scope_and_architecture", 2)], true))?;
        value["split"] = json!([
            {
                "title": "Workforce Access Policy",
                "doc_type": "policy",
                "outline": [],
                "traces_to": [0, 1]
            },
            {
                "title": "Service Account Policy",
                "doc_type": "policy",
                "outline": [],
                "traces_to": [0, 1]
            }
        ]);
        value.to_string()
    };
    let reviewer =
        ScriptedReviewer::approving().queue_for("Access Control Policy", vec![split_verdict]);
    let pipeline = PolicyPipeline::new(&config, &writer, &reviewer);
    let profile = healthcare_profile();

    let report = pipeline.run(&profile, &fixture.corpus_dir())?;

    let titles: Vec<&str> = report.approved.iter().map(|d| d.title.as_str()).collect();
    assert!(titles.contains(&"Workforce Access Policy"));
    assert!(titles.contains(&"Service Account Policy"));
    assert!(
        !titles.contains(&"Access Control Policy"),
        "the split parent is superseded by its parts"
    );
    // One parent replaced by two parts.
    assert_eq!(report.approved.len(), expected_spec_count() + 1);
    assert!(report.escalations.is_empty());
    Ok(())
}

#[test]
fn preset_cancellation_stops_before_any_draft() -> Result<()> {
    let fixture = CorpusFixture::new();
    let config = GeneratorConfig::default();
    let writer = ScriptedWriter::new();
    let reviewer = ScriptedReviewer::approving();
    let pipeline = PolicyPipeline::new(&config, &writer, &reviewer);
    let profile = healthcare_profile();

    let cancel = AtomicBool::new(true);
    let report = pipeline.run_with_cancel(&profile, &fixture.corpus_dir(), &cancel)?;

    assert!(report.approved.is_empty());
    assert!(report.escalations.is_empty());
    // The store stays consistent and resumable.
    let store = CorpusStore::open(fixture.corpus_dir())?;
    assert!(store.is_empty());
    assert_eq!(store.verify(), Vec::<String>::new());
    Ok(())
}
