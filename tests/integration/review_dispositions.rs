use anyhow::Result;
use serde_json::json;

use policyforge::config::OracleSettings;
use policyforge::corpus::{CorpusEntry, CorpusStore};
use policyforge::decompose::DocumentType;
use policyforge::errors::ReviewError;
use policyforge::oracle::{Draft, OracleCaller};
use policyforge::review::{parse_verdict, Disposition, Gate, ReviewEngine, MAX_GATE_SCORE};

use crate::support::{
    draft_for, draft_with_body, healthcare_profile, spec_named, verdict_json, verdict_json_with,
    ScriptedReviewer,
};

use std::collections::BTreeSet;

fn engine() -> (ReviewEngine, OracleCaller) {
    let settings = OracleSettings::default();
    (ReviewEngine::new(&settings), OracleCaller::new(&settings))
}

#[test]
fn clean_draft_with_perfect_gates_is_approved() -> Result<()> {
    let (engine, caller) = engine();
    let spec = spec_named("Encryption Policy", "Cryptography & Key Management", DocumentType::Policy);
    let draft = Draft::new(spec.id, 1, draft_for(&spec));
    let reviewer = ScriptedReviewer::approving();
    let snapshot = CorpusStore::in_memory().snapshot();

    let result = engine.review(
        &reviewer,
        &caller,
        &spec,
        &draft,
        &healthcare_profile(),
        &snapshot,
    )?;
    assert!(matches!(result.disposition, Disposition::Approve));
    for gate in policyforge::review::ALL_GATES {
        assert_eq!(result.gate_scores.get(gate), MAX_GATE_SCORE);
    }
    Ok(())
}

#[test]
fn any_imperfect_gate_rejects() -> Result<()> {
    let (engine, caller) = engine();
    let spec = spec_named("Encryption Policy", "Cryptography & Key Management", DocumentType::Policy);
    let draft = Draft::new(spec.id, 1, draft_for(&spec));
    let reviewer = ScriptedReviewer::with_default(verdict_json_with(
        &[("scope_and_architecture", 2)],
        true,
    ));
    let snapshot = CorpusStore::in_memory().snapshot();

    let result = engine.review(
        &reviewer,
        &caller,
        &spec,
        &draft,
        &healthcare_profile(),
        &snapshot,
    )?;
    assert!(matches!(result.disposition, Disposition::RejectForRevision));
    assert!(!result.evidence.is_empty());
    Ok(())
}

#[test]
fn vague_control_statement_caps_style_gate_and_rejects() -> Result<()> {
    let (engine, caller) = engine();
    let spec = spec_named("Network Security Policy", "Network & Communications Security", DocumentType::Policy);
    let draft = Draft::new(
        spec.id,
        1,
        draft_with_body(&spec, "The network must be kept secure."),
    );
    // The oracle is generous; the engine's lint is not.
    let reviewer = ScriptedReviewer::approving();
    let snapshot = CorpusStore::in_memory().snapshot();

    let result = engine.review(
        &reviewer,
        &caller,
        &spec,
        &draft,
        &healthcare_profile(),
        &snapshot,
    )?;
    assert!(matches!(result.disposition, Disposition::RejectForRevision));
    assert!(result.gate_scores.get(Gate::StyleAndAuditability) <= 1);
    assert!(
        result
            .feedback
            .iter()
            .any(|item| item.issue.contains("kept secure")),
        "feedback must cite the untestable phrase"
    );
    Ok(())
}

#[test]
fn missing_required_sections_cap_template_gate() -> Result<()> {
    let (engine, caller) = engine();
    let spec = spec_named("Encryption Policy", "Cryptography & Key Management", DocumentType::Policy);
    let draft = Draft::new(spec.id, 1, "# Encryption Policy\n\n## Policy\nCiphers are approved.\n".to_string());
    let reviewer = ScriptedReviewer::approving();
    let snapshot = CorpusStore::in_memory().snapshot();

    let result = engine.review(
        &reviewer,
        &caller,
        &spec,
        &draft,
        &healthcare_profile(),
        &snapshot,
    )?;
    assert!(matches!(result.disposition, Disposition::RejectForRevision));
    assert_eq!(result.gate_scores.get(Gate::TemplateAdherence), 0);
    Ok(())
}

#[test]
fn material_overlap_forces_merge_regardless_of_scores() -> Result<()> {
    let (engine, caller) = engine();
    let mut store = CorpusStore::in_memory();
    let infra = store
        .insert(CorpusEntry::new(
            "Infrastructure Security Policy",
            "Operations Security",
            DocumentType::Policy,
            "## Policy\nHost baselines cover VM hardening across azure tenants.",
            BTreeSet::new(),
        ))
        .unwrap();
    let snapshot = store.snapshot();

    let spec = spec_named("Azure VM Hardening Policy", "Operations Security", DocumentType::Policy);
    let draft = Draft::new(spec.id, 1, draft_for(&spec));
    let reviewer = ScriptedReviewer::approving();

    let result = engine.review(
        &reviewer,
        &caller,
        &spec,
        &draft,
        &healthcare_profile(),
        &snapshot,
    )?;
    match result.disposition {
        Disposition::RecommendMerge { target } => assert_eq!(target, infra),
        other => panic!("expected merge, got {other:?}"),
    }
    assert!(
        result
            .evidence
            .iter()
            .any(|citation| citation.reference.contains("Infrastructure Security Policy")),
        "merge must cite the covering corpus entry"
    );
    Ok(())
}

#[test]
fn unsubstantiated_rejection_is_a_reviewer_failure() -> Result<()> {
    let (engine, caller) = engine();
    let spec = spec_named("Encryption Policy", "Cryptography & Key Management", DocumentType::Policy);
    let draft = Draft::new(spec.id, 1, draft_for(&spec));
    // Rejection scores with no evidence at all, on every re-prompt.
    let reviewer = ScriptedReviewer::with_default(verdict_json_with(
        &[("framework_completeness", 1)],
        false,
    ));
    let snapshot = CorpusStore::in_memory().snapshot();

    let err = engine
        .review(
            &reviewer,
            &caller,
            &spec,
            &draft,
            &healthcare_profile(),
            &snapshot,
        )
        .unwrap_err();
    assert!(matches!(err, ReviewError::Unsubstantiated(_)));
    Ok(())
}

#[test]
fn malformed_verdict_is_reprompted_then_parsed() -> Result<()> {
    let (engine, caller) = engine();
    let spec = spec_named("Encryption Policy", "Cryptography & Key Management", DocumentType::Policy);
    let draft = Draft::new(spec.id, 1, draft_for(&spec));
    let reviewer = ScriptedReviewer::approving().queue_for(
        "Encryption Policy",
        vec!["not json at all".into(), verdict_json(3)],
    );
    let snapshot = CorpusStore::in_memory().snapshot();

    let result = engine.review(
        &reviewer,
        &caller,
        &spec,
        &draft,
        &healthcare_profile(),
        &snapshot,
    )?;
    assert!(matches!(result.disposition, Disposition::Approve));
    Ok(())
}

#[test]
fn fenced_json_verdicts_are_tolerated() -> Result<()> {
    let fenced = format!("```json\n{}\n```", verdict_json(2));
    let verdict = parse_verdict(&fenced)?;
    assert_eq!(verdict.gate_scores.len(), 5);
    Ok(())
}

#[test]
fn out_of_range_scores_fail_schema_validation() {
    let raw = json!({
        "gate_scores": {
            "template_adherence": 4,
            "style_and_auditability": 3,
            "corpus_consistency": 3,
            "scope_and_architecture": 3,
            "framework_completeness": 3
        }
    })
    .to_string();
    let err = parse_verdict(&raw).unwrap_err();
    assert!(matches!(err, ReviewError::ParseFailure(_)));
}
