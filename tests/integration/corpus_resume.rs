use std::collections::BTreeSet;
use std::fs;

use anyhow::Result;

use policyforge::corpus::{CorpusEntry, CorpusStore};
use policyforge::decompose::{DocumentStatus, DocumentType};

use crate::support::{spec_named, CorpusFixture};

#[test]
fn reopening_restores_committed_state() -> Result<()> {
    let fixture = CorpusFixture::new();
    let dir = fixture.corpus_dir();

    let (key_id, enc_id) = {
        let mut store = CorpusStore::open(&dir)?;
        let key_id = store.insert(CorpusEntry::new(
            "Key Management Policy",
            "Cryptography & Key Management",
            DocumentType::Policy,
            "## Policy\nKeys rotate on a fixed schedule.",
            BTreeSet::new(),
        ))?;
        let enc_id = store.insert(CorpusEntry::new(
            "Encryption Policy",
            "Cryptography & Key Management",
            DocumentType::Policy,
            "## Policy\nCiphertext requirements reference the Key Management Policy.",
            [key_id].into_iter().collect(),
        ))?;
        let mut spec = spec_named(
            "Encryption Policy",
            "Cryptography & Key Management",
            DocumentType::Policy,
        );
        spec.status = DocumentStatus::Approved;
        store.record_spec_status(&spec, Some(enc_id), 1)?;
        (key_id, enc_id)
    };

    // A fresh process reopens the directory.
    let store = CorpusStore::open(&dir)?;
    assert_eq!(store.len(), 2);
    assert_eq!(
        store.entry(&enc_id).unwrap().content,
        "## Policy\nCiphertext requirements reference the Key Management Policy."
    );
    assert!(store.graph().dependencies_of(&enc_id).contains(&key_id));
    let record = store
        .committed_status("Encryption Policy")
        .expect("ledger must survive restart");
    assert_eq!(record.status, DocumentStatus::Approved);
    assert_eq!(record.entry_id, Some(enc_id));
    assert_eq!(record.reject_cycles, 1);
    assert_eq!(store.verify(), Vec::<String>::new());
    Ok(())
}

#[test]
fn tampered_entry_file_fails_reopen() -> Result<()> {
    let fixture = CorpusFixture::new();
    let dir = fixture.corpus_dir();
    {
        let mut store = CorpusStore::open(&dir)?;
        store.insert(CorpusEntry::new(
            "Physical Security Policy",
            "Physical & Environmental Security",
            DocumentType::Policy,
            "## Policy\nFacility access is badge-controlled and logged.",
            BTreeSet::new(),
        ))?;
    }
    let entry_path = dir.join("entries").join("physical-security-policy.json");
    assert!(entry_path.exists());
    fs::write(&entry_path, "{\"tampered\": true}")?;

    let err = CorpusStore::open(&dir).unwrap_err();
    assert!(
        err.to_string().contains("hash"),
        "tampering should fail hash reconciliation, got: {err:#}"
    );
    Ok(())
}

#[test]
fn mutations_survive_partial_runs() -> Result<()> {
    let fixture = CorpusFixture::new();
    let dir = fixture.corpus_dir();
    {
        let mut store = CorpusStore::open(&dir)?;
        let target = store.insert(CorpusEntry::new(
            "Infrastructure Security Policy",
            "Operations Security",
            DocumentType::Policy,
            "## Policy\nBaselines cover VM hardening.",
            BTreeSet::new(),
        ))?;
        store.merge(
            &target,
            "Azure VM Hardening Policy",
            "Azure machines apply the approved image baseline.",
        )?;
    }
    let store = CorpusStore::open(&dir)?;
    assert_eq!(store.len(), 1);
    let entry = store.entries_ordered()[0];
    assert!(entry.content.contains("## Azure VM Hardening Policy"));
    Ok(())
}
