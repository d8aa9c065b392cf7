use anyhow::Result;
use serde_json::json;

use policyforge::domains::{select_domains, DomainName};
use policyforge::errors::ProfileError;
use policyforge::profile::RequirementsProfile;

use crate::support::{healthcare_profile, minimal_profile};

#[test]
fn healthcare_profile_selects_development_and_privacy_domains() -> Result<()> {
    let profile = healthcare_profile();
    let domains = select_domains(&profile)?;

    let secure_dev = domains
        .iter()
        .find(|d| d.name == DomainName::SecureDevelopmentAcquisitionAndMaintenance)
        .expect("in-house development must select the secure development domain");
    let privacy = domains
        .iter()
        .find(|d| d.name == DomainName::PrivacyAndDataProtection)
        .expect("PHI handling must select the privacy domain");

    for domain in [secure_dev, privacy] {
        assert!(
            domain
                .compliance_citations
                .iter()
                .any(|c| c.contains("HIPAA")),
            "{:?} should cite health-data regulation sections, got {:?}",
            domain.name,
            domain.compliance_citations
        );
        assert!(
            !domain.high_level_requirements.is_empty(),
            "selected domains must carry requirements"
        );
    }
    assert!(
        secure_dev.justification.contains("Meridian Health Systems"),
        "justification should reference profile facts: {}",
        secure_dev.justification
    );
    Ok(())
}

#[test]
fn selection_follows_menu_order_not_relevance() -> Result<()> {
    let domains = select_domains(&healthcare_profile())?;
    let indices: Vec<usize> = domains.iter().map(|d| d.name.menu_index()).collect();
    let mut sorted = indices.clone();
    sorted.sort_unstable();
    assert_eq!(indices, sorted, "output must stay in menu order");
    Ok(())
}

#[test]
fn selection_is_deterministic() -> Result<()> {
    let profile = healthcare_profile();
    let first = serde_json::to_value(select_domains(&profile)?)?;
    let second = serde_json::to_value(select_domains(&profile)?)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn sparse_profile_skips_conditional_domains() -> Result<()> {
    let domains = select_domains(&minimal_profile())?;
    let names: Vec<DomainName> = domains.iter().map(|d| d.name).collect();
    assert!(names.contains(&DomainName::RiskManagement));
    assert!(names.contains(&DomainName::IncidentManagement));
    assert!(!names.contains(&DomainName::SecureDevelopmentAcquisitionAndMaintenance));
    assert!(!names.contains(&DomainName::CryptographyAndKeyManagement));
    assert!(!names.contains(&DomainName::PhysicalAndEnvironmentalSecurity));
    Ok(())
}

#[test]
fn missing_profile_section_is_rejected_at_construction() {
    let err = RequirementsProfile::from_value(json!({
        "organization": { "name": "Acme" },
        "data_governance": {},
        "technology": {},
        "workforce": {}
    }))
    .unwrap_err();
    assert!(matches!(err, ProfileError::Incomplete(section) if section == "policy_scope"));
}

#[test]
fn empty_profile_section_fails_selection() {
    let profile = RequirementsProfile::from_value(json!({
        "organization": { "name": "Acme", "industry": "retail" },
        "data_governance": { "classifications": [] },
        "technology": { "develops_software": false },
        "workforce": {},
        "policy_scope": { "frameworks": [] }
    }))
    .expect("all sections present");
    let err = select_domains(&profile).unwrap_err();
    assert!(matches!(err, ProfileError::Incomplete(section) if section == "workforce"));
}
