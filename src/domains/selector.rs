//! Deterministic mapping from profile facts onto the domain menu.
//!
//! A pure function of the profile: every rule reads normalized interview
//! facts (plus a free-text scan for answers the interview left verbatim)
//! and either skips the domain or emits it with a justification quoting
//! the triggering facts. Output order is menu order, never relevance
//! order.

use crate::errors::ProfileError;
use crate::profile::{RequirementsProfile, REQUIRED_SECTIONS};

use super::{Domain, DomainName, DOMAIN_MENU};

/// Selects the applicable governance domains for a profile.
pub fn select_domains(profile: &RequirementsProfile) -> Result<Vec<Domain>, ProfileError> {
    for section in REQUIRED_SECTIONS {
        let populated = profile
            .fact(section)
            .and_then(|value| value.as_object())
            .map(|map| !map.is_empty())
            .unwrap_or(false);
        if !populated {
            return Err(ProfileError::Incomplete(section.to_string()));
        }
    }

    let mut selected = Vec::new();
    for name in DOMAIN_MENU {
        if let Some(domain) = evaluate(name, profile) {
            selected.push(domain);
        }
    }
    Ok(selected)
}

fn evaluate(name: DomainName, profile: &RequirementsProfile) -> Option<Domain> {
    let org = profile
        .fact_str("organization.name")
        .unwrap_or("the organization")
        .to_string();
    let industry = profile
        .fact_str("organization.industry")
        .unwrap_or("an unspecified")
        .to_string();

    match name {
        DomainName::GovernanceAndSecurityOrganization => Some(
            Domain::new(
                name,
                format!(
                    "{} operates in the {} industry and needs a defined security \
                     organization, management commitment, and policy lifecycle ownership.",
                    org, industry
                ),
            )
            .with_requirements(&[
                "Establish and maintain an information security program with executive sponsorship",
                "Define security roles, responsibilities, and segregation of duties",
                "Review and approve the governance document set on a fixed cadence",
            ])
            .with_citations(&with_regulated(
                profile,
                &["ISO/IEC 27001 A.5.1", "SOC 2 CC1.2", "NIST CSF GV.RR"],
                &["HIPAA §164.308(a)(2)"],
            )),
        ),
        DomainName::RiskManagement => Some(
            Domain::new(
                name,
                format!(
                    "Every engagement of {} requires a documented method for identifying, \
                     rating, and treating information security risk.",
                    org
                ),
            )
            .with_requirements(&[
                "Maintain a risk assessment methodology and register",
                "Treat identified risks through accept/mitigate/transfer decisions with owners",
                "Reassess risk on material change and at least annually",
            ])
            .with_citations(&with_regulated(
                profile,
                &["ISO/IEC 27001 Clause 6.1", "NIST CSF ID.RA", "SOC 2 CC3.2"],
                &["HIPAA §164.308(a)(1)(ii)(A)"],
            )),
        ),
        DomainName::AssetManagement => Some(
            Domain::new(
                name,
                format!(
                    "{} tracks data of classifications {:?}; hardware, software, and data \
                     assets need inventory, ownership, and handling rules.",
                    org,
                    profile.fact_list("data_governance.classifications")
                ),
            )
            .with_requirements(&[
                "Inventory information assets with assigned owners",
                "Classify data and prescribe handling per classification level",
                "Govern media disposal and asset return on separation",
            ])
            .with_citations(&["ISO/IEC 27001 A.5.9", "SOC 2 CC6.1", "NIST CSF ID.AM"]),
        ),
        DomainName::AccessControlAndIdentity => Some(
            Domain::new(
                name,
                format!(
                    "Access to systems at {} must be provisioned least-privilege, reviewed, \
                     and revoked on separation.",
                    org
                ),
            )
            .with_requirements(&[
                "Provision access by role with least privilege and documented approval",
                "Authenticate users with strong, centrally managed credentials",
                "Review entitlements periodically and revoke promptly on role change",
                "Control privileged and remote access separately",
            ])
            .with_citations(&with_regulated(
                profile,
                &["ISO/IEC 27001 A.5.15", "SOC 2 CC6.1", "SOC 2 CC6.2", "NIST CSF PR.AA"],
                &["HIPAA §164.312(a)(1)", "HIPAA §164.308(a)(4)"],
            )),
        ),
        DomainName::HumanResourcesSecurity => {
            if !has_workforce(profile) {
                return None;
            }
            Some(
                Domain::new(
                    name,
                    format!(
                        "{} employs a workforce (headcount {}); personnel screening, terms, \
                         and separation need security controls.",
                        org,
                        profile
                            .fact("workforce.headcount")
                            .map(|v| v.to_string())
                            .unwrap_or_else(|| "unknown".into())
                    ),
                )
                .with_requirements(&[
                    "Screen personnel commensurate with role sensitivity before access",
                    "Bind workforce members to security terms and acceptable use",
                    "Run a separation checklist covering access and asset return",
                ])
                .with_citations(&["ISO/IEC 27001 A.6.1", "SOC 2 CC1.4", "NIST CSF GV.RR-04"]),
            )
        }
        DomainName::SecurityAwarenessAndTraining => {
            if !has_workforce(profile) {
                return None;
            }
            Some(
                Domain::new(
                    name,
                    format!(
                        "The workforce of {} handles regulated or confidential data and \
                         needs recurring, role-appropriate security training.",
                        org
                    ),
                )
                .with_requirements(&[
                    "Deliver security awareness training at hire and annually",
                    "Provide role-specific training for privileged and developer roles",
                    "Track completion and escalate lapses",
                ])
                .with_citations(&with_regulated(
                    profile,
                    &["ISO/IEC 27001 A.6.3", "SOC 2 CC2.2", "NIST CSF PR.AT"],
                    &["HIPAA §164.308(a)(5)"],
                )),
            )
        }
        DomainName::CryptographyAndKeyManagement => {
            let classifications = profile.fact_list("data_governance.classifications");
            if classifications.is_empty()
                && !profile.fact_bool("data_governance.encryption_required")
            {
                return None;
            }
            Some(
                Domain::new(
                    name,
                    format!(
                        "{} stores {:?} data; encryption in transit and at rest plus \
                         managed key lifecycles are required.",
                        org, classifications
                    ),
                )
                .with_requirements(&[
                    "Encrypt sensitive data in transit and at rest with approved algorithms",
                    "Manage cryptographic keys through generation, rotation, and destruction",
                    "Restrict key custody and require split knowledge for root material",
                ])
                .with_citations(&with_regulated(
                    profile,
                    &["ISO/IEC 27001 A.8.24", "SOC 2 CC6.7", "NIST CSF PR.DS"],
                    &["HIPAA §164.312(a)(2)(iv)", "HIPAA §164.312(e)(2)(ii)"],
                )),
            )
        }
        DomainName::PhysicalAndEnvironmentalSecurity => {
            if !profile.fact_bool("organization.physical_offices")
                && !profile.fact_bool("technology.on_premises")
            {
                return None;
            }
            Some(
                Domain::new(
                    name,
                    format!(
                        "{} maintains physical offices or on-premises infrastructure that \
                         require facility access and environmental controls.",
                        org
                    ),
                )
                .with_requirements(&[
                    "Restrict facility access to authorized personnel with logging",
                    "Protect equipment against power, fire, and water hazards",
                ])
                .with_citations(&["ISO/IEC 27001 A.7.1", "SOC 2 CC6.4", "NIST CSF PR.AA-06"]),
            )
        }
        DomainName::OperationsSecurity => Some(
            Domain::new(
                name,
                format!(
                    "Day-to-day operation of {}'s technology stack needs documented \
                     change, capacity, backup, and malware controls.",
                    org
                ),
            )
            .with_requirements(&[
                "Control changes to production systems through review and rollback plans",
                "Protect endpoints and servers against malware",
                "Back up systems and data, and test restores on a schedule",
            ])
            .with_citations(&["ISO/IEC 27001 A.8.32", "SOC 2 CC8.1", "NIST CSF PR.PS"]),
        ),
        DomainName::NetworkAndCommunicationsSecurity => {
            if profile.fact_list("technology.cloud_providers").is_empty()
                && !profile.fact_bool("technology.on_premises")
                && !profile.mentions("network")
            {
                return None;
            }
            Some(
                Domain::new(
                    name,
                    format!(
                        "{} runs workloads across {:?}; network segmentation, boundary \
                         protection, and secured transmission are in scope.",
                        org,
                        profile.fact_list("technology.cloud_providers")
                    ),
                )
                .with_requirements(&[
                    "Segment networks and restrict traffic to documented flows",
                    "Protect boundaries with managed firewalls and hardened gateways",
                    "Secure data transmission over untrusted networks",
                ])
                .with_citations(&with_regulated(
                    profile,
                    &["ISO/IEC 27001 A.8.20", "SOC 2 CC6.6", "NIST CSF PR.IR"],
                    &["HIPAA §164.312(e)(1)"],
                )),
            )
        }
        DomainName::SecureDevelopmentAcquisitionAndMaintenance => {
            if !profile.fact_bool("technology.develops_software")
                && !profile.mentions("in-house")
            {
                return None;
            }
            Some(
                Domain::new(
                    name,
                    format!(
                        "{} develops software in-house; the SDLC needs security \
                         requirements, code review, and dependency management.",
                        org
                    ),
                )
                .with_requirements(&[
                    "Embed security requirements and threat modeling in the SDLC",
                    "Review and test code for security defects before release",
                    "Manage third-party components and patch known vulnerabilities",
                    "Separate development, test, and production environments",
                ])
                .with_citations(&with_regulated(
                    profile,
                    &["ISO/IEC 27001 A.8.25", "SOC 2 CC8.1", "NIST SSDF PW.4"],
                    &["HIPAA §164.306(a)", "HIPAA §164.312(c)(1)"],
                )),
            )
        }
        DomainName::SupplierAndThirdPartyRisk => {
            if profile.fact_list("technology.cloud_providers").is_empty()
                && profile.fact_list("technology.saas_applications").is_empty()
                && !profile.fact_bool("data_governance.third_party_sharing")
            {
                return None;
            }
            Some(
                Domain::new(
                    name,
                    format!(
                        "{} depends on cloud and SaaS suppliers {:?}; vendor due \
                         diligence and contractual security terms are required.",
                        org,
                        profile.fact_list("technology.cloud_providers")
                    ),
                )
                .with_requirements(&[
                    "Assess supplier security posture before onboarding and on renewal",
                    "Bind suppliers to security and data-protection terms",
                    "Monitor supplier incidents and exit readiness",
                ])
                .with_citations(&with_regulated(
                    profile,
                    &["ISO/IEC 27001 A.5.19", "SOC 2 CC9.2", "NIST CSF GV.SC"],
                    &["HIPAA §164.308(b)(1)"],
                )),
            )
        }
        DomainName::IncidentManagement => Some(
            Domain::new(
                name,
                format!(
                    "{} must detect, triage, and learn from security incidents with \
                     defined roles and notification duties.",
                    org
                ),
            )
            .with_requirements(&[
                "Define incident classification, roles, and escalation paths",
                "Respond to incidents through contain/eradicate/recover stages",
                "Meet breach notification obligations and capture lessons learned",
            ])
            .with_citations(&with_regulated(
                profile,
                &["ISO/IEC 27001 A.5.24", "SOC 2 CC7.3", "NIST CSF RS.MA"],
                &["HIPAA §164.308(a)(6)", "HIPAA §164.404"],
            )),
        ),
        DomainName::BusinessContinuityAndDisasterRecovery => {
            if !is_regulated(profile)
                && !profile.mentions("continuity")
                && !profile.mentions("availability")
            {
                return None;
            }
            Some(
                Domain::new(
                    name,
                    format!(
                        "Service continuity matters to {} given its {} obligations; \
                         recovery objectives and exercised plans are required.",
                        org, industry
                    ),
                )
                .with_requirements(&[
                    "Define recovery time and point objectives for critical services",
                    "Maintain and exercise continuity and disaster recovery plans",
                ])
                .with_citations(&with_regulated(
                    profile,
                    &["ISO/IEC 27001 A.5.30", "SOC 2 A1.2", "NIST CSF RC.RP"],
                    &["HIPAA §164.308(a)(7)"],
                )),
            )
        }
        DomainName::ComplianceAndAudit => Some(
            Domain::new(
                name,
                format!(
                    "{} targets the {:?} frameworks; obligations need tracking, \
                     internal audit, and evidence retention.",
                    org,
                    profile.fact_list("policy_scope.frameworks")
                ),
            )
            .with_requirements(&[
                "Maintain a register of legal, regulatory, and contractual obligations",
                "Audit control operation internally on a defined cycle",
                "Retain evidence and records per retention requirements",
            ])
            .with_citations(&["ISO/IEC 27001 A.5.31", "SOC 2 CC4.1", "NIST CSF GV.OC"]),
        ),
        DomainName::PrivacyAndDataProtection => {
            if !handles_personal_data(profile) {
                return None;
            }
            Some(
                Domain::new(
                    name,
                    format!(
                        "{} processes personal data ({:?}) in the {} industry; privacy \
                         principles, data subject handling, and minimization apply.",
                        org,
                        profile.fact_list("data_governance.classifications"),
                        industry
                    ),
                )
                .with_requirements(&[
                    "Process personal data lawfully, minimally, and transparently",
                    "Honor data subject rights within mandated timelines",
                    "Safeguard regulated records with access justification and audit",
                ])
                .with_citations(&with_regulated(
                    profile,
                    &["ISO/IEC 27701 7.2", "SOC 2 P1.1", "NIST Privacy Framework CT.PO"],
                    &["HIPAA §164.502(b)", "HIPAA §164.514(d)", "HIPAA §164.308(a)(1)"],
                )),
            )
        }
        DomainName::LoggingMonitoringAndVulnerabilityManagement => {
            if profile.fact_list("technology.cloud_providers").is_empty()
                && !profile.fact_bool("technology.develops_software")
            {
                return None;
            }
            Some(
                Domain::new(
                    name,
                    format!(
                        "{}'s production estate requires centralized logging, alerting, \
                         and a vulnerability remediation lifecycle.",
                        org
                    ),
                )
                .with_requirements(&[
                    "Collect and protect security-relevant logs centrally",
                    "Monitor for anomalous activity and alert on-call response",
                    "Scan for vulnerabilities and remediate within severity-based SLAs",
                ])
                .with_citations(&with_regulated(
                    profile,
                    &["ISO/IEC 27001 A.8.15", "SOC 2 CC7.1", "NIST CSF DE.CM"],
                    &["HIPAA §164.312(b)"],
                )),
            )
        }
    }
}

fn has_workforce(profile: &RequirementsProfile) -> bool {
    profile
        .fact("workforce.headcount")
        .and_then(|v| v.as_u64())
        .map(|count| count > 0)
        .unwrap_or(false)
        || profile.fact_bool("workforce.contractors")
}

fn handles_personal_data(profile: &RequirementsProfile) -> bool {
    let classifications = profile.fact_list("data_governance.classifications");
    classifications
        .iter()
        .any(|c| matches!(c.to_lowercase().as_str(), "pii" | "phi" | "personal"))
        || is_regulated(profile)
}

/// Health-data (and similarly regulated) profiles widen citations with the
/// relevant regulation sections.
fn is_regulated(profile: &RequirementsProfile) -> bool {
    let industry = profile
        .fact_str("organization.industry")
        .unwrap_or_default()
        .to_lowercase();
    industry.contains("health")
        || profile
            .fact_list("data_governance.classifications")
            .iter()
            .any(|c| c.eq_ignore_ascii_case("phi"))
        || profile
            .fact_list("policy_scope.frameworks")
            .iter()
            .any(|f| f.to_lowercase().contains("hipaa"))
}

fn with_regulated<'a>(
    profile: &RequirementsProfile,
    base: &[&'a str],
    regulated: &[&'a str],
) -> Vec<&'a str> {
    let mut citations = base.to_vec();
    if is_regulated(profile) {
        citations.extend_from_slice(regulated);
    }
    citations
}
