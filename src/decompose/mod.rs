//! Expansion of selected domains into concrete document specifications.
//!
//! Each domain carries ordered high-level requirements; the decomposer
//! maps them onto a fixed per-domain blueprint catalog. Every emitted
//! spec must trace to at least one requirement of its domain — the
//! traceability check is enforced, not advisory.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domains::{Domain, DomainName};
use crate::errors::{DecomposeError, ResolveError};

/// Whether a document states rules or executable steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Policy,
    Procedure,
}

impl DocumentType {
    /// Heading of the mandated body section for this document type.
    pub fn body_section(&self) -> &'static str {
        match self {
            DocumentType::Policy => "Policy",
            DocumentType::Procedure => "Procedure",
        }
    }
}

/// Lifecycle states of a document specification. Transitions are owned by
/// the Revision Controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Drafting,
    InReview,
    Approved,
    Merged,
    Superseded,
}

/// The plan for one policy or procedure document, prior to drafting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSpec {
    pub id: Uuid,
    pub title: String,
    /// Owning domain title.
    pub category: String,
    pub doc_type: DocumentType,
    /// Ordered section titles the draft must cover.
    pub outline: Vec<String>,
    pub compliance_citations: Vec<String>,
    /// Indices into the owning domain's `high_level_requirements`.
    pub traces_to: Vec<usize>,
    pub status: DocumentStatus,
    /// How many split generations produced this spec; bounds recursion.
    #[serde(default)]
    pub split_depth: u32,
}

/// A reviewer-proposed decomposition part, re-entering the queue as a
/// fresh spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedPart {
    pub title: String,
    pub doc_type: DocumentType,
    #[serde(default)]
    pub outline: Vec<String>,
    pub traces_to: Vec<usize>,
}

struct Blueprint {
    title: &'static str,
    doc_type: DocumentType,
    /// Topic sections inserted between the body section and the closing
    /// boilerplate.
    focus: &'static [&'static str],
    traces_to: &'static [usize],
}

/// Expands one domain into its ordered document specifications.
pub fn decompose_domain(domain: &Domain) -> Result<Vec<DocumentSpec>, DecomposeError> {
    let mut specs = Vec::new();
    for blueprint in catalog(domain.name) {
        let in_range = !blueprint.traces_to.is_empty()
            && blueprint
                .traces_to
                .iter()
                .all(|idx| *idx < domain.high_level_requirements.len());
        if !in_range {
            return Err(DecomposeError::Untraceable {
                domain: domain.name.title().to_string(),
                title: blueprint.title.to_string(),
            });
        }
        specs.push(DocumentSpec {
            id: Uuid::new_v4(),
            title: blueprint.title.to_string(),
            category: domain.name.title().to_string(),
            doc_type: blueprint.doc_type,
            outline: outline_for(blueprint.doc_type, blueprint.focus),
            compliance_citations: domain.compliance_citations.clone(),
            traces_to: blueprint.traces_to.to_vec(),
            status: DocumentStatus::Pending,
            split_depth: 0,
        });
    }
    Ok(specs)
}

/// Builds replacement specs from a reviewer split proposal.
///
/// Every trace index of the parent must be covered by at least one part;
/// an uncovered requirement fails the split rather than silently dropping
/// scope.
pub fn specs_from_split(
    parent: &DocumentSpec,
    parts: &[ProposedPart],
) -> Result<Vec<DocumentSpec>, ResolveError> {
    let missing: Vec<usize> = parent
        .traces_to
        .iter()
        .copied()
        .filter(|idx| !parts.iter().any(|part| part.traces_to.contains(idx)))
        .collect();
    if parts.is_empty() || !missing.is_empty() {
        return Err(ResolveError::SplitCoverage {
            spec: parent.title.clone(),
            missing,
        });
    }
    Ok(parts
        .iter()
        .map(|part| DocumentSpec {
            id: Uuid::new_v4(),
            title: part.title.clone(),
            category: parent.category.clone(),
            doc_type: part.doc_type,
            outline: if part.outline.is_empty() {
                outline_for(part.doc_type, &[])
            } else {
                part.outline.clone()
            },
            compliance_citations: parent.compliance_citations.clone(),
            traces_to: part.traces_to.clone(),
            status: DocumentStatus::Pending,
            split_depth: parent.split_depth + 1,
        })
        .collect())
}

fn outline_for(doc_type: DocumentType, focus: &[&str]) -> Vec<String> {
    let mut outline = vec!["Purpose".to_string(), "Scope".to_string()];
    outline.push(doc_type.body_section().to_string());
    for section in focus {
        outline.push(section.to_string());
    }
    outline.push("Roles and Responsibilities".to_string());
    outline.push("Exceptions".to_string());
    outline.push("Review Cadence".to_string());
    outline
}

fn catalog(name: DomainName) -> &'static [Blueprint] {
    match name {
        DomainName::GovernanceAndSecurityOrganization => &[
            Blueprint {
                title: "Information Security Program Policy",
                doc_type: DocumentType::Policy,
                focus: &["Program Governance", "Document Lifecycle"],
                traces_to: &[0, 2],
            },
            Blueprint {
                title: "Security Roles and Responsibilities Policy",
                doc_type: DocumentType::Policy,
                focus: &["Organizational Structure"],
                traces_to: &[1],
            },
        ],
        DomainName::RiskManagement => &[
            Blueprint {
                title: "Risk Management Policy",
                doc_type: DocumentType::Policy,
                focus: &["Risk Appetite", "Risk Register"],
                traces_to: &[0, 1],
            },
            Blueprint {
                title: "Risk Assessment Procedure",
                doc_type: DocumentType::Procedure,
                focus: &["Assessment Steps", "Treatment Decisions"],
                traces_to: &[0, 2],
            },
        ],
        DomainName::AssetManagement => &[
            Blueprint {
                title: "Asset Management Policy",
                doc_type: DocumentType::Policy,
                focus: &["Asset Inventory", "Data Classification"],
                traces_to: &[0, 1],
            },
            Blueprint {
                title: "Media Disposal Procedure",
                doc_type: DocumentType::Procedure,
                focus: &["Sanitization Methods"],
                traces_to: &[2],
            },
        ],
        DomainName::AccessControlAndIdentity => &[
            Blueprint {
                title: "Access Control Policy",
                doc_type: DocumentType::Policy,
                focus: &["Least Privilege", "Authentication Standards"],
                traces_to: &[0, 1],
            },
            Blueprint {
                title: "Access Provisioning Procedure",
                doc_type: DocumentType::Procedure,
                focus: &["Request and Approval", "Revocation"],
                traces_to: &[0, 2],
            },
            Blueprint {
                title: "Privileged Access Policy",
                doc_type: DocumentType::Policy,
                focus: &["Privileged Accounts", "Remote Administration"],
                traces_to: &[3],
            },
        ],
        DomainName::HumanResourcesSecurity => &[Blueprint {
            title: "Personnel Security Policy",
            doc_type: DocumentType::Policy,
            focus: &["Screening", "Onboarding and Separation"],
            traces_to: &[0, 1, 2],
        }],
        DomainName::SecurityAwarenessAndTraining => &[Blueprint {
            title: "Security Awareness and Training Policy",
            doc_type: DocumentType::Policy,
            focus: &["Training Program", "Completion Tracking"],
            traces_to: &[0, 1, 2],
        }],
        DomainName::CryptographyAndKeyManagement => &[
            Blueprint {
                title: "Encryption Policy",
                doc_type: DocumentType::Policy,
                focus: &["Approved Algorithms", "Data in Transit and at Rest"],
                traces_to: &[0],
            },
            Blueprint {
                title: "Key Management Policy",
                doc_type: DocumentType::Policy,
                focus: &["Key Lifecycle", "Custody"],
                traces_to: &[1, 2],
            },
        ],
        DomainName::PhysicalAndEnvironmentalSecurity => &[Blueprint {
            title: "Physical Security Policy",
            doc_type: DocumentType::Policy,
            focus: &["Facility Access", "Environmental Protections"],
            traces_to: &[0, 1],
        }],
        DomainName::OperationsSecurity => &[
            Blueprint {
                title: "Change Management Policy",
                doc_type: DocumentType::Policy,
                focus: &["Change Review", "Emergency Changes"],
                traces_to: &[0],
            },
            Blueprint {
                title: "Malware Protection Policy",
                doc_type: DocumentType::Policy,
                focus: &["Endpoint Protection"],
                traces_to: &[1],
            },
            Blueprint {
                title: "Backup and Restore Procedure",
                doc_type: DocumentType::Procedure,
                focus: &["Backup Schedule", "Restore Testing"],
                traces_to: &[2],
            },
        ],
        DomainName::NetworkAndCommunicationsSecurity => &[Blueprint {
            title: "Network Security Policy",
            doc_type: DocumentType::Policy,
            focus: &["Segmentation", "Boundary Protection", "Transmission Security"],
            traces_to: &[0, 1, 2],
        }],
        DomainName::SecureDevelopmentAcquisitionAndMaintenance => &[
            Blueprint {
                title: "Secure Development Policy",
                doc_type: DocumentType::Policy,
                focus: &["Security in the SDLC", "Code Review", "Environment Separation"],
                traces_to: &[0, 1, 3],
            },
            Blueprint {
                title: "Dependency and Patch Management Procedure",
                doc_type: DocumentType::Procedure,
                focus: &["Component Inventory", "Patch Timelines"],
                traces_to: &[2],
            },
        ],
        DomainName::SupplierAndThirdPartyRisk => &[Blueprint {
            title: "Third-Party Risk Management Policy",
            doc_type: DocumentType::Policy,
            focus: &["Due Diligence", "Contractual Requirements", "Ongoing Monitoring"],
            traces_to: &[0, 1, 2],
        }],
        DomainName::IncidentManagement => &[
            Blueprint {
                title: "Incident Response Policy",
                doc_type: DocumentType::Policy,
                focus: &["Incident Classification", "Notification Obligations"],
                traces_to: &[0, 2],
            },
            Blueprint {
                title: "Incident Response Procedure",
                doc_type: DocumentType::Procedure,
                focus: &["Detection and Triage", "Containment and Recovery", "Post-Incident Review"],
                traces_to: &[1, 2],
            },
        ],
        DomainName::BusinessContinuityAndDisasterRecovery => &[Blueprint {
            title: "Business Continuity and Disaster Recovery Policy",
            doc_type: DocumentType::Policy,
            focus: &["Recovery Objectives", "Plan Exercises"],
            traces_to: &[0, 1],
        }],
        DomainName::ComplianceAndAudit => &[Blueprint {
            title: "Compliance Management Policy",
            doc_type: DocumentType::Policy,
            focus: &["Obligations Register", "Internal Audit", "Records Retention"],
            traces_to: &[0, 1, 2],
        }],
        DomainName::PrivacyAndDataProtection => &[
            Blueprint {
                title: "Privacy and Data Protection Policy",
                doc_type: DocumentType::Policy,
                focus: &["Processing Principles", "Safeguarding Regulated Records"],
                traces_to: &[0, 2],
            },
            Blueprint {
                title: "Data Subject Request Procedure",
                doc_type: DocumentType::Procedure,
                focus: &["Request Intake", "Fulfillment Timelines"],
                traces_to: &[1],
            },
        ],
        DomainName::LoggingMonitoringAndVulnerabilityManagement => &[
            Blueprint {
                title: "Logging and Monitoring Policy",
                doc_type: DocumentType::Policy,
                focus: &["Log Collection", "Alerting"],
                traces_to: &[0, 1],
            },
            Blueprint {
                title: "Vulnerability Management Policy",
                doc_type: DocumentType::Policy,
                focus: &["Scanning", "Remediation SLAs"],
                traces_to: &[2],
            },
        ],
    }
}
