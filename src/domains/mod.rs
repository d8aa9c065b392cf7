//! The closed menu of governance domains.
//!
//! Selection only ever picks from this menu; nothing in the pipeline may
//! invent a new domain. Menu order is the canonical ordering for every
//! downstream queue so repeated runs stay deterministic.

mod selector;

pub use selector::select_domains;

use serde::{Deserialize, Serialize};

/// Fixed top-level governance areas, in menu order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainName {
    GovernanceAndSecurityOrganization,
    RiskManagement,
    AssetManagement,
    AccessControlAndIdentity,
    HumanResourcesSecurity,
    SecurityAwarenessAndTraining,
    CryptographyAndKeyManagement,
    PhysicalAndEnvironmentalSecurity,
    OperationsSecurity,
    NetworkAndCommunicationsSecurity,
    SecureDevelopmentAcquisitionAndMaintenance,
    SupplierAndThirdPartyRisk,
    IncidentManagement,
    BusinessContinuityAndDisasterRecovery,
    ComplianceAndAudit,
    PrivacyAndDataProtection,
    LoggingMonitoringAndVulnerabilityManagement,
}

/// The complete menu, in canonical order.
pub const DOMAIN_MENU: [DomainName; 17] = [
    DomainName::GovernanceAndSecurityOrganization,
    DomainName::RiskManagement,
    DomainName::AssetManagement,
    DomainName::AccessControlAndIdentity,
    DomainName::HumanResourcesSecurity,
    DomainName::SecurityAwarenessAndTraining,
    DomainName::CryptographyAndKeyManagement,
    DomainName::PhysicalAndEnvironmentalSecurity,
    DomainName::OperationsSecurity,
    DomainName::NetworkAndCommunicationsSecurity,
    DomainName::SecureDevelopmentAcquisitionAndMaintenance,
    DomainName::SupplierAndThirdPartyRisk,
    DomainName::IncidentManagement,
    DomainName::BusinessContinuityAndDisasterRecovery,
    DomainName::ComplianceAndAudit,
    DomainName::PrivacyAndDataProtection,
    DomainName::LoggingMonitoringAndVulnerabilityManagement,
];

impl DomainName {
    /// Human-readable title used in document categories and reports.
    pub fn title(&self) -> &'static str {
        match self {
            DomainName::GovernanceAndSecurityOrganization => "Governance & Security Organization",
            DomainName::RiskManagement => "Risk Management",
            DomainName::AssetManagement => "Asset Management",
            DomainName::AccessControlAndIdentity => "Access Control & Identity",
            DomainName::HumanResourcesSecurity => "Human Resources Security",
            DomainName::SecurityAwarenessAndTraining => "Security Awareness & Training",
            DomainName::CryptographyAndKeyManagement => "Cryptography & Key Management",
            DomainName::PhysicalAndEnvironmentalSecurity => "Physical & Environmental Security",
            DomainName::OperationsSecurity => "Operations Security",
            DomainName::NetworkAndCommunicationsSecurity => "Network & Communications Security",
            DomainName::SecureDevelopmentAcquisitionAndMaintenance => {
                "Secure Development, Acquisition & Maintenance"
            }
            DomainName::SupplierAndThirdPartyRisk => "Supplier & Third-Party Risk",
            DomainName::IncidentManagement => "Incident Management",
            DomainName::BusinessContinuityAndDisasterRecovery => {
                "Business Continuity & Disaster Recovery"
            }
            DomainName::ComplianceAndAudit => "Compliance & Audit",
            DomainName::PrivacyAndDataProtection => "Privacy & Data Protection",
            DomainName::LoggingMonitoringAndVulnerabilityManagement => {
                "Logging, Monitoring & Vulnerability Management"
            }
        }
    }

    /// Position in the canonical menu; drives queue and report ordering.
    pub fn menu_index(&self) -> usize {
        DOMAIN_MENU
            .iter()
            .position(|name| name == self)
            .unwrap_or(DOMAIN_MENU.len())
    }
}

/// A selected governance area with its justification and obligations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    pub name: DomainName,
    /// References the concrete profile facts that triggered inclusion.
    pub justification: String,
    /// Ordered requirement statements the decomposer expands into
    /// document specifications.
    pub high_level_requirements: Vec<String>,
    /// Named control sections of the applicable compliance frameworks.
    pub compliance_citations: Vec<String>,
}

impl Domain {
    pub fn new(name: DomainName, justification: impl Into<String>) -> Self {
        Self {
            name,
            justification: justification.into(),
            high_level_requirements: Vec::new(),
            compliance_citations: Vec::new(),
        }
    }

    pub fn with_requirements(mut self, requirements: &[&str]) -> Self {
        self.high_level_requirements = requirements.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_citations(mut self, citations: &[&str]) -> Self {
        self.compliance_citations = citations.iter().map(|c| c.to_string()).collect();
        self
    }
}
