//! Action → compliance impact classification.

use std::collections::{BTreeMap, HashMap};

use evolv_contracts::{
    audit::{AuditAction, ComplianceImpact},
    error::{EvolvError, EvolvResult},
};

const BUILTIN: [(AuditAction, ComplianceImpact); 23] = [
    (AuditAction::SearchKnowledgeBase, ComplianceImpact::ReferenceQuery),
    (AuditAction::UrsGenerated, ComplianceImpact::GxpDocumentation),
    (AuditAction::UrsGenerationFailed, ComplianceImpact::GxpDocumentation),
    (AuditAction::UrsTransformedToUrFr, ComplianceImpact::GxpDocumentation),
    (AuditAction::DocumentIngested, ComplianceImpact::DataIntegrity),
    (AuditAction::DocumentIngestionFailed, ComplianceImpact::DataIntegrity),
    (AuditAction::BatchIngestionCompleted, ComplianceImpact::DataIntegrity),
    (AuditAction::GapAnalysisCompleted, ComplianceImpact::RegulatoryCompliance),
    (AuditAction::GapAnalysisFailed, ComplianceImpact::RegulatoryCompliance),
    (AuditAction::UrsVerified, ComplianceImpact::RegulatoryCompliance),
    (AuditAction::UrsBatchVerified, ComplianceImpact::RegulatoryCompliance),
    (AuditAction::RegVersionChangeDetected, ComplianceImpact::RegulatoryCompliance),
    (AuditAction::RiskAssessmentCompleted, ComplianceImpact::PatientSafety),
    (AuditAction::TestingStrategyDetermined, ComplianceImpact::ValidationEvidence),
    (AuditAction::TestScriptGenerated, ComplianceImpact::ValidationEvidence),
    (AuditAction::TestScriptGenerationFailed, ComplianceImpact::ValidationEvidence),
    (AuditAction::TestBatchGenerated, ComplianceImpact::ValidationEvidence),
    (AuditAction::RtmGenerated, ComplianceImpact::ValidationEvidence),
    (AuditAction::ChangeRequestReceived, ComplianceImpact::ChangeControl),
    (AuditAction::ChangeRequestAssessed, ComplianceImpact::ChangeControl),
    (AuditAction::ChangeRequestFailed, ComplianceImpact::ChangeControl),
    (AuditAction::DocumentSignOff, ComplianceImpact::ElectronicSignature),
    (AuditAction::ComplianceException, ComplianceImpact::ComplianceException),
];

/// Maps actions to the regulatory category recorded on their rows.
///
/// Classification is total: an action with no entry is `Unclassified`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpactMap {
    table: HashMap<AuditAction, ComplianceImpact>,
}

impl ImpactMap {
    /// The built-in GxP table.
    pub fn builtin() -> Self {
        Self {
            table: BUILTIN.into_iter().collect(),
        }
    }

    /// A map with no entries; every action classifies as `Unclassified`.
    pub fn empty() -> Self {
        Self { table: HashMap::new() }
    }

    pub fn classify(&self, action: &AuditAction) -> ComplianceImpact {
        self.table
            .get(action)
            .copied()
            .unwrap_or(ComplianceImpact::Unclassified)
    }

    pub fn insert(&mut self, action: AuditAction, impact: ComplianceImpact) {
        self.table.insert(action, impact);
    }

    /// Apply `ACTION_TAG = "Impact Label"` overrides.
    ///
    /// # Errors
    ///
    /// `ConfigError` naming the first label that is not a known impact.
    pub fn apply_overrides(&mut self, overrides: &BTreeMap<String, String>) -> EvolvResult<()> {
        for (tag, label) in overrides {
            let impact = ComplianceImpact::from_label(label).ok_or_else(|| EvolvError::ConfigError {
                reason: format!("impact for '{tag}' has unknown label '{label}'"),
            })?;
            self.insert(AuditAction::parse(tag), impact);
        }
        Ok(())
    }
}

impl Default for ImpactMap {
    fn default() -> Self {
        Self::builtin()
    }
}
