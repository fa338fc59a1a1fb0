//! Audit ledger types.
//!
//! `AuditEntry` is what a decision-producing component hands to the ledger.
//! `AuditRecord` is the immutable row the ledger persists, and
//! `AppendReceipt` is what the caller gets back to correlate with.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EvolvError;
use crate::trace::ReasoningTrace;

/// The identity recorded when a caller supplies no user.
pub const SYSTEM_USER: &str = "SYSTEM";

// ── AuditAction ──────────────────────────────────────────────────────────────

/// The tag describing what happened.
///
/// The known set covers every action the agents emit; `Other` keeps the set
/// open so a new event is still logged before it has a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AuditAction {
    SearchKnowledgeBase,
    UrsGenerated,
    UrsGenerationFailed,
    UrsTransformedToUrFr,
    DocumentIngested,
    DocumentIngestionFailed,
    BatchIngestionCompleted,
    GapAnalysisCompleted,
    GapAnalysisFailed,
    RiskAssessmentCompleted,
    TestingStrategyDetermined,
    TestScriptGenerated,
    TestScriptGenerationFailed,
    TestBatchGenerated,
    RtmGenerated,
    ChangeRequestReceived,
    ChangeRequestAssessed,
    ChangeRequestFailed,
    DocumentSignOff,
    UrsVerified,
    UrsBatchVerified,
    ComplianceException,
    RegVersionChangeDetected,
    /// Any tag outside the known set, stored verbatim.
    Other(String),
}

impl AuditAction {
    const KNOWN: [(AuditAction, &'static str); 23] = [
        (AuditAction::SearchKnowledgeBase, "SEARCH_KNOWLEDGE_BASE"),
        (AuditAction::UrsGenerated, "URS_GENERATED"),
        (AuditAction::UrsGenerationFailed, "URS_GENERATION_FAILED"),
        (AuditAction::UrsTransformedToUrFr, "URS_TRANSFORMED_TO_UR_FR"),
        (AuditAction::DocumentIngested, "DOCUMENT_INGESTED"),
        (AuditAction::DocumentIngestionFailed, "DOCUMENT_INGESTION_FAILED"),
        (AuditAction::BatchIngestionCompleted, "BATCH_INGESTION_COMPLETED"),
        (AuditAction::GapAnalysisCompleted, "GAP_ANALYSIS_COMPLETED"),
        (AuditAction::GapAnalysisFailed, "GAP_ANALYSIS_FAILED"),
        (AuditAction::RiskAssessmentCompleted, "RISK_ASSESSMENT_COMPLETED"),
        (AuditAction::TestingStrategyDetermined, "TESTING_STRATEGY_DETERMINED"),
        (AuditAction::TestScriptGenerated, "TEST_SCRIPT_GENERATED"),
        (AuditAction::TestScriptGenerationFailed, "TEST_SCRIPT_GENERATION_FAILED"),
        (AuditAction::TestBatchGenerated, "TEST_BATCH_GENERATED"),
        (AuditAction::RtmGenerated, "RTM_GENERATED"),
        (AuditAction::ChangeRequestReceived, "CHANGE_REQUEST_RECEIVED"),
        (AuditAction::ChangeRequestAssessed, "CHANGE_REQUEST_ASSESSED"),
        (AuditAction::ChangeRequestFailed, "CHANGE_REQUEST_FAILED"),
        (AuditAction::DocumentSignOff, "DOCUMENT_SIGN_OFF"),
        (AuditAction::UrsVerified, "URS_VERIFIED"),
        (AuditAction::UrsBatchVerified, "URS_BATCH_VERIFIED"),
        (AuditAction::ComplianceException, "COMPLIANCE_EXCEPTION"),
        (AuditAction::RegVersionChangeDetected, "REG_VERSION_CHANGE_DETECTED"),
    ];

    /// The persisted tag, e.g. `"URS_VERIFIED"`.
    pub fn as_str(&self) -> &str {
        if let AuditAction::Other(tag) = self {
            return tag.as_str();
        }
        Self::KNOWN
            .iter()
            .find(|(action, _)| action == self)
            .map(|(_, tag)| *tag)
            .unwrap_or("UNKNOWN")
    }

    /// Parse a persisted tag. Never fails: unknown tags become `Other`.
    pub fn parse(tag: &str) -> Self {
        Self::KNOWN
            .iter()
            .find(|(_, known)| *known == tag)
            .map(|(action, _)| action.clone())
            .unwrap_or_else(|| AuditAction::Other(tag.to_string()))
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl Serialize for AuditAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AuditAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::parse(&tag))
    }
}

// ── ComplianceImpact ─────────────────────────────────────────────────────────

/// The regulatory category an action falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComplianceImpact {
    #[serde(rename = "Reference Query")]
    ReferenceQuery,
    #[serde(rename = "GxP Documentation")]
    GxpDocumentation,
    #[serde(rename = "Data Integrity")]
    DataIntegrity,
    #[serde(rename = "Regulatory Compliance")]
    RegulatoryCompliance,
    #[serde(rename = "Patient Safety")]
    PatientSafety,
    #[serde(rename = "Validation Evidence")]
    ValidationEvidence,
    #[serde(rename = "Change Control")]
    ChangeControl,
    #[serde(rename = "Electronic Signature")]
    ElectronicSignature,
    #[serde(rename = "Compliance Exception")]
    ComplianceException,
    /// Assigned to actions with no entry in the impact table.
    #[serde(rename = "Unclassified")]
    Unclassified,
}

impl ComplianceImpact {
    const ALL: [ComplianceImpact; 10] = [
        ComplianceImpact::ReferenceQuery,
        ComplianceImpact::GxpDocumentation,
        ComplianceImpact::DataIntegrity,
        ComplianceImpact::RegulatoryCompliance,
        ComplianceImpact::PatientSafety,
        ComplianceImpact::ValidationEvidence,
        ComplianceImpact::ChangeControl,
        ComplianceImpact::ElectronicSignature,
        ComplianceImpact::ComplianceException,
        ComplianceImpact::Unclassified,
    ];

    /// Human-readable label as persisted in the ledger row.
    pub fn label(&self) -> &'static str {
        match self {
            ComplianceImpact::ReferenceQuery => "Reference Query",
            ComplianceImpact::GxpDocumentation => "GxP Documentation",
            ComplianceImpact::DataIntegrity => "Data Integrity",
            ComplianceImpact::RegulatoryCompliance => "Regulatory Compliance",
            ComplianceImpact::PatientSafety => "Patient Safety",
            ComplianceImpact::ValidationEvidence => "Validation Evidence",
            ComplianceImpact::ChangeControl => "Change Control",
            ComplianceImpact::ElectronicSignature => "Electronic Signature",
            ComplianceImpact::ComplianceException => "Compliance Exception",
            ComplianceImpact::Unclassified => "Unclassified",
        }
    }

    /// Look up an impact by its label (exact match).
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|impact| impact.label() == label)
    }
}

impl fmt::Display for ComplianceImpact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Entry / Record / Receipt ─────────────────────────────────────────────────

/// A decision summary submitted to the ledger.
///
/// The ledger stamps the time and derives the impact unless
/// `impact_override` is set.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    /// Component that produced the decision (e.g. "VerificationAgent").
    pub agent_name: String,
    pub action: AuditAction,
    /// Acting user; `None` records the ledger's default system identity.
    pub user_id: Option<String>,
    /// Human-readable justification for the decision.
    pub decision_logic: String,
    /// Replaces the impact derived from `action` for this entry only.
    pub impact_override: Option<ComplianceImpact>,
    /// Full reasoning behind the decision, archived alongside the row.
    pub trace: Option<ReasoningTrace>,
}

impl AuditEntry {
    /// Start an entry with no user, no override, and no trace.
    pub fn new(
        agent_name: impl Into<String>,
        action: AuditAction,
        decision_logic: impl Into<String>,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            action,
            user_id: None,
            decision_logic: decision_logic.into(),
            impact_override: None,
            trace: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_impact(mut self, impact: ComplianceImpact) -> Self {
        self.impact_override = Some(impact);
        self
    }

    pub fn with_trace(mut self, trace: ReasoningTrace) -> Self {
        self.trace = Some(trace);
        self
    }
}

/// One immutable ledger row.
///
/// Serde names match the persisted CSV header so rows can be read back with
/// the same type. The row's identity is its `integrity_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// RFC 3339 UTC timestamp, kept as the exact persisted text.
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "User_ID")]
    pub user_id: String,
    #[serde(rename = "Agent_Name")]
    pub agent_name: String,
    #[serde(rename = "Action_Performed")]
    pub action: AuditAction,
    #[serde(rename = "Decision_Logic")]
    pub decision_logic: String,
    /// SHA-256 over the six visible fields.
    #[serde(rename = "Reasoning_Hash")]
    pub integrity_hash: String,
    #[serde(rename = "Compliance_Impact")]
    pub compliance_impact: ComplianceImpact,
}

/// A ledger row exactly as read back from storage.
///
/// Every column stays raw text so an edited row can still be hashed and
/// reported rather than failing to parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRow {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "User_ID")]
    pub user_id: String,
    #[serde(rename = "Agent_Name")]
    pub agent_name: String,
    #[serde(rename = "Action_Performed")]
    pub action: String,
    #[serde(rename = "Decision_Logic")]
    pub decision_logic: String,
    #[serde(rename = "Reasoning_Hash")]
    pub integrity_hash: String,
    #[serde(rename = "Compliance_Impact")]
    pub compliance_impact: String,
}

impl From<&AuditRecord> for PersistedRow {
    fn from(record: &AuditRecord) -> Self {
        Self {
            timestamp: record.timestamp.clone(),
            user_id: record.user_id.clone(),
            agent_name: record.agent_name.clone(),
            action: record.action.as_str().to_string(),
            decision_logic: record.decision_logic.clone(),
            integrity_hash: record.integrity_hash.clone(),
            compliance_impact: record.compliance_impact.label().to_string(),
        }
    }
}

impl TryFrom<PersistedRow> for AuditRecord {
    type Error = EvolvError;

    fn try_from(row: PersistedRow) -> Result<Self, Self::Error> {
        let compliance_impact = ComplianceImpact::from_label(&row.compliance_impact).ok_or_else(|| {
            EvolvError::AuditReadFailed {
                reason: format!(
                    "row {} has unknown compliance impact '{}'",
                    row.integrity_hash, row.compliance_impact
                ),
            }
        })?;
        Ok(Self {
            action: AuditAction::parse(&row.action),
            timestamp: row.timestamp,
            user_id: row.user_id,
            agent_name: row.agent_name,
            decision_logic: row.decision_logic,
            integrity_hash: row.integrity_hash,
            compliance_impact,
        })
    }
}

/// Where a reasoning archive was stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArchiveLocation(pub String);

impl fmt::Display for ArchiveLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returned to the caller after a successful append.
#[derive(Debug, Clone)]
pub struct AppendReceipt {
    /// The row exactly as persisted.
    pub record: AuditRecord,
    /// Present when the entry carried a reasoning trace.
    pub archive: Option<ArchiveLocation>,
}

impl AppendReceipt {
    /// The row's integrity hash, used as the archive cross-reference.
    pub fn integrity_hash(&self) -> &str {
        &self.record.integrity_hash
    }
}
