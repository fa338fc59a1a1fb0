//! # evolv-agents
//!
//! Decision-producing agents for the EVOLV compliance core.
//!
//! Each agent computes a decision with the pure engines and releases it only
//! after the audit ledger has accepted it, through a shared
//! [`evolv_core::DecisionRecorder`]:
//!
//! 1. **RiskStrategist**: change-request intake, GAMP 5 risk assessment,
//!    CSA testing strategy.
//! 2. **VerificationAgent**: requirement documents against the regulatory
//!    knowledge base, single and batch.
//! 3. **SignOff**: SHA-256 sealed electronic signatures.
//!
//! [`mock_data`] provides a fictional in-memory knowledge base and sample
//! requirement documents for the demo and tests.

use std::collections::BTreeMap;

use serde_json::Value;

pub mod mock_data;
pub mod risk_strategist;
pub mod sign_off;
pub mod verification_agent;

pub use risk_strategist::{ChangeRequest, RiskStrategist};
pub use sign_off::{document_digest, SignOff, SignOffRecord};
pub use verification_agent::{BatchVerification, VerificationAgent};

/// Build a trace mapping from literal pairs.
pub(crate) fn fields<const N: usize>(pairs: [(&str, Value); N]) -> BTreeMap<String, Value> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use evolv_audit::AuditLedger;
    use evolv_contracts::{
        audit::{AppendReceipt, AuditAction, AuditEntry, ComplianceImpact},
        error::{EvolvError, EvolvResult},
        risk::{RiskLevel, TestingStrategy},
        verify::Verdict,
    };
    use evolv_core::{traits::AuditSink, DecisionRecorder};
    use evolv_verify::ComplianceRuleEngine;

    use super::*;
    use crate::mock_data::{
        audit_trail_requirement, humidity_requirement, probe_requirement, sample_requirements, terms,
        MockKnowledgeBase, GAMP5_VERSION,
    };

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn ledger() -> Arc<AuditLedger> {
        Arc::new(AuditLedger::in_memory())
    }

    fn recorder(ledger: &Arc<AuditLedger>) -> DecisionRecorder {
        let sink: Arc<dyn AuditSink> = ledger.clone();
        DecisionRecorder::new(sink)
    }

    fn actions(ledger: &AuditLedger) -> Vec<String> {
        ledger
            .records()
            .unwrap()
            .into_iter()
            .map(|r| r.action.to_string())
            .collect()
    }

    fn verifier(ledger: &Arc<AuditLedger>, kb: MockKnowledgeBase) -> VerificationAgent {
        VerificationAgent::new(ComplianceRuleEngine::default(), Arc::new(kb), recorder(ledger))
    }

    struct FailingSink;

    impl AuditSink for FailingSink {
        fn append(&self, _entry: &AuditEntry) -> EvolvResult<AppendReceipt> {
            Err(EvolvError::AuditWriteFailed {
                reason: "trail unavailable".to_string(),
            })
        }
    }

    // ── Risk strategist ───────────────────────────────────────────────────────

    #[test]
    fn critical_normal_change_is_forced_high() {
        let ledger = ledger();
        let strategist = RiskStrategist::new(recorder(&ledger));

        let audited = strategist
            .assess(&ChangeRequest::new("CR-1001", "critical", "normal"))
            .unwrap();

        assert_eq!(audited.value.priority_number, 12);
        assert_eq!(audited.value.risk_level, RiskLevel::High);
        assert!(audited.value.severity_override);
        assert_eq!(audited.value.testing_strategy, TestingStrategy::RigorousScripted);
        assert_eq!(audited.receipt.record.compliance_impact, ComplianceImpact::PatientSafety);

        let archive = ledger
            .load_archive(&evolv_audit::archive_name(&audited.receipt.record))
            .unwrap();
        assert_eq!(archive.outputs["threshold_level"], "Medium");
        assert_eq!(archive.outputs["risk_level"], "High");
        assert_eq!(archive.outputs["severity_override"], true);
        assert!(archive.steps.iter().any(|s| s.contains("forced from Medium to High")));
    }

    #[test]
    fn change_request_intake_writes_rows_in_order() {
        let ledger = ledger();
        let strategist = RiskStrategist::new(recorder(&ledger));

        let request = ChangeRequest::new("CR-1002", "minor", "routine")
            .with_detectability("easy")
            .requested_by("change.manager");
        let audited = strategist.process_change_request(&request).unwrap();

        assert_eq!(audited.value.priority_number, 1);
        assert_eq!(audited.value.risk_level, RiskLevel::Low);
        assert_eq!(
            actions(&ledger),
            ["CHANGE_REQUEST_RECEIVED", "RISK_ASSESSMENT_COMPLETED", "CHANGE_REQUEST_ASSESSED"]
        );
        assert!(ledger.records().unwrap().iter().all(|r| r.user_id == "change.manager"));
    }

    #[test]
    fn unmapped_label_is_audited_as_failed_and_returned() {
        let ledger = ledger();
        let strategist = RiskStrategist::new(recorder(&ledger));

        let err = strategist
            .process_change_request(&ChangeRequest::new("CR-1003", "catastrophic", "normal"))
            .unwrap_err();

        assert!(matches!(err, EvolvError::InvalidCategory { ref input, .. } if input == "catastrophic"));
        assert_eq!(actions(&ledger), ["CHANGE_REQUEST_RECEIVED", "CHANGE_REQUEST_FAILED"]);
    }

    #[test]
    fn strategy_decision_is_audited() {
        let ledger = ledger();
        let strategist = RiskStrategist::new(recorder(&ledger));

        let audited = strategist.determine_strategy(RiskLevel::Medium).unwrap();
        assert_eq!(audited.value, TestingStrategy::Hybrid);
        assert_eq!(
            audited.receipt.record.decision_logic,
            "Risk=Medium -> Strategy=Hybrid Testing (Scripted + Unscripted)"
        );
        assert_eq!(audited.receipt.record.compliance_impact, ComplianceImpact::ValidationEvidence);
    }

    #[test]
    fn failed_audit_discards_assessment() {
        let strategist = RiskStrategist::new(DecisionRecorder::new(Arc::new(FailingSink)));
        let err = strategist
            .assess(&ChangeRequest::new("CR-1004", "high", "emergency"))
            .unwrap_err();
        assert!(matches!(err, EvolvError::AuditWriteFailed { .. }));
    }

    #[test]
    fn change_request_deserializes_with_default_detectability() {
        let request: ChangeRequest = serde_json::from_value(json!({
            "cr_id": "CR-1005",
            "system_criticality": "High",
            "change_type": "Standard"
        }))
        .unwrap();
        assert_eq!(request.detectability, "medium");
        assert!(request.requested_by.is_none());
    }

    // ── Verification agent ────────────────────────────────────────────────────

    #[test]
    fn grounded_document_is_approved_and_archived() {
        let ledger = ledger();
        let agent = verifier(&ledger, MockKnowledgeBase::gamp5());

        let audited = agent.verify(&humidity_requirement()).unwrap();

        assert_eq!(audited.value.verdict, Verdict::Approved);
        assert_eq!(audited.receipt.record.action, AuditAction::UrsVerified);
        assert!(audited.receipt.archive.is_some());
        assert!(audited.receipt.record.decision_logic.starts_with("APPROVED URS-7.1"));
        assert_eq!(actions(&ledger), ["REG_VERSION_CHANGE_DETECTED", "URS_VERIFIED"]);
    }

    #[test]
    fn contradicting_document_is_a_compliance_exception() {
        let ledger = ledger();
        let agent = verifier(&ledger, MockKnowledgeBase::gamp5()).with_known_versions([GAMP5_VERSION]);

        let audited = agent.verify(&probe_requirement()).unwrap();

        assert_eq!(audited.value.verdict, Verdict::Rejected);
        let failed: Vec<&str> = audited.value.failures().map(|f| f.check_name.as_str()).collect();
        assert_eq!(failed, ["Criticality Alignment", "Contradiction Scan"]);

        let record = &audited.receipt.record;
        assert_eq!(record.action, AuditAction::ComplianceException);
        assert_eq!(record.compliance_impact, ComplianceImpact::ComplianceException);
        assert!(record.decision_logic.contains("skip validation"));
        assert_eq!(actions(&ledger), ["COMPLIANCE_EXCEPTION"]);
    }

    #[test]
    fn high_criticality_document_is_exempt_from_alignment() {
        let ledger = ledger();
        let agent = verifier(&ledger, MockKnowledgeBase::gamp5());
        let audited = agent.verify(&audit_trail_requirement()).unwrap();
        assert_eq!(audited.value.verdict, Verdict::Approved);
    }

    #[test]
    fn version_change_is_logged_once_per_agent() {
        let ledger = ledger();
        let agent = verifier(&ledger, MockKnowledgeBase::gamp5());

        agent.verify(&humidity_requirement()).unwrap();
        agent.verify(&audit_trail_requirement()).unwrap();

        let detected = actions(&ledger)
            .iter()
            .filter(|a| *a == "REG_VERSION_CHANGE_DETECTED")
            .count();
        assert_eq!(detected, 1);
    }

    #[test]
    fn invalid_document_writes_nothing() {
        let ledger = ledger();
        let agent = verifier(&ledger, MockKnowledgeBase::gamp5());

        let err = agent.verify(&json!({ "URS_ID": "URS-0" })).unwrap_err();
        assert!(matches!(err, EvolvError::InvalidDocument { .. }));
        assert!(ledger.records().unwrap().is_empty());
    }

    #[test]
    fn empty_knowledge_base_refuses_verdict() {
        let ledger = ledger();
        let agent = verifier(&ledger, MockKnowledgeBase::empty());

        let err = agent.verify(&humidity_requirement()).unwrap_err();
        assert!(matches!(err, EvolvError::GroundingInsufficient { .. }));
        assert!(ledger.records().unwrap().is_empty());
    }

    #[test]
    fn batch_counts_and_summary_row() {
        let ledger = ledger();
        let agent = verifier(&ledger, MockKnowledgeBase::gamp5());

        let mut docs = sample_requirements();
        docs.push(json!({ "URS_ID": "URS-0" }));
        let audited = agent.verify_batch(&docs).unwrap();

        assert_eq!(audited.value.results.len(), 4);
        assert_eq!(audited.value.approved, 2);
        assert_eq!(audited.value.rejected, 1);
        assert_eq!(audited.value.errored, 1);
        assert_eq!(audited.receipt.record.action, AuditAction::UrsBatchVerified);
        assert_eq!(actions(&ledger).last().map(String::as_str), Some("URS_BATCH_VERIFIED"));
    }

    // ── Sign-off ──────────────────────────────────────────────────────────────

    #[test]
    fn sign_off_records_signer_and_digest() {
        let ledger = ledger();
        let sign_off = SignOff::new(recorder(&ledger));

        let audited = sign_off
            .sign_bytes("Health_Report.txt", b"abc", " Dana Reviewer ", "Review and Approval")
            .unwrap();

        assert_eq!(
            audited.value.document_sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        let record = &audited.receipt.record;
        assert_eq!(record.user_id, "Dana Reviewer");
        assert_eq!(record.action, AuditAction::DocumentSignOff);
        assert_eq!(record.compliance_impact, ComplianceImpact::ElectronicSignature);
        assert!(record.decision_logic.contains("Meaning: Review and Approval"));
        assert!(record.decision_logic.contains(&audited.value.signature_id.to_string()));
    }

    #[test]
    fn sign_off_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        std::fs::write(&path, b"abc").unwrap();

        let ledger = ledger();
        let audited = SignOff::new(recorder(&ledger))
            .sign_file(&path, "QA Lead", "Verified")
            .unwrap();
        assert_eq!(audited.value.document, "report.txt");
        assert_eq!(audited.value.document_sha256, document_digest(b"abc"));
    }

    #[test]
    fn empty_signer_is_rejected_before_any_write() {
        let ledger = ledger();
        let err = SignOff::new(recorder(&ledger))
            .sign_bytes("report.txt", b"abc", "   ", "Authored")
            .unwrap_err();
        match err {
            EvolvError::InvalidDocument { fields, .. } => assert_eq!(fields, ["signer"]),
            other => panic!("expected InvalidDocument, got {other:?}"),
        }
        assert!(ledger.records().unwrap().is_empty());
    }

    // ── Mock knowledge base ───────────────────────────────────────────────────

    #[test]
    fn mock_terms_drop_stopwords_and_plurals() {
        let t = terms("The system shall record excursions and probes.");
        let expected: Vec<&str> = vec!["excursion", "probe", "record"];
        assert_eq!(t.iter().map(String::as_str).collect::<Vec<_>>(), expected);
    }
}
