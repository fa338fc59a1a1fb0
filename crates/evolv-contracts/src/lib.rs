//! # evolv-contracts
//!
//! Shared types and error contracts for the EVOLV compliance core.
//!
//! Every crate in the workspace imports from here. No business logic lives in
//! this crate, only data definitions, boundary validation of reasoning
//! traces, and the error type.

pub mod audit;
pub mod error;
pub mod risk;
pub mod trace;
pub mod verify;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use audit::{AuditAction, ComplianceImpact};
    use error::EvolvError;
    use trace::ReasoningTrace;
    use verify::{CheckStatus, Citation, Criticality, Finding, ReferencePassage, Verdict, VerificationResult};

    // ── AuditAction ──────────────────────────────────────────────────────────

    #[test]
    fn audit_action_known_tags_parse_back() {
        for tag in ["URS_VERIFIED", "COMPLIANCE_EXCEPTION", "RISK_ASSESSMENT_COMPLETED"] {
            let action = AuditAction::parse(tag);
            assert!(!matches!(action, AuditAction::Other(_)), "{tag} should be known");
            assert_eq!(action.as_str(), tag);
        }
    }

    #[test]
    fn audit_action_unknown_tag_is_kept_verbatim() {
        let action = AuditAction::parse("VENDOR_AUDIT_SCHEDULED");
        assert_eq!(action, AuditAction::Other("VENDOR_AUDIT_SCHEDULED".to_string()));
        assert_eq!(action.to_string(), "VENDOR_AUDIT_SCHEDULED");
    }

    #[test]
    fn audit_action_serializes_as_tag() {
        let json = serde_json::to_string(&AuditAction::DocumentSignOff).unwrap();
        assert_eq!(json, "\"DOCUMENT_SIGN_OFF\"");
        let decoded: AuditAction = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, AuditAction::DocumentSignOff);
    }

    // ── ComplianceImpact ─────────────────────────────────────────────────────

    #[test]
    fn compliance_impact_label_lookup() {
        assert_eq!(
            ComplianceImpact::from_label("Patient Safety"),
            Some(ComplianceImpact::PatientSafety)
        );
        assert_eq!(ComplianceImpact::from_label("patient safety"), None);
        assert_eq!(ComplianceImpact::Unclassified.to_string(), "Unclassified");
    }

    // ── ReasoningTrace ───────────────────────────────────────────────────────

    #[test]
    fn trace_from_value_accepts_well_formed_payload() {
        let trace = ReasoningTrace::from_value(json!({
            "inputs": { "urs_id": "URS-7.1" },
            "steps": ["retrieved 3 passages", "ran 3 checks"],
            "outputs": { "verdict": "Approved" }
        }))
        .unwrap();

        assert_eq!(trace.steps.len(), 2);
        assert_eq!(trace.inputs["urs_id"], json!("URS-7.1"));
    }

    #[test]
    fn trace_missing_part_is_named() {
        let err = ReasoningTrace::from_value(json!({
            "inputs": {},
            "steps": []
        }))
        .unwrap_err();

        match err {
            EvolvError::InvalidTrace { part, .. } => assert_eq!(part, "outputs"),
            other => panic!("expected InvalidTrace, got {other:?}"),
        }
    }

    #[test]
    fn trace_steps_must_be_strings() {
        let err = ReasoningTrace::from_value(json!({
            "inputs": {},
            "steps": ["ok", 42],
            "outputs": {}
        }))
        .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("steps"), "message should name the part: {msg}");
        assert!(msg.contains("entry 1"), "message should name the entry: {msg}");
    }

    #[test]
    fn trace_rejects_non_mapping_inputs_and_extra_keys() {
        let err = ReasoningTrace::from_value(json!({
            "inputs": ["not", "a", "map"],
            "steps": [],
            "outputs": {}
        }))
        .unwrap_err();
        assert!(matches!(err, EvolvError::InvalidTrace { ref part, .. } if part == "inputs"));

        let err = ReasoningTrace::from_value(json!({
            "inputs": {},
            "steps": [],
            "outputs": {},
            "confidence": 0.9
        }))
        .unwrap_err();
        assert!(matches!(err, EvolvError::InvalidTrace { ref part, .. } if part == "confidence"));
    }

    // ── Verification types ───────────────────────────────────────────────────

    #[test]
    fn criticality_parse_is_case_insensitive() {
        assert_eq!(Criticality::parse("HIGH"), Some(Criticality::High));
        assert_eq!(Criticality::parse(" medium "), Some(Criticality::Medium));
        assert_eq!(Criticality::parse("severe"), None);
    }

    #[test]
    fn citation_display_includes_version_when_present() {
        let passage = ReferencePassage {
            text: "Computerized systems shall be validated.".to_string(),
            source_label: "GAMP 5".to_string(),
            page_number: 42,
            similarity_score: 0.81,
            version_tag: Some("2nd Ed.".to_string()),
        };
        let rendered = Citation::from_passage(&passage).to_string();
        assert!(rendered.starts_with("Per GAMP 5 [2nd Ed.] (p.42"));
    }

    #[test]
    fn rejection_reason_lists_only_failed_checks() {
        let result = VerificationResult {
            document_id: "URS-1".to_string(),
            verdict: Verdict::Rejected,
            findings: vec![
                Finding {
                    check_name: "Rationale Relevance".to_string(),
                    status: CheckStatus::Pass,
                    detail: "fine".to_string(),
                    citation: None,
                },
                Finding {
                    check_name: "Contradiction Scan".to_string(),
                    status: CheckStatus::Fail,
                    detail: "contradiction".to_string(),
                    citation: None,
                },
            ],
        };

        assert_eq!(result.rejection_reason(), "Contradiction Scan: contradiction");
        assert!(result.is_rejected());
    }

    // ── EvolvError display messages ──────────────────────────────────────────

    #[test]
    fn error_invalid_category_display() {
        let err = EvolvError::InvalidCategory {
            field: "severity".to_string(),
            input: "catastrophic".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("severity"));
        assert!(msg.contains("catastrophic"));
    }

    #[test]
    fn error_invalid_document_lists_fields() {
        let err = EvolvError::InvalidDocument {
            fields: vec!["URS_ID".to_string(), "Criticality".to_string()],
            reason: "missing required fields".to_string(),
        };
        assert!(err.to_string().contains("URS_ID, Criticality"));
    }

    #[test]
    fn error_audit_write_failed_display() {
        let err = EvolvError::AuditWriteFailed {
            reason: "disk full".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("audit write failed"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn error_grounding_insufficient_display() {
        let err = EvolvError::GroundingInsufficient {
            document_id: "URS-9".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("no regulatory context available"));
        assert!(msg.contains("URS-9"));
    }
}
