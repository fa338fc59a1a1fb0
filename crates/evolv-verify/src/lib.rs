//! # evolv-verify
//!
//! Compliance rule engine for generated requirement documents.
//!
//! This crate provides [`engine::ComplianceRuleEngine`], which verifies a
//! requirement document against ranked regulatory passages supplied by a
//! [`evolv_core::traits::Retriever`]:
//!
//! 1. **Boundary**: the raw JSON document is validated (presence + JSON
//!    Schema) before any retrieval call.
//! 2. **Checks**: criticality alignment, rationale relevance, and
//!    contradiction scan, driven by [`rules::RuleTables`].
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use evolv_verify::{engine::ComplianceRuleEngine, rules::RuleTables};
//!
//! let engine = ComplianceRuleEngine::new(RuleTables::gamp5());
//! let result = engine.verify_document(&raw_urs, &knowledge_base)?;
//! if result.is_rejected() {
//!     eprintln!("{}", result.rejection_reason());
//! }
//! ```

pub mod document;
pub mod engine;
pub mod rules;

pub use document::parse_document;
pub use engine::{ComplianceRuleEngine, RELEVANCE_THRESHOLD};
pub use rules::{ComplianceDomain, ContradictionRule, RuleTables};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use evolv_contracts::{
        error::{EvolvError, EvolvResult},
        verify::{CheckStatus, Criticality, ReferencePassage, RequirementDocument, Verdict},
    };
    use evolv_core::traits::Retriever;

    use super::*;
    use crate::engine::{CONTRADICTION_SCAN, CRITICALITY_ALIGNMENT, RATIONALE_RELEVANCE};

    // ── Builder helpers ───────────────────────────────────────────────────────

    fn passage(text: &str, score: f64) -> ReferencePassage {
        ReferencePassage {
            text: text.to_string(),
            source_label: "GAMP 5".to_string(),
            page_number: 12,
            similarity_score: score,
            version_tag: None,
        }
    }

    fn document(statement: &str, criticality: Criticality) -> RequirementDocument {
        RequirementDocument {
            urs_id: "URS-7.1".to_string(),
            requirement_statement: statement.to_string(),
            criticality,
            regulatory_rationale: "Per GAMP 5 Appendix D".to_string(),
        }
    }

    fn engine() -> ComplianceRuleEngine {
        ComplianceRuleEngine::new(RuleTables::gamp5())
    }

    /// Returns a fixed passage list and counts how often it was queried.
    struct FixedRetriever {
        passages: Vec<ReferencePassage>,
        calls: AtomicUsize,
    }

    impl FixedRetriever {
        fn new(passages: Vec<ReferencePassage>) -> Self {
            Self { passages, calls: AtomicUsize::new(0) }
        }
    }

    impl Retriever for FixedRetriever {
        fn query(&self, _text: &str, top_k: usize, min_score: f64) -> EvolvResult<Vec<ReferencePassage>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .passages
                .iter()
                .filter(|p| p.similarity_score >= min_score)
                .take(top_k)
                .cloned()
                .collect())
        }
    }

    // ── Rationale relevance ───────────────────────────────────────────────────

    /// The threshold is an inclusive lower bound.
    #[test]
    fn relevance_threshold_is_inclusive() {
        let at = engine().check_rationale_relevance(&[passage("warehouse monitoring", 0.45)]);
        assert_eq!(at.status, CheckStatus::Pass, "{}", at.detail);

        let below = engine().check_rationale_relevance(&[passage("warehouse monitoring", 0.449)]);
        assert_eq!(below.status, CheckStatus::Fail, "{}", below.detail);
        assert!(below.citation.is_some(), "failures still cite the top passage");
    }

    #[test]
    fn relevance_cites_best_passage() {
        let finding = engine().check_rationale_relevance(&[
            passage("first", 0.50),
            passage("second", 0.90),
            passage("third", 0.60),
        ]);
        let citation = finding.citation.unwrap();
        assert_eq!(citation.similarity_score, 0.90);
        assert_eq!(citation.excerpt, "second");
    }

    // ── Contradiction scan ────────────────────────────────────────────────────

    /// A requirement phrase without a grounding passage is not a contradiction.
    #[test]
    fn contradiction_requires_grounding_passage() {
        let finding = engine().check_contradictions("The system may skip validation.", &[]);
        assert_eq!(finding.status, CheckStatus::Pass);
        assert!(finding.citation.is_none());

        let finding = engine().check_contradictions(
            "The system may skip validation.",
            &[passage("Computerized systems shall be validated before use.", 0.7)],
        );
        assert_eq!(finding.status, CheckStatus::Fail);
        assert!(finding.detail.contains("skip validation"));
        assert!(finding.detail.contains("shall be validated") || finding.detail.contains("validation"));
        assert_eq!(finding.citation.unwrap().page_number, 12);
    }

    #[test]
    fn contradiction_keyword_alone_passes() {
        let finding = engine().check_contradictions(
            "The system shall record temperature every minute.",
            &[passage("An audit trail shall be maintained.", 0.8)],
        );
        assert_eq!(finding.status, CheckStatus::Pass);
        assert!(finding.citation.is_some(), "pass findings still cite a passage");
    }

    #[test]
    fn contradiction_domains_are_independent() {
        let tables = RuleTables::gamp5();
        assert_eq!(tables.rules_for(ComplianceDomain::AuditTrail).count(), 1);

        let finding = engine().check_contradictions(
            "Records are kept WITHOUT AUDIT TRAIL.",
            &[passage("Electronic records require traceability.", 0.6)],
        );
        assert_eq!(finding.status, CheckStatus::Fail);
        assert!(finding.detail.contains("AuditTrail"));
    }

    // ── Criticality alignment ─────────────────────────────────────────────────

    #[test]
    fn low_criticality_with_indicator_fails_naming_indicator() {
        let finding = engine().check_criticality_alignment(
            &document("Track warehouse temperature.", Criticality::Low),
            &[passage("Deviations may affect patient safety.", 0.7)],
        );
        assert_eq!(finding.status, CheckStatus::Fail);
        assert!(finding.detail.contains("'patient'"), "{}", finding.detail);
        assert!(finding.detail.contains("GAMP 5 p.12"), "{}", finding.detail);
    }

    #[test]
    fn high_criticality_is_exempt() {
        let finding = engine().check_criticality_alignment(
            &document("Track warehouse temperature.", Criticality::High),
            &[passage("Deviations may affect patient safety.", 0.7)],
        );
        assert_eq!(finding.status, CheckStatus::Pass);
    }

    #[test]
    fn medium_criticality_without_indicator_passes() {
        let finding = engine().check_criticality_alignment(
            &document("Track warehouse temperature.", Criticality::Medium),
            &[passage("Storage conditions should be monitored.", 0.7)],
        );
        assert_eq!(finding.status, CheckStatus::Pass);
    }

    // ── Verdict ───────────────────────────────────────────────────────────────

    #[test]
    fn all_checks_pass_approves() {
        let result = engine()
            .verify(
                &document("Track warehouse temperature.", Criticality::Medium),
                &[passage("Storage conditions should be monitored.", 0.62)],
            )
            .unwrap();

        assert_eq!(result.verdict, Verdict::Approved);
        assert_eq!(result.findings.len(), 3);
        let names: Vec<&str> = result.findings.iter().map(|f| f.check_name.as_str()).collect();
        assert_eq!(names, [CRITICALITY_ALIGNMENT, RATIONALE_RELEVANCE, CONTRADICTION_SCAN]);
        assert!(result.findings.iter().all(|f| f.citation.is_some()));
    }

    #[test]
    fn any_failure_rejects() {
        let result = engine()
            .verify(
                &document("Track warehouse temperature.", Criticality::Medium),
                &[passage("Storage conditions should be monitored.", 0.40)],
            )
            .unwrap();

        assert_eq!(result.verdict, Verdict::Rejected);
        assert!(result.rejection_reason().starts_with(RATIONALE_RELEVANCE));
    }

    #[test]
    fn empty_passages_refuse_verdict() {
        let err = engine()
            .verify(&document("Track warehouse temperature.", Criticality::Low), &[])
            .unwrap_err();
        assert!(matches!(err, EvolvError::GroundingInsufficient { ref document_id } if document_id == "URS-7.1"));
    }

    // ── Boundary validation ───────────────────────────────────────────────────

    #[test]
    fn invalid_document_fails_before_retrieval() {
        let retriever = FixedRetriever::new(vec![passage("anything", 0.9)]);
        let raw = json!({ "URS_ID": "URS-1", "Criticality": "Low" });

        let err = engine().verify_document(&raw, &retriever).unwrap_err();

        match err {
            EvolvError::InvalidDocument { fields, .. } => {
                assert_eq!(fields, ["Requirement_Statement", "Regulatory_Rationale"]);
            }
            other => panic!("expected InvalidDocument, got {other:?}"),
        }
        assert_eq!(retriever.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn wrong_field_type_is_named() {
        let raw = json!({
            "URS_ID": "URS-1",
            "Requirement_Statement": 17,
            "Criticality": "Low",
            "Regulatory_Rationale": "GAMP 5"
        });
        let err = parse_document(&raw).unwrap_err();
        match err {
            EvolvError::InvalidDocument { fields, .. } => {
                assert_eq!(fields, ["Requirement_Statement"]);
            }
            other => panic!("expected InvalidDocument, got {other:?}"),
        }
    }

    #[test]
    fn unknown_criticality_is_named() {
        let raw = json!({
            "URS_ID": "URS-1",
            "Requirement_Statement": "Track temperature.",
            "Criticality": "Severe",
            "Regulatory_Rationale": "GAMP 5"
        });
        let err = parse_document(&raw).unwrap_err();
        assert!(err.to_string().contains("Criticality"));
        assert!(err.to_string().contains("Severe"));
    }

    // ── Batch ─────────────────────────────────────────────────────────────────

    #[test]
    fn batch_verifies_each_document_independently() {
        let retriever = FixedRetriever::new(vec![passage("Storage conditions should be monitored.", 0.7)]);
        let good = json!({
            "URS_ID": "URS-1",
            "Requirement_Statement": "Track warehouse temperature.",
            "Criticality": "Medium",
            "Regulatory_Rationale": "GAMP 5"
        });
        let bad = json!({ "URS_ID": "URS-2" });

        let results = engine().verify_batch(&[good.clone(), bad, good], &retriever);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().verdict, Verdict::Approved);
        assert!(matches!(results[1], Err(EvolvError::InvalidDocument { .. })));
        assert_eq!(results[2].as_ref().unwrap().verdict, Verdict::Approved);
        assert_eq!(retriever.calls.load(Ordering::SeqCst), 2);
    }

    // ── Rule tables ───────────────────────────────────────────────────────────

    #[test]
    fn shipped_rule_file_matches_builtin_tables() {
        let shipped = RuleTables::from_toml_str(include_str!("../rules/gamp5.toml")).unwrap();
        assert_eq!(shipped, RuleTables::gamp5());
    }

    #[test]
    fn rule_tables_are_lowercased_on_load() {
        let tables = RuleTables::from_toml_str(
            r#"
            high_risk_indicators = ["Sterile"]

            [[contradictions]]
            domain = "testing"
            requirement_phrases = ["Skip Testing"]
            reference_keywords = ["Test Plan"]
            "#,
        )
        .unwrap();

        let engine = ComplianceRuleEngine::new(tables);
        let finding = engine.check_contradictions(
            "We skip testing for this release.",
            &[passage("A TEST PLAN is mandatory.", 0.6)],
        );
        assert_eq!(finding.status, CheckStatus::Fail);
    }

    #[test]
    fn malformed_rule_tables_are_config_errors() {
        let err = RuleTables::from_toml_str("high_risk_indicators = 3").unwrap_err();
        assert!(matches!(err, EvolvError::ConfigError { ref reason } if reason.contains("rule tables")));
    }
}
