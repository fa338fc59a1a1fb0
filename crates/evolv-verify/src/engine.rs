//! The compliance rule engine.
//!
//! `ComplianceRuleEngine` checks a requirement document against passages
//! retrieved from the regulatory knowledge base. Three independent checks
//! run on every document:
//!
//! 1. **Criticality alignment**: a Low/Medium requirement whose retrieved
//!    guidance mentions a high-risk indicator is flagged as likely
//!    under-classified. High criticality is exempt.
//! 2. **Rationale relevance**: the best similarity score must reach
//!    `RELEVANCE_THRESHOLD` (inclusive).
//! 3. **Contradiction scan**: a requirement phrase fails only when a
//!    retrieved passage carries an opposing keyword from the same rule.
//!
//! Any failure rejects the document. The engine never re-classifies or
//! edits the document; it only reports.

use tracing::{debug, warn};

use evolv_contracts::{
    error::{EvolvError, EvolvResult},
    verify::{
        CheckStatus, Citation, Criticality, Finding, ReferencePassage, RequirementDocument,
        Verdict, VerificationResult,
    },
};
use evolv_core::traits::Retriever;

use crate::{document::parse_document, rules::RuleTables};

/// Minimum best-passage similarity for a rationale to count as relevant.
pub const RELEVANCE_THRESHOLD: f64 = 0.45;
/// Passages requested per verification query.
pub const VERIFICATION_TOP_K: usize = 5;
/// Passages scoring below this are not returned by the retriever.
pub const VERIFICATION_MIN_SCORE: f64 = 0.35;

pub const CRITICALITY_ALIGNMENT: &str = "Criticality Alignment";
pub const RATIONALE_RELEVANCE: &str = "Rationale Relevance";
pub const CONTRADICTION_SCAN: &str = "Contradiction Scan";

/// Stateless rule engine over a fixed set of rule tables.
#[derive(Debug, Clone, Default)]
pub struct ComplianceRuleEngine {
    tables: RuleTables,
}

impl ComplianceRuleEngine {
    pub fn new(tables: RuleTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &RuleTables {
        &self.tables
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    /// The passage with the highest similarity score.
    fn top_passage(passages: &[ReferencePassage]) -> Option<&ReferencePassage> {
        passages.iter().fold(None, |best: Option<&ReferencePassage>, p| match best {
            Some(b) if b.similarity_score >= p.similarity_score => Some(b),
            _ => Some(p),
        })
    }

    fn top_citation(passages: &[ReferencePassage]) -> Option<Citation> {
        Self::top_passage(passages).map(Citation::from_passage)
    }

    fn finding(
        check_name: &str,
        status: CheckStatus,
        detail: String,
        citation: Option<Citation>,
    ) -> Finding {
        Finding {
            check_name: check_name.to_string(),
            status,
            detail,
            citation,
        }
    }

    // ── Individual checks ─────────────────────────────────────────────────────

    /// Flag Low/Medium requirements whose guidance carries high-risk terms.
    pub fn check_criticality_alignment(
        &self,
        document: &RequirementDocument,
        passages: &[ReferencePassage],
    ) -> Finding {
        let criticality = document.criticality;
        if criticality == Criticality::High {
            return Self::finding(
                CRITICALITY_ALIGNMENT,
                CheckStatus::Pass,
                format!("Criticality is {criticality}; no under-classification possible."),
                Self::top_citation(passages),
            );
        }

        let mut triggers: Vec<(&str, &ReferencePassage)> = Vec::new();
        for passage in passages {
            let text = passage.text.to_lowercase();
            for indicator in &self.tables.high_risk_indicators {
                if text.contains(indicator.as_str()) {
                    triggers.push((indicator.as_str(), passage));
                }
            }
        }

        match triggers.first() {
            Some((_, first)) => {
                let described = triggers
                    .iter()
                    .map(|(indicator, p)| {
                        format!("'{}' in {} p.{}", indicator, p.source_label, p.page_number)
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                Self::finding(
                    CRITICALITY_ALIGNMENT,
                    CheckStatus::Fail,
                    format!(
                        "Criticality is {criticality} but retrieved guidance contains high-risk \
                         indicators: {described}. Requirement may be under-classified."
                    ),
                    Some(Citation::from_passage(first)),
                )
            }
            None => Self::finding(
                CRITICALITY_ALIGNMENT,
                CheckStatus::Pass,
                format!("Criticality {criticality} is consistent with the retrieved guidance."),
                Self::top_citation(passages),
            ),
        }
    }

    /// Require the best passage to reach the relevance threshold.
    pub fn check_rationale_relevance(&self, passages: &[ReferencePassage]) -> Finding {
        let Some(top) = Self::top_passage(passages) else {
            return Self::finding(
                RATIONALE_RELEVANCE,
                CheckStatus::Fail,
                "No reference passages were retrieved; the rationale cannot be substantiated."
                    .to_string(),
                None,
            );
        };

        let best = top.similarity_score;
        let citation = Some(Citation::from_passage(top));
        if best >= RELEVANCE_THRESHOLD {
            Self::finding(
                RATIONALE_RELEVANCE,
                CheckStatus::Pass,
                format!(
                    "Best match score is {best:.3}, at or above the {RELEVANCE_THRESHOLD} threshold."
                ),
                citation,
            )
        } else {
            Self::finding(
                RATIONALE_RELEVANCE,
                CheckStatus::Fail,
                format!(
                    "Best match score is {best:.3}, below the {RELEVANCE_THRESHOLD} threshold. \
                     The cited rationale may not support this requirement."
                ),
                citation,
            )
        }
    }

    /// Report requirement phrases that oppose retrieved obligations.
    ///
    /// Without a grounding passage no contradiction can be asserted, so a
    /// phrase match alone passes.
    pub fn check_contradictions(&self, statement: &str, passages: &[ReferencePassage]) -> Finding {
        let statement_lower = statement.to_lowercase();
        let lowered: Vec<String> = passages.iter().map(|p| p.text.to_lowercase()).collect();

        let mut contradictions: Vec<String> = Vec::new();
        let mut grounding: Option<&ReferencePassage> = None;

        for rule in &self.tables.contradictions {
            let Some(phrase) = rule.requirement_hit(&statement_lower) else {
                continue;
            };

            let hit = lowered
                .iter()
                .zip(passages)
                .find_map(|(text, passage)| rule.reference_hit(text).map(|kw| (kw, passage)));

            match hit {
                Some((keyword, passage)) => {
                    contradictions.push(format!(
                        "requirement contains '{}' but {} p.{} states '{}' ({:?})",
                        phrase, passage.source_label, passage.page_number, keyword, rule.domain
                    ));
                    grounding.get_or_insert(passage);
                }
                None => debug!(
                    phrase,
                    domain = ?rule.domain,
                    "requirement phrase matched but no grounding passage"
                ),
            }
        }

        match grounding {
            Some(passage) => Self::finding(
                CONTRADICTION_SCAN,
                CheckStatus::Fail,
                format!("Direct contradiction(s) detected: {}.", contradictions.join("; ")),
                Some(Citation::from_passage(passage)),
            ),
            None => Self::finding(
                CONTRADICTION_SCAN,
                CheckStatus::Pass,
                "No contradictions detected between the requirement and retrieved guidance."
                    .to_string(),
                Self::top_citation(passages),
            ),
        }
    }

    // ── Public API ────────────────────────────────────────────────────────────

    /// Verify `document` against `passages`.
    ///
    /// All three checks always run so the caller sees every failure in one
    /// pass.
    ///
    /// # Errors
    ///
    /// `GroundingInsufficient` when `passages` is empty: with no regulatory
    /// context there is nothing to pass or fail against.
    pub fn verify(
        &self,
        document: &RequirementDocument,
        passages: &[ReferencePassage],
    ) -> EvolvResult<VerificationResult> {
        if passages.is_empty() {
            warn!(urs_id = %document.urs_id, "no reference passages; refusing verdict");
            return Err(EvolvError::GroundingInsufficient {
                document_id: document.urs_id.clone(),
            });
        }

        let findings = vec![
            self.check_criticality_alignment(document, passages),
            self.check_rationale_relevance(passages),
            self.check_contradictions(&document.requirement_statement, passages),
        ];

        for finding in findings.iter().filter(|f| !f.passed()) {
            warn!(
                urs_id = %document.urs_id,
                check = %finding.check_name,
                detail = %finding.detail,
                "verification check failed"
            );
        }

        let verdict = if findings.iter().all(Finding::passed) {
            Verdict::Approved
        } else {
            Verdict::Rejected
        };

        debug!(
            urs_id = %document.urs_id,
            verdict = ?verdict,
            passages = passages.len(),
            "verification complete"
        );

        Ok(VerificationResult {
            document_id: document.urs_id.clone(),
            verdict,
            findings,
        })
    }

    /// Query the retriever with the requirement statement.
    pub fn retrieve(
        &self,
        retriever: &dyn Retriever,
        document: &RequirementDocument,
    ) -> EvolvResult<Vec<ReferencePassage>> {
        retriever.query(
            &document.requirement_statement,
            VERIFICATION_TOP_K,
            VERIFICATION_MIN_SCORE,
        )
    }

    /// Validate, retrieve, and verify one raw document.
    ///
    /// Validation happens before any retrieval call is issued.
    pub fn verify_document(
        &self,
        raw: &serde_json::Value,
        retriever: &dyn Retriever,
    ) -> EvolvResult<VerificationResult> {
        let document = parse_document(raw)?;
        let passages = self.retrieve(retriever, &document)?;
        self.verify(&document, &passages)
    }

    /// Verify each document independently. One failure never affects the
    /// others.
    pub fn verify_batch(
        &self,
        raws: &[serde_json::Value],
        retriever: &dyn Retriever,
    ) -> Vec<EvolvResult<VerificationResult>> {
        raws.iter().map(|raw| self.verify_document(raw, retriever)).collect()
    }
}
