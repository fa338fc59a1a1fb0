//! Verification agent: checks generated requirement documents against the
//! regulatory knowledge base and audits every verdict.
//!
//! Approved documents are logged as `URS_VERIFIED`, rejected ones as
//! `COMPLIANCE_EXCEPTION`; both carry the full reasoning trace. Regulatory
//! version tags seen for the first time are logged once per agent as
//! `REG_VERSION_CHANGE_DETECTED`.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{json, Value};
use tracing::{info, warn};

use evolv_contracts::{
    audit::{AuditAction, AuditEntry},
    error::EvolvResult,
    trace::ReasoningTrace,
    verify::{CheckStatus, ReferencePassage, RequirementDocument, VerificationResult},
};
use evolv_core::{traits::Retriever, Audited, DecisionRecorder};
use evolv_verify::{
    engine::{VERIFICATION_MIN_SCORE, VERIFICATION_TOP_K},
    parse_document, ComplianceRuleEngine,
};

use crate::fields;

pub const AGENT_NAME: &str = "VerificationAgent";

/// Outcome of verifying several documents.
#[derive(Debug)]
pub struct BatchVerification {
    /// One entry per input document, in input order.
    pub results: Vec<EvolvResult<Audited<VerificationResult>>>,
    pub approved: usize,
    pub rejected: usize,
    /// Documents that produced no verdict (invalid, ungrounded, unaudited).
    pub errored: usize,
}

pub struct VerificationAgent {
    engine: ComplianceRuleEngine,
    retriever: Arc<dyn Retriever>,
    recorder: DecisionRecorder,
    known_versions: Mutex<BTreeSet<String>>,
}

impl VerificationAgent {
    pub fn new(
        engine: ComplianceRuleEngine,
        retriever: Arc<dyn Retriever>,
        recorder: DecisionRecorder,
    ) -> Self {
        Self {
            engine,
            retriever,
            recorder,
            known_versions: Mutex::new(BTreeSet::new()),
        }
    }

    /// Treat `versions` as already seen.
    pub fn with_known_versions<I, S>(self, versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_versions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(versions.into_iter().map(Into::into));
        self
    }

    /// Validate, retrieve, verify and audit one raw document.
    ///
    /// # Errors
    ///
    /// - `InvalidDocument` before any retrieval when the document is malformed.
    /// - `GroundingInsufficient` when nothing was retrieved.
    /// - Any audit error; the verdict is discarded.
    pub fn verify(&self, raw: &Value) -> EvolvResult<Audited<VerificationResult>> {
        let document = parse_document(raw)?;
        let passages = self.engine.retrieve(self.retriever.as_ref(), &document)?;
        self.note_new_versions(&passages)?;

        self.recorder.decide(|| {
            let result = self.engine.verify(&document, &passages)?;
            let entry = verdict_entry(&document, &passages, &result);
            Ok((result, entry))
        })
    }

    /// Verify each document independently, then audit a batch summary.
    pub fn verify_batch(&self, raws: &[Value]) -> EvolvResult<Audited<BatchVerification>> {
        let results: Vec<_> = raws.iter().map(|raw| self.verify(raw)).collect();

        let mut batch = BatchVerification {
            approved: 0,
            rejected: 0,
            errored: 0,
            results: Vec::new(),
        };
        for result in &results {
            match result {
                Ok(audited) if audited.value.is_rejected() => batch.rejected += 1,
                Ok(_) => batch.approved += 1,
                Err(_) => batch.errored += 1,
            }
        }
        batch.results = results;

        let logic = format!(
            "Batch-verified {} URS documents; {} approved, {} rejected, {} without verdict",
            raws.len(),
            batch.approved,
            batch.rejected,
            batch.errored
        );
        self.recorder.record(
            batch,
            AuditEntry::new(AGENT_NAME, AuditAction::UrsBatchVerified, logic),
        )
    }

    /// Audit every version tag in `passages` not seen before by this agent.
    fn note_new_versions(&self, passages: &[ReferencePassage]) -> EvolvResult<()> {
        let mut known = self
            .known_versions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let fresh: BTreeSet<&str> = passages
            .iter()
            .filter_map(|p| p.version_tag.as_deref())
            .filter(|tag| !tag.is_empty() && !known.contains(*tag))
            .collect();

        for version in fresh {
            warn!(version, "new regulatory version detected; existing logic may need re-evaluation");
            self.recorder.note(AuditEntry::new(
                AGENT_NAME,
                AuditAction::RegVersionChangeDetected,
                format!("New regulatory version {version} detected during verification"),
            ))?;
            known.insert(version.to_string());
        }
        Ok(())
    }
}

fn verdict_entry(
    document: &RequirementDocument,
    passages: &[ReferencePassage],
    result: &VerificationResult,
) -> AuditEntry {
    let (action, logic) = if result.is_rejected() {
        let failed: Vec<&str> = result.failures().map(|f| f.check_name.as_str()).collect();
        (
            AuditAction::ComplianceException,
            format!(
                "REJECTED {}: Failed checks: {}. {}",
                document.urs_id,
                failed.join(", "),
                result.rejection_reason()
            ),
        )
    } else {
        let passed: Vec<&str> = result.findings.iter().map(|f| f.check_name.as_str()).collect();
        (
            AuditAction::UrsVerified,
            format!(
                "APPROVED {}: All checks passed ({}). Criticality {} confirmed against retrieved guidance.",
                document.urs_id,
                passed.join(", "),
                document.criticality
            ),
        )
    };
    info!(urs_id = %document.urs_id, action = %action, "verification verdict");

    let mut steps = vec![format!(
        "Retrieved {} passage(s) with top-k {VERIFICATION_TOP_K} and min score {VERIFICATION_MIN_SCORE}",
        passages.len()
    )];
    steps.extend(result.findings.iter().map(|f| {
        let status = match f.status {
            CheckStatus::Pass => "PASS",
            CheckStatus::Fail => "FAIL",
        };
        format!("{}: {status}. {}", f.check_name, f.detail)
    }));

    let citations: Vec<String> = result
        .findings
        .iter()
        .filter_map(|f| f.citation.as_ref().map(ToString::to_string))
        .collect();
    let failed: Vec<&str> = result.failures().map(|f| f.check_name.as_str()).collect();

    let trace = ReasoningTrace::new(
        fields([
            ("urs_id", json!(document.urs_id)),
            ("requirement_statement", json!(document.requirement_statement)),
            ("criticality", json!(document.criticality.to_string())),
            ("regulatory_rationale", json!(document.regulatory_rationale)),
        ]),
        steps,
        fields([
            ("verdict", json!(format!("{:?}", result.verdict))),
            ("failed_checks", json!(failed)),
            ("citations", json!(citations)),
        ]),
    );

    AuditEntry::new(AGENT_NAME, action, logic).with_trace(trace)
}
