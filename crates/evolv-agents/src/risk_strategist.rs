//! Risk strategist: scores change requests and recommends a testing strategy.
//!
//! Intake of one change request writes, in order:
//!
//!   CHANGE_REQUEST_RECEIVED → RISK_ASSESSMENT_COMPLETED (traced) → CHANGE_REQUEST_ASSESSED
//!
//! An unmapped label writes CHANGE_REQUEST_FAILED instead and the
//! `InvalidCategory` error is returned.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use evolv_contracts::{
    audit::{AuditAction, AuditEntry},
    error::{EvolvError, EvolvResult},
    risk::{RiskAssessment, RiskLevel, TestingStrategy},
    trace::ReasoningTrace,
};
use evolv_core::{Audited, DecisionRecorder};
use evolv_risk::{assess_change_request, recommend_strategy, threshold_level};

use crate::fields;

pub const AGENT_NAME: &str = "RiskStrategist";

/// A change request as received from the ticketing system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub cr_id: String,
    pub system_criticality: String,
    pub change_type: String,
    #[serde(default = "default_detectability")]
    pub detectability: String,
    /// Requesting user, recorded on every row for this request.
    #[serde(default)]
    pub requested_by: Option<String>,
}

fn default_detectability() -> String {
    "medium".to_string()
}

impl ChangeRequest {
    pub fn new(cr_id: &str, system_criticality: &str, change_type: &str) -> Self {
        Self {
            cr_id: cr_id.to_string(),
            system_criticality: system_criticality.to_string(),
            change_type: change_type.to_string(),
            detectability: default_detectability(),
            requested_by: None,
        }
    }

    pub fn with_detectability(mut self, detectability: &str) -> Self {
        self.detectability = detectability.to_string();
        self
    }

    pub fn requested_by(mut self, user: &str) -> Self {
        self.requested_by = Some(user.to_string());
        self
    }

    fn entry(&self, action: AuditAction, logic: String) -> AuditEntry {
        let entry = AuditEntry::new(AGENT_NAME, action, logic);
        match &self.requested_by {
            Some(user) => entry.with_user(user.clone()),
            None => entry,
        }
    }
}

pub struct RiskStrategist {
    recorder: DecisionRecorder,
}

impl RiskStrategist {
    pub fn new(recorder: DecisionRecorder) -> Self {
        Self { recorder }
    }

    /// Score a change request and audit the assessment with its trace.
    pub fn assess(&self, request: &ChangeRequest) -> EvolvResult<Audited<RiskAssessment>> {
        self.recorder.decide(|| {
            let assessment = assess_change_request(
                &request.system_criticality,
                &request.change_type,
                &request.detectability,
            )?;
            let entry = request
                .entry(
                    AuditAction::RiskAssessmentCompleted,
                    assessment_logic(&request.cr_id, &assessment),
                )
                .with_trace(assessment_trace(request, &assessment));
            Ok((assessment, entry))
        })
    }

    /// Recommend and audit the testing strategy for a risk level.
    pub fn determine_strategy(&self, level: RiskLevel) -> EvolvResult<Audited<TestingStrategy>> {
        let strategy = recommend_strategy(level);
        let entry = AuditEntry::new(
            AGENT_NAME,
            AuditAction::TestingStrategyDetermined,
            format!("Risk={level} -> Strategy={strategy}"),
        );
        self.recorder.record(strategy, entry)
    }

    /// Full intake of one change request.
    pub fn process_change_request(&self, request: &ChangeRequest) -> EvolvResult<Audited<RiskAssessment>> {
        self.recorder.note(request.entry(
            AuditAction::ChangeRequestReceived,
            format!(
                "Received {}: criticality '{}', change type '{}', detectability '{}'",
                request.cr_id, request.system_criticality, request.change_type, request.detectability
            ),
        ))?;

        match self.assess(request) {
            Ok(assessed) => {
                self.recorder.note(request.entry(
                    AuditAction::ChangeRequestAssessed,
                    format!(
                        "{} assessed: {} risk, {}",
                        request.cr_id, assessed.value.risk_level, assessed.value.testing_strategy
                    ),
                ))?;
                info!(
                    cr_id = %request.cr_id,
                    risk = %assessed.value.risk_level,
                    rpn = assessed.value.priority_number,
                    "change request assessed"
                );
                Ok(assessed)
            }
            Err(err @ EvolvError::InvalidCategory { .. }) => {
                self.recorder.note(request.entry(
                    AuditAction::ChangeRequestFailed,
                    format!("{} rejected: {err}", request.cr_id),
                ))?;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}

fn assessment_logic(cr_id: &str, assessment: &RiskAssessment) -> String {
    let override_note = if assessment.severity_override {
        " (patient-safety override: severity High)"
    } else {
        ""
    };
    format!(
        "{cr_id}: RPN {} = S{} x O{} x D{}; risk {}{override_note}; strategy {}",
        assessment.priority_number,
        assessment.severity.ordinal(),
        assessment.occurrence.ordinal(),
        assessment.detectability.ordinal(),
        assessment.risk_level,
        assessment.testing_strategy,
    )
}

fn assessment_trace(request: &ChangeRequest, assessment: &RiskAssessment) -> ReasoningTrace {
    let computed = threshold_level(assessment.priority_number);
    let mut steps = vec![
        format!(
            "Mapped criticality '{}' to severity {:?} ({})",
            request.system_criticality,
            assessment.severity,
            assessment.severity.ordinal()
        ),
        format!(
            "Mapped change type '{}' to occurrence {:?} ({})",
            request.change_type,
            assessment.occurrence,
            assessment.occurrence.ordinal()
        ),
        format!(
            "Mapped detectability '{}' to {:?} ({})",
            request.detectability,
            assessment.detectability,
            assessment.detectability.ordinal()
        ),
        format!(
            "RPN {} gives threshold level {computed}",
            assessment.priority_number
        ),
    ];
    if assessment.severity_override {
        steps.push(format!(
            "Severity High: risk level forced from {computed} to {}",
            assessment.risk_level
        ));
    }
    steps.push(format!("Recommended {}", assessment.testing_strategy));

    ReasoningTrace::new(
        fields([
            ("cr_id", json!(request.cr_id)),
            ("system_criticality", json!(request.system_criticality)),
            ("change_type", json!(request.change_type)),
            ("detectability", json!(request.detectability)),
        ]),
        steps,
        fields([
            ("priority_number", json!(assessment.priority_number)),
            ("threshold_level", json!(computed.to_string())),
            ("risk_level", json!(assessment.risk_level.to_string())),
            ("severity_override", Value::Bool(assessment.severity_override)),
            ("testing_strategy", json!(assessment.testing_strategy.to_string())),
        ]),
    )
}
