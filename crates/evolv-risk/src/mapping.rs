//! Field mapping from external change-request labels to risk factors.
//!
//! Labels come from change-management tooling as free text. Each factor has
//! a fixed, case-insensitive keyword table. An unmapped label is rejected
//! with `InvalidCategory`, never defaulted.

use evolv_contracts::{
    error::{EvolvError, EvolvResult},
    risk::{Detectability, Occurrence, RiskAssessment, Severity},
};

use crate::matrix;

/// System criticality → severity.
pub const CRITICALITY_TABLE: &[(&str, Severity)] = &[
    ("high", Severity::High),
    ("critical", Severity::High),
    ("medium", Severity::Medium),
    ("moderate", Severity::Medium),
    ("low", Severity::Low),
    ("minor", Severity::Low),
];

/// Change type → occurrence.
pub const CHANGE_TYPE_TABLE: &[(&str, Occurrence)] = &[
    ("emergency", Occurrence::Frequent),
    ("expedited", Occurrence::Frequent),
    ("normal", Occurrence::Occasional),
    ("standard", Occurrence::Rare),
    ("routine", Occurrence::Rare),
];

/// Detection capability → detectability. Good detection lowers risk.
pub const DETECTABILITY_TABLE: &[(&str, Detectability)] = &[
    ("high", Detectability::High),
    ("easy", Detectability::High),
    ("medium", Detectability::Medium),
    ("moderate", Detectability::Medium),
    ("low", Detectability::Low),
    ("hard", Detectability::Low),
];

fn lookup<T: Copy>(table: &[(&str, T)], field: &str, input: &str) -> EvolvResult<T> {
    let key = input.trim().to_lowercase();
    table
        .iter()
        .find(|(label, _)| *label == key)
        .map(|(_, value)| *value)
        .ok_or_else(|| EvolvError::InvalidCategory {
            field: field.to_string(),
            input: input.to_string(),
        })
}

pub fn map_criticality(label: &str) -> EvolvResult<Severity> {
    lookup(CRITICALITY_TABLE, "criticality", label)
}

pub fn map_change_type(label: &str) -> EvolvResult<Occurrence> {
    lookup(CHANGE_TYPE_TABLE, "change type", label)
}

pub fn map_detectability(label: &str) -> EvolvResult<Detectability> {
    lookup(DETECTABILITY_TABLE, "detectability", label)
}

/// Full assessment of a change request from its external labels.
///
/// # Errors
///
/// `InvalidCategory` naming the first label with no table entry.
pub fn assess_change_request(
    criticality: &str,
    change_type: &str,
    detectability: &str,
) -> EvolvResult<RiskAssessment> {
    let severity = map_criticality(criticality)?;
    let occurrence = map_change_type(change_type)?;
    let detectability = map_detectability(detectability)?;
    Ok(matrix::assess(severity, occurrence, detectability))
}
