//! The risk matrix: three ordinal factors in, a classification out.
//!
//! Scoring algorithm:
//!
//! 1. `priority_number = severity × occurrence × detectability` (1..=27).
//! 2. Threshold the priority number: ≤ 4 Low, 5..=12 Medium, > 12 High.
//! 3. Patient safety first: High severity forces the level to High. The
//!    priority number is left untouched and the override is reported.

use tracing::debug;

use evolv_contracts::risk::{
    Detectability, Occurrence, RiskAssessment, RiskLevel, RiskScore, Severity, TestingStrategy,
};

/// Highest priority number still classified Low.
pub const LOW_CEILING: u8 = 4;
/// Highest priority number still classified Medium.
pub const MEDIUM_CEILING: u8 = 12;

/// Classify a priority number by threshold alone.
pub fn threshold_level(priority_number: u8) -> RiskLevel {
    if priority_number <= LOW_CEILING {
        RiskLevel::Low
    } else if priority_number <= MEDIUM_CEILING {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

/// Score three factors.
pub fn score(severity: Severity, occurrence: Occurrence, detectability: Detectability) -> RiskScore {
    let priority_number = severity.ordinal() * occurrence.ordinal() * detectability.ordinal();
    let threshold_level = threshold_level(priority_number);

    let severity_override = severity == Severity::High;
    let risk_level = if severity_override {
        RiskLevel::High
    } else {
        threshold_level
    };

    debug!(
        priority_number,
        threshold = %threshold_level,
        level = %risk_level,
        severity_override,
        "risk scored"
    );

    RiskScore {
        priority_number,
        threshold_level,
        risk_level,
        severity_override,
    }
}

/// CSA testing rigor for a risk level.
pub fn recommend_strategy(level: RiskLevel) -> TestingStrategy {
    match level {
        RiskLevel::Low => TestingStrategy::Unscripted,
        RiskLevel::Medium => TestingStrategy::Hybrid,
        RiskLevel::High => TestingStrategy::RigorousScripted,
    }
}

/// Score the factors and attach the recommended strategy.
pub fn assess(severity: Severity, occurrence: Occurrence, detectability: Detectability) -> RiskAssessment {
    let scored = score(severity, occurrence, detectability);
    RiskAssessment {
        severity,
        occurrence,
        detectability,
        priority_number: scored.priority_number,
        risk_level: scored.risk_level,
        testing_strategy: recommend_strategy(scored.risk_level),
        severity_override: scored.severity_override,
    }
}
