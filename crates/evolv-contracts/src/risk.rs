//! Risk assessment value types (GAMP 5 risk matrix).
//!
//! Each factor is an ordinal 1..=3. Higher always means riskier, so for
//! detectability the *best* detection capability carries the lowest value.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Impact of a failure on patient safety or product quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low = 1,
    Medium = 2,
    High = 3,
}

/// Likelihood of the failure occurring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Occurrence {
    Rare = 1,
    Occasional = 2,
    Frequent = 3,
}

/// Ability to detect the failure before it has impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Detectability {
    /// Easy to detect.
    High = 1,
    Medium = 2,
    /// Hard to detect.
    Low = 3,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];

    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

impl Occurrence {
    pub const ALL: [Occurrence; 3] = [Occurrence::Rare, Occurrence::Occasional, Occurrence::Frequent];

    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

impl Detectability {
    pub const ALL: [Detectability; 3] = [Detectability::High, Detectability::Medium, Detectability::Low];

    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

/// Overall risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        })
    }
}

/// CSA-aligned testing rigor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestingStrategy {
    Unscripted,
    Hybrid,
    RigorousScripted,
}

impl fmt::Display for TestingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TestingStrategy::Unscripted => "Unscripted Testing",
            TestingStrategy::Hybrid => "Hybrid Testing (Scripted + Unscripted)",
            TestingStrategy::RigorousScripted => "Rigorous Scripted Testing",
        })
    }
}

/// The outcome of scoring three factors.
///
/// `threshold_level` is what the priority number alone implies; `risk_level`
/// is what the user sees. Both are reported so the patient-safety override
/// never hides the computed number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskScore {
    /// severity × occurrence × detectability, in 1..=27.
    pub priority_number: u8,
    pub threshold_level: RiskLevel,
    pub risk_level: RiskLevel,
    /// True when severity is High and the override rule applied.
    pub severity_override: bool,
}

/// A complete, immutable assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub severity: Severity,
    pub occurrence: Occurrence,
    pub detectability: Detectability,
    pub priority_number: u8,
    pub risk_level: RiskLevel,
    pub testing_strategy: TestingStrategy,
    pub severity_override: bool,
}
