//! Rule tables for the compliance rule engine.
//!
//! The tables are plain data: a set of high-risk indicator terms and a list
//! of contradiction rules, one per compliance domain. They are loaded once
//! (built-in or from TOML) and handed to the engine, so each domain can be
//! tested without touching matching logic.

use std::path::Path;

use serde::{Deserialize, Serialize};

use evolv_contracts::error::{EvolvError, EvolvResult};

/// Compliance domains covered by the built-in contradiction table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComplianceDomain {
    Validation,
    Testing,
    AuditTrail,
    ChangeControl,
}

/// A requirement phrase set paired with the reference keywords it opposes.
///
/// Matching is a case-insensitive substring test. A contradiction needs
/// both sides: a phrase in the requirement and a keyword in a retrieved
/// passage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContradictionRule {
    pub domain: ComplianceDomain,
    pub requirement_phrases: Vec<String>,
    pub reference_keywords: Vec<String>,
}

impl ContradictionRule {
    fn new(domain: ComplianceDomain, phrases: &[&str], keywords: &[&str]) -> Self {
        Self {
            domain,
            requirement_phrases: phrases.iter().map(|s| s.to_string()).collect(),
            reference_keywords: keywords.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// First requirement phrase found in `statement_lower`.
    pub fn requirement_hit(&self, statement_lower: &str) -> Option<&str> {
        self.requirement_phrases
            .iter()
            .map(String::as_str)
            .find(|phrase| statement_lower.contains(phrase))
    }

    /// First reference keyword found in `text_lower`.
    pub fn reference_hit(&self, text_lower: &str) -> Option<&str> {
        self.reference_keywords
            .iter()
            .map(String::as_str)
            .find(|keyword| text_lower.contains(keyword))
    }
}

/// The full rule configuration.
///
/// Example:
/// ```toml
/// high_risk_indicators = ["patient", "safety"]
///
/// [[contradictions]]
/// domain = "validation"
/// requirement_phrases = ["skip validation"]
/// reference_keywords = ["shall be validated"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTables {
    pub high_risk_indicators: Vec<String>,
    #[serde(default)]
    pub contradictions: Vec<ContradictionRule>,
}

impl RuleTables {
    /// The built-in GAMP 5 / CSA tables.
    pub fn gamp5() -> Self {
        use ComplianceDomain::*;

        let indicators = [
            "patient",
            "safety",
            "critical",
            "gxp",
            "sterile",
            "batch release",
            "adverse event",
            "pharmacovigilance",
            "clinical",
            "life-sustaining",
            "life-supporting",
            "validated",
            "21 cfr part 11",
        ];

        Self {
            high_risk_indicators: indicators.iter().map(|s| s.to_string()).collect(),
            contradictions: vec![
                ContradictionRule::new(
                    Validation,
                    &[
                        "skip validation",
                        "no validation required",
                        "validation is unnecessary",
                        "does not require validation",
                    ],
                    &["validation", "shall be validated", "validation is required"],
                ),
                ContradictionRule::new(
                    Testing,
                    &[
                        "skip testing",
                        "no testing required",
                        "testing is unnecessary",
                        "does not require testing",
                    ],
                    &["testing", "shall be tested", "test plan", "verification"],
                ),
                ContradictionRule::new(
                    AuditTrail,
                    &[
                        "no audit trail",
                        "disable audit",
                        "audit trail is not needed",
                        "without audit trail",
                    ],
                    &["audit trail", "traceability", "electronic record", "21 cfr part 11"],
                ),
                ContradictionRule::new(
                    ChangeControl,
                    &["no change control", "bypass change control", "without change control"],
                    &["change control", "change management"],
                ),
            ],
        }
    }

    /// Parse `s` as TOML rule tables.
    ///
    /// Terms are lower-cased on load so matching stays case-insensitive no
    /// matter how the file was written.
    pub fn from_toml_str(s: &str) -> EvolvResult<Self> {
        let mut tables: RuleTables = toml::from_str(s).map_err(|e| EvolvError::ConfigError {
            reason: format!("failed to parse rule tables TOML: {}", e),
        })?;
        tables.normalize();
        Ok(tables)
    }

    /// Read the file at `path` and parse it as TOML rule tables.
    pub fn from_file(path: &Path) -> EvolvResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| EvolvError::ConfigError {
            reason: format!("failed to read rule tables '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Contradiction rules for one domain.
    pub fn rules_for(&self, domain: ComplianceDomain) -> impl Iterator<Item = &ContradictionRule> {
        self.contradictions.iter().filter(move |r| r.domain == domain)
    }

    fn normalize(&mut self) {
        let lower = |terms: &mut Vec<String>| {
            for term in terms.iter_mut() {
                *term = term.trim().to_lowercase();
            }
        };
        lower(&mut self.high_risk_indicators);
        for rule in &mut self.contradictions {
            lower(&mut rule.requirement_phrases);
            lower(&mut rule.reference_keywords);
        }
    }
}

impl Default for RuleTables {
    fn default() -> Self {
        Self::gamp5()
    }
}
