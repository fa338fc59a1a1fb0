//! Requirement verification types.
//!
//! The rule engine checks a `RequirementDocument` against ranked
//! `ReferencePassage`s from the regulatory knowledge base and produces a
//! `VerificationResult`: one `Finding` per check plus an overall verdict.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared criticality of a requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Criticality {
    Low,
    Medium,
    High,
}

impl Criticality {
    /// Case-insensitive parse of "Low" / "Medium" / "High".
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "low" => Some(Criticality::Low),
            "medium" => Some(Criticality::Medium),
            "high" => Some(Criticality::High),
            _ => None,
        }
    }
}

impl fmt::Display for Criticality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Criticality::Low => "Low",
            Criticality::Medium => "Medium",
            Criticality::High => "High",
        })
    }
}

/// A generated user requirement, validated at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementDocument {
    #[serde(rename = "URS_ID")]
    pub urs_id: String,
    #[serde(rename = "Requirement_Statement")]
    pub requirement_statement: String,
    #[serde(rename = "Criticality")]
    pub criticality: Criticality,
    #[serde(rename = "Regulatory_Rationale")]
    pub regulatory_rationale: String,
}

/// One ranked passage returned by the retrieval collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePassage {
    pub text: String,
    pub source_label: String,
    pub page_number: u32,
    /// Similarity in [0, 1]; higher is more relevant.
    pub similarity_score: f64,
    /// Regulatory edition the passage was ingested from, if known.
    #[serde(default)]
    pub version_tag: Option<String>,
}

/// The reference passage that grounds a finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub source_label: String,
    pub page_number: u32,
    pub similarity_score: f64,
    pub version_tag: Option<String>,
    /// First 150 characters of the passage.
    pub excerpt: String,
}

impl Citation {
    const EXCERPT_CHARS: usize = 150;

    pub fn from_passage(passage: &ReferencePassage) -> Self {
        Self {
            source_label: passage.source_label.clone(),
            page_number: passage.page_number,
            similarity_score: passage.similarity_score,
            version_tag: passage.version_tag.clone(),
            excerpt: passage.text.chars().take(Self::EXCERPT_CHARS).collect(),
        }
    }
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version_tag {
            Some(version) => write!(
                f,
                "Per {} [{}] (p.{}, score {:.2}): {}...",
                self.source_label, version, self.page_number, self.similarity_score, self.excerpt
            ),
            None => write!(
                f,
                "Per {} (p.{}, score {:.2}): {}...",
                self.source_label, self.page_number, self.similarity_score, self.excerpt
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckStatus {
    Pass,
    Fail,
}

/// The result of one check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// e.g. "Criticality Alignment".
    pub check_name: String,
    pub status: CheckStatus,
    pub detail: String,
    /// Present whenever at least one passage was retrieved.
    pub citation: Option<Citation>,
}

impl Finding {
    pub fn passed(&self) -> bool {
        self.status == CheckStatus::Pass
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Approved,
    Rejected,
}

/// The verdict on one requirement document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub document_id: String,
    pub verdict: Verdict,
    /// One finding per check, in evaluation order.
    pub findings: Vec<Finding>,
}

impl VerificationResult {
    pub fn is_rejected(&self) -> bool {
        self.verdict == Verdict::Rejected
    }

    /// Findings that failed, in evaluation order.
    pub fn failures(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| !f.passed())
    }

    /// A reason string naming every failed check and its detail.
    ///
    /// Empty when the document was approved.
    pub fn rejection_reason(&self) -> String {
        self.failures()
            .map(|f| format!("{}: {}", f.check_name, f.detail))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}
