//! # evolv-risk
//!
//! GAMP 5 risk matrix for the EVOLV compliance core.
//!
//! ## Overview
//!
//! Pure, stateless scoring of severity, occurrence, and detectability into a
//! risk priority number, a risk level, and a CSA testing strategy. High
//! severity always yields High risk; the override is reported, never hidden.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use evolv_risk::assess_change_request;
//!
//! let assessment = assess_change_request("critical", "normal", "medium")?;
//! assert_eq!(assessment.priority_number, 12);
//! assert!(assessment.severity_override);
//! ```

pub mod mapping;
pub mod matrix;

pub use mapping::{assess_change_request, map_change_type, map_criticality, map_detectability};
pub use matrix::{assess, recommend_strategy, score, threshold_level};

// ── Tests ─────────────────────────────────────────────────────────────────────
