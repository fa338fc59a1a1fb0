//! Boundary validation for requirement documents.
//!
//! Generated documents arrive as JSON. Validation runs in two phases before
//! any retrieval is attempted:
//!
//! 1. **Presence**: every required key must exist; all missing keys are
//!    reported together.
//! 2. **Structural**: the payload is validated against a JSON Schema using
//!    the `jsonschema` crate, then `Criticality` is parsed.

use serde_json::{json, Value};
use tracing::warn;

use evolv_contracts::{
    error::{EvolvError, EvolvResult},
    verify::{Criticality, RequirementDocument},
};

/// Keys every requirement document must carry.
pub const REQUIRED_FIELDS: [&str; 4] = [
    "URS_ID",
    "Requirement_Statement",
    "Criticality",
    "Regulatory_Rationale",
];

fn document_schema() -> Value {
    json!({
        "type": "object",
        "required": REQUIRED_FIELDS,
        "properties": {
            "URS_ID": { "type": "string", "minLength": 1 },
            "Requirement_Statement": { "type": "string", "minLength": 1 },
            "Criticality": { "type": "string" },
            "Regulatory_Rationale": { "type": "string" }
        }
    })
}

/// Validate a raw JSON document into a `RequirementDocument`.
///
/// # Errors
///
/// `InvalidDocument` listing every missing or malformed field.
pub fn parse_document(raw: &Value) -> EvolvResult<RequirementDocument> {
    let Some(obj) = raw.as_object() else {
        return Err(EvolvError::InvalidDocument {
            fields: vec!["document".to_string()],
            reason: "must be a JSON object".to_string(),
        });
    };

    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|field| !obj.contains_key(**field))
        .map(|field| field.to_string())
        .collect();
    if !missing.is_empty() {
        warn!(missing = ?missing, "requirement document missing fields");
        return Err(EvolvError::InvalidDocument {
            fields: missing,
            reason: "missing required fields".to_string(),
        });
    }

    let validator = jsonschema::validator_for(&document_schema()).map_err(|e| {
        EvolvError::ConfigError {
            reason: format!("invalid requirement document schema: {e}"),
        }
    })?;

    let mut fields = Vec::new();
    let mut messages = Vec::new();
    for error in validator.iter_errors(raw) {
        let path = error.instance_path.to_string();
        fields.push(path.trim_start_matches('/').to_string());
        messages.push(format!("{path}: {error}"));
    }
    if !fields.is_empty() {
        return Err(EvolvError::InvalidDocument {
            fields,
            reason: messages.join("; "),
        });
    }

    let text = |key: &str| obj[key].as_str().unwrap_or_default().to_string();

    let criticality_label = text("Criticality");
    let criticality =
        Criticality::parse(&criticality_label).ok_or_else(|| EvolvError::InvalidDocument {
            fields: vec!["Criticality".to_string()],
            reason: format!("'{criticality_label}' is not one of Low, Medium, High"),
        })?;

    Ok(RequirementDocument {
        urs_id: text("URS_ID"),
        requirement_statement: text("Requirement_Statement"),
        criticality,
        regulatory_rationale: text("Regulatory_Rationale"),
    })
}
