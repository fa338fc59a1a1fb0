//! Structured reasoning traces.
//!
//! A trace is the full record of how an automated decision was reached:
//! what went in, the ordered steps taken, and what came out. It is validated
//! once at the boundary; everything downstream works with the typed value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EvolvError, EvolvResult};

/// Inputs, ordered steps, and outputs behind one decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningTrace {
    pub inputs: BTreeMap<String, Value>,
    pub steps: Vec<String>,
    pub outputs: BTreeMap<String, Value>,
}

impl ReasoningTrace {
    const PARTS: [&'static str; 3] = ["inputs", "steps", "outputs"];

    /// Build a trace from already-typed parts.
    pub fn new(
        inputs: BTreeMap<String, Value>,
        steps: Vec<String>,
        outputs: BTreeMap<String, Value>,
    ) -> Self {
        Self { inputs, steps, outputs }
    }

    /// Validate an untyped payload into a trace.
    ///
    /// The payload must be an object with exactly the keys `inputs` (object),
    /// `steps` (array of strings), and `outputs` (object). The first
    /// offending part is named in the returned `InvalidTrace` error.
    pub fn from_value(value: Value) -> EvolvResult<Self> {
        let Value::Object(mut map) = value else {
            return Err(EvolvError::InvalidTrace {
                part: "trace".to_string(),
                reason: "must be an object with inputs, steps, and outputs".to_string(),
            });
        };

        for part in Self::PARTS {
            if !map.contains_key(part) {
                return Err(EvolvError::InvalidTrace {
                    part: part.to_string(),
                    reason: "is missing".to_string(),
                });
            }
        }

        if let Some(extra) = map.keys().find(|k| !Self::PARTS.contains(&k.as_str())) {
            return Err(EvolvError::InvalidTrace {
                part: extra.clone(),
                reason: "is not a recognized trace part".to_string(),
            });
        }

        let inputs = object_part(&mut map, "inputs")?;
        let outputs = object_part(&mut map, "outputs")?;

        let steps = match map.remove("steps") {
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(idx, item)| match item {
                    Value::String(s) => Ok(s),
                    _ => Err(EvolvError::InvalidTrace {
                        part: "steps".to_string(),
                        reason: format!("entry {idx} must be a string"),
                    }),
                })
                .collect::<EvolvResult<Vec<String>>>()?,
            _ => {
                return Err(EvolvError::InvalidTrace {
                    part: "steps".to_string(),
                    reason: "must be an ordered list of strings".to_string(),
                })
            }
        };

        Ok(Self { inputs, steps, outputs })
    }
}

fn object_part(
    map: &mut serde_json::Map<String, Value>,
    part: &str,
) -> EvolvResult<BTreeMap<String, Value>> {
    match map.remove(part) {
        Some(Value::Object(obj)) => Ok(obj.into_iter().collect()),
        _ => Err(EvolvError::InvalidTrace {
            part: part.to_string(),
            reason: "must be a mapping".to_string(),
        }),
    }
}
