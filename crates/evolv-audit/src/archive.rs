//! Reasoning archives.
//!
//! Every traced decision gets one JSON archive holding the full reasoning
//! trace plus the integrity hash of its ledger row. The archive carries its
//! own self-hash so tampering with the file is detectable independently of
//! the ledger.
//!
//! Archives are named `.{ACTION}_{compact timestamp}_{hash[..8]}.json`, with
//! the action reduced to name-safe characters. They stay out of default
//! directory listings and can be found by hash prefix without an index.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use evolv_contracts::{
    audit::{ArchiveLocation, AuditAction, AuditRecord, ComplianceImpact},
    error::{EvolvError, EvolvResult},
    trace::ReasoningTrace,
};
use evolv_core::traits::ArchiveStore;

use crate::hash::sha256_hex;

pub const ARCHIVE_SCHEMA_VERSION: &str = "1.0.0";
pub const ARCHIVE_TYPE: &str = "logic_archive";
pub const HASH_ALGORITHM: &str = "sha256";

/// Characters of the cross-reference hash used in the archive name.
pub const NAME_HASH_PREFIX_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveIntegrity {
    pub archive_hash: String,
    pub algorithm: String,
}

/// The persisted body of one reasoning archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    #[serde(rename = "$schema_version")]
    pub schema_version: String,
    pub archive_type: String,
    /// Integrity hash of the paired ledger row.
    pub audit_trail_hash: String,
    pub timestamp: String,
    pub agent_name: String,
    pub action: AuditAction,
    pub user_id: String,
    pub compliance_impact: ComplianceImpact,
    pub decision_logic_summary: String,
    pub inputs: BTreeMap<String, Value>,
    pub steps: Vec<String>,
    pub outputs: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<ArchiveIntegrity>,
}

impl ArchiveRecord {
    /// An unsealed archive for `record` and its trace.
    pub fn new(record: &AuditRecord, trace: &ReasoningTrace) -> Self {
        Self {
            schema_version: ARCHIVE_SCHEMA_VERSION.to_string(),
            archive_type: ARCHIVE_TYPE.to_string(),
            audit_trail_hash: record.integrity_hash.clone(),
            timestamp: record.timestamp.clone(),
            agent_name: record.agent_name.clone(),
            action: record.action.clone(),
            user_id: record.user_id.clone(),
            compliance_impact: record.compliance_impact,
            decision_logic_summary: record.decision_logic.clone(),
            inputs: trace.inputs.clone(),
            steps: trace.steps.clone(),
            outputs: trace.outputs.clone(),
            integrity: None,
        }
    }

    /// SHA-256 over the compact JSON of this archive without `integrity`.
    pub fn content_hash(&self) -> EvolvResult<String> {
        let unsealed = Self {
            integrity: None,
            ..self.clone()
        };
        let bytes = serde_json::to_vec(&unsealed).map_err(|e| EvolvError::ArchiveWriteFailed {
            location: self.audit_trail_hash.clone(),
            reason: format!("archive is not serializable: {e}"),
        })?;
        Ok(sha256_hex(&bytes))
    }

    /// Attach the self-hash.
    pub fn seal(mut self) -> EvolvResult<Self> {
        let archive_hash = self.content_hash()?;
        self.integrity = Some(ArchiveIntegrity {
            archive_hash,
            algorithm: HASH_ALGORITHM.to_string(),
        });
        Ok(self)
    }

    /// True when the archive is sealed and its self-hash still matches.
    pub fn is_intact(&self) -> bool {
        match (&self.integrity, self.content_hash()) {
            (Some(integrity), Ok(recomputed)) => {
                integrity.algorithm == HASH_ALGORITHM && integrity.archive_hash == recomputed
            }
            _ => false,
        }
    }
}

/// The action tag as it appears in an archive name: anything outside
/// `[A-Za-z0-9_]` becomes `_`, so the name never leaves the archive
/// directory. The archive body keeps the real tag.
fn name_safe_tag(action: &AuditAction) -> String {
    action
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Derive the archive name for a ledger row.
pub fn archive_name(record: &AuditRecord) -> String {
    let tag = name_safe_tag(&record.action);
    let compact: String = record
        .timestamp
        .chars()
        .filter(|c| *c != ':' && *c != '-')
        .collect();
    let prefix: String = record
        .integrity_hash
        .chars()
        .take(NAME_HASH_PREFIX_LEN)
        .collect();
    format!(".{tag}_{compact}_{prefix}.json")
}

/// Writes, finds and verifies reasoning archives in an `ArchiveStore`.
pub struct ReasoningArchive {
    store: Box<dyn ArchiveStore>,
}

impl ReasoningArchive {
    pub fn new(store: Box<dyn ArchiveStore>) -> Self {
        Self { store }
    }

    /// Seal and store the archive for `record`.
    ///
    /// The trace is already validated by construction, so this either writes
    /// the complete archive or nothing.
    pub fn write(&mut self, record: &AuditRecord, trace: &ReasoningTrace) -> EvolvResult<ArchiveLocation> {
        let name = archive_name(record);
        let sealed = ArchiveRecord::new(record, trace).seal()?;
        let body = serde_json::to_vec_pretty(&sealed).map_err(|e| EvolvError::ArchiveWriteFailed {
            location: name.clone(),
            reason: format!("archive is not serializable: {e}"),
        })?;

        let location = self.store.put_new(&name, &body)?;
        info!(
            action = %record.action,
            location = %location,
            steps = trace.steps.len(),
            "reasoning archive written"
        );
        Ok(location)
    }

    /// Remove the archive written for `record`.
    pub fn rollback(&mut self, record: &AuditRecord) -> EvolvResult<()> {
        self.store.remove(&archive_name(record))
    }

    /// Every archive name in the store.
    pub fn names(&self) -> EvolvResult<Vec<String>> {
        self.store.list()
    }

    /// Archive names whose cross-reference hash starts with `prefix`.
    ///
    /// Only the first eight hash characters appear in a name, so a longer
    /// prefix is confirmed against the archive body.
    pub fn find_by_hash_prefix(&self, prefix: &str) -> EvolvResult<Vec<String>> {
        let prefix = prefix.to_lowercase();
        let name_part: String = prefix.chars().take(NAME_HASH_PREFIX_LEN).collect();

        let mut found = Vec::new();
        for name in self.store.list()? {
            let Some(stem) = name.strip_suffix(".json") else {
                continue;
            };
            let Some((_, hash_part)) = stem.rsplit_once('_') else {
                continue;
            };
            if !hash_part.starts_with(&name_part) {
                continue;
            }
            if prefix.len() > NAME_HASH_PREFIX_LEN
                && !self.load(&name)?.audit_trail_hash.starts_with(&prefix)
            {
                continue;
            }
            found.push(name);
        }
        debug!(prefix = %prefix, matches = found.len(), "archive prefix scan");
        Ok(found)
    }

    pub fn load(&self, name: &str) -> EvolvResult<ArchiveRecord> {
        let bytes = self.store.read(name)?;
        serde_json::from_slice(&bytes).map_err(|e| EvolvError::AuditReadFailed {
            reason: format!("archive '{name}' is not a valid logic archive: {e}"),
        })
    }

    /// Recompute the self-hash of the archive stored under `name`.
    pub fn verify(&self, name: &str) -> EvolvResult<bool> {
        Ok(self.load(name)?.is_intact())
    }
}
