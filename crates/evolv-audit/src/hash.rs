//! Integrity hashing for ledger rows and archive bodies.
//!
//! Row hash input layout (UTF-8, joined with `FIELD_DELIMITER`, in order):
//!   1. timestamp
//!   2. user_id
//!   3. agent_name
//!   4. action tag
//!   5. decision_logic
//!   6. compliance impact label
//!
//! The hash is reproducible from the visible row alone, so verification is
//! recompute-and-compare.

use sha2::{Digest, Sha256};

use evolv_contracts::audit::{AuditAction, AuditRecord, ComplianceImpact, PersistedRow};

pub const FIELD_DELIMITER: &str = "|";

/// Compute the integrity hash for one ledger row.
///
/// Returns a lowercase 64-character hex string.
pub fn row_hash(
    timestamp: &str,
    user_id: &str,
    agent_name: &str,
    action: &AuditAction,
    decision_logic: &str,
    impact: ComplianceImpact,
) -> String {
    hash_fields([
        timestamp,
        user_id,
        agent_name,
        action.as_str(),
        decision_logic,
        impact.label(),
    ])
}

fn hash_fields(fields: [&str; 6]) -> String {
    sha256_hex(fields.join(FIELD_DELIMITER).as_bytes())
}

/// Recompute the hash of a persisted row from its visible fields.
pub fn record_hash(record: &AuditRecord) -> String {
    row_hash(
        &record.timestamp,
        &record.user_id,
        &record.agent_name,
        &record.action,
        &record.decision_logic,
        record.compliance_impact,
    )
}

/// Recompute the hash of a row as read back, without interpreting any
/// column, so an edited action or impact label still hashes.
pub fn persisted_hash(row: &PersistedRow) -> String {
    hash_fields([
        row.timestamp.as_str(),
        row.user_id.as_str(),
        row.agent_name.as_str(),
        row.action.as_str(),
        row.decision_logic.as_str(),
        row.compliance_impact.as_str(),
    ])
}

/// True when the stored hash matches the recomputed one.
pub fn verify_record(record: &AuditRecord) -> bool {
    record.integrity_hash == record_hash(record)
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
