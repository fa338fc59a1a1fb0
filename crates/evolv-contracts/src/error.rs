//! Error types for the EVOLV compliance core.
//!
//! All fallible operations return `EvolvResult<T>`. Every variant names the
//! field, part, or check that caused it so a rejected decision can be
//! reconstructed from the message alone.

use thiserror::Error;

/// The unified error type for the EVOLV crates.
#[derive(Debug, Error)]
pub enum EvolvError {
    /// A free-text category label has no entry in the keyword table.
    #[error("invalid {field} category: '{input}' is not a recognized label")]
    InvalidCategory { field: String, input: String },

    /// A reasoning trace is missing a required part or has the wrong shape.
    #[error("invalid reasoning trace: '{part}' {reason}")]
    InvalidTrace { part: String, reason: String },

    /// A requirement document is missing required fields or carries a
    /// malformed value.
    #[error("invalid requirement document [{}]: {reason}", fields.join(", "))]
    InvalidDocument { fields: Vec<String>, reason: String },

    /// Retrieval returned nothing, so no verdict can be grounded.
    #[error("no regulatory context available for '{document_id}'; refusing to render a verdict")]
    GroundingInsufficient { document_id: String },

    /// The retrieval collaborator failed to answer a query.
    #[error("retrieval failed: {reason}")]
    RetrievalFailed { reason: String },

    /// The ledger row could not be persisted.
    ///
    /// Fatal: a decision that cannot be audited must not be reported as done.
    #[error("audit write failed: {reason}")]
    AuditWriteFailed { reason: String },

    /// Persisted rows or archives could not be read back.
    #[error("audit read failed: {reason}")]
    AuditReadFailed { reason: String },

    /// The reasoning archive could not be persisted.
    #[error("archive write failed for '{location}': {reason}")]
    ArchiveWriteFailed { location: String, reason: String },

    /// Configuration is missing or malformed.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

/// Convenience alias used throughout the EVOLV crates.
pub type EvolvResult<T> = Result<T, EvolvError>;
