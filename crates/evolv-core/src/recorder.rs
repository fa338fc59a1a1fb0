//! The decision recorder: binds every decision to its audit write.
//!
//! The recorder enforces the EVOLV audit model:
//!
//!   Decide → Append (row + optional archive) → Release value to caller
//!
//! The invariant is absolute: a decision value is only returned once its
//! ledger append has succeeded. If the append fails, the value is dropped and
//! the audit error is returned instead, so an unaudited decision can never
//! look like it succeeded.

use std::sync::Arc;

use tracing::{debug, warn};

use evolv_contracts::{
    audit::{AppendReceipt, AuditEntry},
    error::EvolvResult,
};

use crate::traits::AuditSink;

/// A decision value together with proof that it was audited.
#[derive(Debug, Clone)]
pub struct Audited<T> {
    pub value: T,
    pub receipt: AppendReceipt,
}

/// Routes decisions through a shared `AuditSink`.
///
/// Cheap to clone; every clone writes to the same sink, so all agents built
/// from one recorder share the ledger's serialization point.
#[derive(Clone)]
pub struct DecisionRecorder {
    sink: Arc<dyn AuditSink>,
}

impl DecisionRecorder {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Audit `entry` and release `value` only if the append succeeded.
    ///
    /// # Errors
    ///
    /// Any error from the sink (`AuditWriteFailed`, `ArchiveWriteFailed`,
    /// `ConfigError`) is returned unchanged and `value` is discarded.
    pub fn record<T>(&self, value: T, entry: AuditEntry) -> EvolvResult<Audited<T>> {
        debug!(
            agent = %entry.agent_name,
            action = %entry.action,
            has_trace = entry.trace.is_some(),
            "recording decision"
        );

        match self.sink.append(&entry) {
            Ok(receipt) => Ok(Audited { value, receipt }),
            Err(e) => {
                warn!(
                    agent = %entry.agent_name,
                    action = %entry.action,
                    error = %e,
                    "audit append failed; discarding decision"
                );
                Err(e)
            }
        }
    }

    /// Run `decide` and audit its result.
    ///
    /// Errors raised by `decide` itself (validation, grounding) are returned
    /// before anything is written.
    pub fn decide<T, F>(&self, decide: F) -> EvolvResult<Audited<T>>
    where
        F: FnOnce() -> EvolvResult<(T, AuditEntry)>,
    {
        let (value, entry) = decide()?;
        self.record(value, entry)
    }

    /// Append an entry that carries no decision value.
    pub fn note(&self, entry: AuditEntry) -> EvolvResult<AppendReceipt> {
        self.record((), entry).map(|audited| audited.receipt)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
