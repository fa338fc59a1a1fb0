//! Core trait definitions for the EVOLV compliance core.
//!
//! These traits define where the trusted core meets its collaborators:
//!
//! - `AuditSink`: the single mandatory audit destination
//! - `LedgerStore`: durable, append-only row storage behind the ledger
//! - `ArchiveStore`: durable create-if-absent storage for reasoning archives
//! - `Retriever`: the external regulatory knowledge base
//!
//! Decision logic (risk scoring, rule checks) never touches storage directly;
//! it produces values that flow through an `AuditSink`.

use evolv_contracts::{
    audit::{AppendReceipt, ArchiveLocation, AuditEntry, AuditRecord, PersistedRow},
    error::EvolvResult,
    verify::ReferencePassage,
};

/// The audit sink every decision-producing component writes to.
///
/// A failed append is fatal to the decision that requested it.
pub trait AuditSink: Send + Sync {
    /// Append one entry, archiving its reasoning trace in the same unit of
    /// work when one is present.
    ///
    /// Blocks until the write completes; never skips or defers.
    fn append(&self, entry: &AuditEntry) -> EvolvResult<AppendReceipt>;
}

/// Durable row storage for the audit ledger.
///
/// Implementations are append-only: rows are never rewritten or removed.
/// The ledger serializes access, so `&mut self` is sufficient.
pub trait LedgerStore: Send {
    /// Append one row, creating the store (and its header) if absent.
    fn append_row(&mut self, record: &AuditRecord) -> EvolvResult<()>;

    /// Read every persisted row in append order, as raw text.
    fn read_rows(&self) -> EvolvResult<Vec<PersistedRow>>;
}

/// Durable storage for reasoning archives, addressed by derived name.
pub trait ArchiveStore: Send {
    /// Store `contents` under `name`, failing if that name already exists.
    ///
    /// Either the full contents become visible under `name` or nothing does.
    fn put_new(&mut self, name: &str, contents: &[u8]) -> EvolvResult<ArchiveLocation>;

    /// Remove an archive that was committed by the current unit of work.
    ///
    /// Only used to roll back when the paired ledger row could not be written.
    fn remove(&mut self, name: &str) -> EvolvResult<()>;

    /// List every stored archive name.
    fn list(&self) -> EvolvResult<Vec<String>>;

    /// Read an archive's raw contents.
    fn read(&self, name: &str) -> EvolvResult<Vec<u8>>;
}

/// The regulatory knowledge base.
///
/// Embedding and similarity search happen behind this trait; the core only
/// sees ranked passages with a score in [0, 1].
pub trait Retriever: Send + Sync {
    /// Return up to `top_k` passages scoring at least `min_score`, most
    /// relevant first.
    fn query(&self, text: &str, top_k: usize, min_score: f64) -> EvolvResult<Vec<ReferencePassage>>;
}
