//! # evolv-audit
//!
//! Tamper-evident audit ledger for the EVOLV compliance core.
//!
//! - [`ledger::AuditLedger`] appends rows whose SHA-256 integrity hash is
//!   reproducible from the visible fields, and pairs each traced row with a
//!   reasoning archive in one locked unit of work.
//! - [`archive::ReasoningArchive`] stores self-hashed JSON archives named by
//!   action, timestamp and hash prefix.
//! - [`store`] holds the CSV/filesystem backends and their in-memory twins.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use evolv_audit::{AuditLedger, LedgerConfig};
//!
//! let ledger = AuditLedger::open(&LedgerConfig::default())?;
//! let receipt = ledger.append(&entry)?;
//! assert!(ledger.verify_integrity()?.is_intact());
//! ```

pub mod archive;
pub mod config;
pub mod hash;
pub mod impact;
pub mod ledger;
pub mod store;

pub use archive::{archive_name, ArchiveRecord, ReasoningArchive};
pub use config::LedgerConfig;
pub use impact::ImpactMap;
pub use ledger::{AuditLedger, IntegrityReport, PairingReport, TamperedRow};
pub use store::{CsvLedgerStore, FsArchiveStore, MemoryArchiveStore, MemoryLedgerStore};

// ── Tests ─────────────────────────────────────────────────────────────────────
