//! # evolv-core
//!
//! The trust boundary of the EVOLV compliance core.
//!
//! This crate provides:
//! - The trait seams (`AuditSink`, `LedgerStore`, `ArchiveStore`, `Retriever`)
//!   that separate decision logic from storage and retrieval collaborators
//! - The `DecisionRecorder` that makes every decision conditional on its
//!   audit write
//!
//! ## Usage
//!
//! ```rust,ignore
//! use evolv_core::{DecisionRecorder, traits::AuditSink};
//!
//! let recorder = DecisionRecorder::new(ledger);
//! let audited = recorder.record(assessment, entry)?;
//! println!("{}", audited.receipt.integrity_hash());
//! ```

pub mod recorder;
pub mod traits;

pub use recorder::{Audited, DecisionRecorder};
