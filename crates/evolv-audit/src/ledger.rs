//! The audit ledger.
//!
//! `AuditLedger` is the single mandatory audit sink. It owns its lock, its
//! row store, its optional archive and its impact table; callers receive it
//! by injection (usually as `Arc<dyn AuditSink>`).
//!
//! One append is one unit of work inside the lock:
//!
//! 1. stamp the row and compute its integrity hash
//! 2. commit the reasoning archive, if a trace was supplied
//! 3. append the row
//! 4. if the row append fails, remove the archive again
//!
//! No other append can interleave, so a row is never paired with another
//! row's archive.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use tracing::{info, warn};

use evolv_contracts::{
    audit::{AppendReceipt, AuditAction, AuditEntry, AuditRecord, ComplianceImpact, SYSTEM_USER},
    error::{EvolvError, EvolvResult},
};
use evolv_core::traits::{AuditSink, LedgerStore};

use crate::{
    archive::{ArchiveRecord, ReasoningArchive},
    config::LedgerConfig,
    hash::{persisted_hash, row_hash},
    impact::ImpactMap,
    store::{CsvLedgerStore, FsArchiveStore, MemoryArchiveStore, MemoryLedgerStore},
};

// ── Reports ──────────────────────────────────────────────────────────────────

/// A row whose stored hash no longer matches its fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TamperedRow {
    /// Zero-based data row index (the header is not counted).
    pub index: usize,
    pub stored_hash: String,
    pub recomputed_hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    pub rows_checked: usize,
    pub tampered: Vec<TamperedRow>,
}

impl IntegrityReport {
    pub fn is_intact(&self) -> bool {
        self.tampered.is_empty()
    }
}

/// Result of cross-checking every archive against the ledger rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairingReport {
    pub archives_checked: usize,
    /// Archives whose cross-reference matches no row.
    pub orphaned: Vec<String>,
    /// Archives sharing a cross-reference with another archive or whose
    /// cross-reference matches more than one row.
    pub ambiguous: Vec<String>,
    /// Archives whose self-hash does not verify.
    pub tampered: Vec<String>,
}

impl PairingReport {
    pub fn is_consistent(&self) -> bool {
        self.orphaned.is_empty() && self.ambiguous.is_empty() && self.tampered.is_empty()
    }
}

// ── Ledger ───────────────────────────────────────────────────────────────────

struct LedgerState {
    store: Box<dyn LedgerStore>,
    archive: Option<ReasoningArchive>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl LedgerState {
    /// Now at microsecond precision, or one microsecond past the previous
    /// row when that has not advanced, so persisted timestamps within a
    /// ledger are strictly increasing.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        self.stamp_after(Utc::now())
    }

    fn stamp_after(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let now = now.trunc_subsecs(6);
        let stamped = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(stamped);
        stamped
    }
}

/// Tamper-evident, append-only audit ledger with paired reasoning archives.
pub struct AuditLedger {
    state: Mutex<LedgerState>,
    impact: ImpactMap,
    default_user: String,
}

impl AuditLedger {
    /// Assemble a ledger from explicit parts.
    ///
    /// A ledger without an archive rejects traced entries.
    pub fn new(
        store: Box<dyn LedgerStore>,
        archive: Option<ReasoningArchive>,
        impact: ImpactMap,
    ) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                store,
                archive,
                last_timestamp: None,
            }),
            impact,
            default_user: SYSTEM_USER.to_string(),
        }
    }

    /// Set the identity recorded for entries that name no user.
    pub fn with_default_user(mut self, user: impl Into<String>) -> Self {
        self.default_user = user.into();
        self
    }

    /// A CSV trail with a filesystem archive directory, as configured.
    pub fn open(config: &LedgerConfig) -> EvolvResult<Self> {
        let impact = config.impact_map()?;
        let ledger = Self::new(
            Box::new(CsvLedgerStore::new(&config.ledger.trail_path)),
            Some(ReasoningArchive::new(Box::new(FsArchiveStore::new(
                &config.ledger.archive_dir,
            )))),
            impact,
        )
        .with_default_user(config.ledger.default_user.clone());

        info!(
            trail = %config.ledger.trail_path.display(),
            archives = %config.ledger.archive_dir.display(),
            "audit ledger opened"
        );
        Ok(ledger)
    }

    /// An in-memory ledger and archive with the built-in impact table.
    pub fn in_memory() -> Self {
        Self::new(
            Box::new(MemoryLedgerStore::new()),
            Some(ReasoningArchive::new(Box::new(MemoryArchiveStore::new()))),
            ImpactMap::builtin(),
        )
    }

    fn lock(&self) -> EvolvResult<MutexGuard<'_, LedgerState>> {
        self.state.lock().map_err(|e| EvolvError::AuditWriteFailed {
            reason: format!("audit ledger lock poisoned: {e}"),
        })
    }

    pub fn classify(&self, action: &AuditAction) -> ComplianceImpact {
        self.impact.classify(action)
    }

    /// Append one entry, archiving its trace in the same unit of work.
    ///
    /// Blocks until the ledger lock is available.
    ///
    /// # Errors
    ///
    /// - `ConfigError` if the entry carries a trace and this ledger has no
    ///   archive. Nothing is written.
    /// - `ArchiveWriteFailed` if the archive could not be stored. No row is
    ///   written.
    /// - `AuditWriteFailed` if the row could not be stored. Any archive
    ///   written for it is removed first.
    pub fn append(&self, entry: &AuditEntry) -> EvolvResult<AppendReceipt> {
        let mut guard = self.lock()?;
        let state = &mut *guard;

        if entry.trace.is_some() && state.archive.is_none() {
            return Err(EvolvError::ConfigError {
                reason: format!(
                    "entry '{}' carries a reasoning trace but the ledger has no archive store",
                    entry.action
                ),
            });
        }

        let timestamp = state
            .next_timestamp()
            .to_rfc3339_opts(SecondsFormat::Micros, true);
        let user_id = entry
            .user_id
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(self.default_user.as_str())
            .to_string();
        let compliance_impact = entry
            .impact_override
            .unwrap_or_else(|| self.impact.classify(&entry.action));
        let integrity_hash = row_hash(
            &timestamp,
            &user_id,
            &entry.agent_name,
            &entry.action,
            &entry.decision_logic,
            compliance_impact,
        );

        let record = AuditRecord {
            timestamp,
            user_id,
            agent_name: entry.agent_name.clone(),
            action: entry.action.clone(),
            decision_logic: entry.decision_logic.clone(),
            integrity_hash,
            compliance_impact,
        };

        let archive = match (&entry.trace, state.archive.as_mut()) {
            (Some(trace), Some(archive)) => Some(archive.write(&record, trace)?),
            _ => None,
        };

        if let Err(err) = state.store.append_row(&record) {
            let mut reason = match err {
                EvolvError::AuditWriteFailed { reason } => reason,
                other => other.to_string(),
            };
            if let (Some(location), Some(store)) = (&archive, state.archive.as_mut()) {
                match store.rollback(&record) {
                    Ok(()) => warn!(location = %location, "row append failed; archive removed"),
                    Err(rollback) => {
                        warn!(
                            location = %location,
                            error = %rollback,
                            "row append failed and archive could not be removed"
                        );
                        reason = format!(
                            "{reason}; orphaned archive left at '{location}' (rollback failed: {rollback})"
                        );
                    }
                }
            }
            return Err(EvolvError::AuditWriteFailed { reason });
        }

        info!(
            action = %record.action,
            agent = %record.agent_name,
            impact = %record.compliance_impact,
            hash = %record.integrity_hash,
            archived = archive.is_some(),
            "audit row appended"
        );

        Ok(AppendReceipt { record, archive })
    }

    /// Every persisted row, in append order.
    ///
    /// # Errors
    ///
    /// `AuditReadFailed` if a row carries an impact label outside the known
    /// set. `verify_integrity` still reports such a row by index.
    pub fn records(&self) -> EvolvResult<Vec<AuditRecord>> {
        self.lock()?
            .store
            .read_rows()?
            .into_iter()
            .map(AuditRecord::try_from)
            .collect()
    }

    /// Recompute every row hash over the raw persisted text and report
    /// mismatches.
    pub fn verify_integrity(&self) -> EvolvResult<IntegrityReport> {
        let rows = self.lock()?.store.read_rows()?;
        let tampered: Vec<TamperedRow> = rows
            .iter()
            .enumerate()
            .filter_map(|(index, row)| {
                let recomputed_hash = persisted_hash(row);
                (recomputed_hash != row.integrity_hash).then(|| TamperedRow {
                    index,
                    stored_hash: row.integrity_hash.clone(),
                    recomputed_hash,
                })
            })
            .collect();

        if !tampered.is_empty() {
            warn!(tampered = tampered.len(), "audit trail integrity check failed");
        }
        Ok(IntegrityReport {
            rows_checked: rows.len(),
            tampered,
        })
    }

    /// Check that every archive points at exactly one row.
    pub fn verify_pairing(&self) -> EvolvResult<PairingReport> {
        let state = self.lock()?;
        let Some(archive) = state.archive.as_ref() else {
            return Ok(PairingReport::default());
        };

        let mut row_counts: HashMap<String, usize> = HashMap::new();
        for row in state.store.read_rows()? {
            *row_counts.entry(row.integrity_hash).or_default() += 1;
        }

        let mut report = PairingReport::default();
        let mut by_reference: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for name in archive.names()? {
            report.archives_checked += 1;
            let record = archive.load(&name)?;
            if !record.is_intact() {
                report.tampered.push(name.clone());
            }
            match row_counts.get(&record.audit_trail_hash) {
                None => report.orphaned.push(name.clone()),
                Some(1) => {}
                Some(_) => report.ambiguous.push(name.clone()),
            }
            by_reference.entry(record.audit_trail_hash).or_default().push(name);
        }
        for names in by_reference.into_values().filter(|n| n.len() > 1) {
            for name in names {
                if !report.ambiguous.contains(&name) {
                    report.ambiguous.push(name);
                }
            }
        }

        if !report.is_consistent() {
            warn!(
                orphaned = report.orphaned.len(),
                ambiguous = report.ambiguous.len(),
                tampered = report.tampered.len(),
                "archive pairing check failed"
            );
        }
        Ok(report)
    }

    /// Archive names whose cross-reference starts with `prefix`.
    pub fn find_archives(&self, prefix: &str) -> EvolvResult<Vec<String>> {
        match self.lock()?.archive.as_ref() {
            Some(archive) => archive.find_by_hash_prefix(prefix),
            None => Ok(Vec::new()),
        }
    }

    pub fn load_archive(&self, name: &str) -> EvolvResult<ArchiveRecord> {
        let state = self.lock()?;
        let archive = state.archive.as_ref().ok_or_else(|| EvolvError::ConfigError {
            reason: "the ledger has no archive store".to_string(),
        })?;
        archive.load(name)
    }

    /// Recompute the self-hash of one archive.
    pub fn verify_archive(&self, name: &str) -> EvolvResult<bool> {
        Ok(self.load_archive(name)?.is_intact())
    }
}

impl AuditSink for AuditLedger {
    fn append(&self, entry: &AuditEntry) -> EvolvResult<AppendReceipt> {
        AuditLedger::append(self, entry)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
