//! Storage backends for the ledger and the reasoning archive.
//!
//! | Backend              | Trait          | Use                         |
//! |----------------------|----------------|-----------------------------|
//! | `CsvLedgerStore`     | `LedgerStore`  | durable CSV audit trail     |
//! | `MemoryLedgerStore`  | `LedgerStore`  | tests, dry runs             |
//! | `FsArchiveStore`     | `ArchiveStore` | durable archive directory   |
//! | `MemoryArchiveStore` | `ArchiveStore` | tests, dry runs             |
//!
//! The ledger serializes every call, so none of these lock internally.

use std::{
    collections::BTreeMap,
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use tracing::debug;

use evolv_contracts::{
    audit::{ArchiveLocation, AuditRecord, PersistedRow},
    error::{EvolvError, EvolvResult},
};
use evolv_core::traits::{ArchiveStore, LedgerStore};

/// Column order of the persisted trail.
pub const CSV_HEADER: [&str; 7] = [
    "Timestamp",
    "User_ID",
    "Agent_Name",
    "Action_Performed",
    "Decision_Logic",
    "Reasoning_Hash",
    "Compliance_Impact",
];

fn write_failed(path: &Path, e: impl std::fmt::Display) -> EvolvError {
    EvolvError::AuditWriteFailed {
        reason: format!("{}: {e}", path.display()),
    }
}

fn read_failed(path: &Path, e: impl std::fmt::Display) -> EvolvError {
    EvolvError::AuditReadFailed {
        reason: format!("{}: {e}", path.display()),
    }
}

fn ensure_dir(dir: &Path) -> io::Result<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    fs::create_dir_all(dir)
}

// ── CSV ledger ───────────────────────────────────────────────────────────────

/// Append-only CSV trail.
///
/// The file and its parent directory are created on first append. The
/// header is written only when the file is empty, so repeated appends never
/// duplicate it.
#[derive(Debug, Clone)]
pub struct CsvLedgerStore {
    path: PathBuf,
}

impl CsvLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStore for CsvLedgerStore {
    fn append_row(&mut self, record: &AuditRecord) -> EvolvResult<()> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent).map_err(|e| write_failed(parent, e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| write_failed(&self.path, e))?;
        let needs_header = file
            .metadata()
            .map_err(|e| write_failed(&self.path, e))?
            .len()
            == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            debug!(path = %self.path.display(), "initializing audit trail");
            writer
                .write_record(CSV_HEADER)
                .map_err(|e| write_failed(&self.path, e))?;
        }
        writer
            .serialize(record)
            .map_err(|e| write_failed(&self.path, e))?;

        let file = writer
            .into_inner()
            .map_err(|e| write_failed(&self.path, e.error()))?;
        file.sync_data().map_err(|e| write_failed(&self.path, e))
    }

    fn read_rows(&self) -> EvolvResult<Vec<PersistedRow>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path).map_err(|e| read_failed(&self.path, e))?;
        reader
            .deserialize()
            .collect::<Result<Vec<PersistedRow>, _>>()
            .map_err(|e| read_failed(&self.path, e))
    }
}

// ── In-memory ledger ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
pub struct MemoryLedgerStore {
    rows: Vec<PersistedRow>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn append_row(&mut self, record: &AuditRecord) -> EvolvResult<()> {
        self.rows.push(PersistedRow::from(record));
        Ok(())
    }

    fn read_rows(&self) -> EvolvResult<Vec<PersistedRow>> {
        Ok(self.rows.clone())
    }
}

// ── Filesystem archive ───────────────────────────────────────────────────────

/// One JSON file per archive in a flat directory.
///
/// Contents are staged in a temp file in the same directory and then
/// persisted without clobbering, so a name either holds a complete archive
/// or does not exist.
#[derive(Debug, Clone)]
pub struct FsArchiveStore {
    dir: PathBuf,
}

impl FsArchiveStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn archive_failed(path: &Path, e: impl std::fmt::Display) -> EvolvError {
        EvolvError::ArchiveWriteFailed {
            location: path.display().to_string(),
            reason: e.to_string(),
        }
    }
}

impl ArchiveStore for FsArchiveStore {
    fn put_new(&mut self, name: &str, contents: &[u8]) -> EvolvResult<ArchiveLocation> {
        let target = self.dir.join(name);
        ensure_dir(&self.dir).map_err(|e| Self::archive_failed(&self.dir, e))?;

        let mut staged =
            tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| Self::archive_failed(&target, e))?;
        staged
            .write_all(contents)
            .and_then(|_| staged.as_file().sync_all())
            .map_err(|e| Self::archive_failed(&target, e))?;
        staged
            .persist_noclobber(&target)
            .map_err(|e| Self::archive_failed(&target, e.error))?;

        Ok(ArchiveLocation(target.display().to_string()))
    }

    fn remove(&mut self, name: &str) -> EvolvResult<()> {
        let target = self.dir.join(name);
        fs::remove_file(&target).map_err(|e| Self::archive_failed(&target, e))
    }

    fn list(&self) -> EvolvResult<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.dir).map_err(|e| read_failed(&self.dir, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| read_failed(&self.dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') && name.ends_with(".json") {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn read(&self, name: &str) -> EvolvResult<Vec<u8>> {
        let path = self.dir.join(name);
        fs::read(&path).map_err(|e| read_failed(&path, e))
    }
}

// ── In-memory archive ────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
pub struct MemoryArchiveStore {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryArchiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn location(name: &str) -> ArchiveLocation {
        ArchiveLocation(format!("memory://{name}"))
    }
}

impl ArchiveStore for MemoryArchiveStore {
    fn put_new(&mut self, name: &str, contents: &[u8]) -> EvolvResult<ArchiveLocation> {
        if self.files.contains_key(name) {
            return Err(EvolvError::ArchiveWriteFailed {
                location: Self::location(name).0,
                reason: "an archive with this name already exists".to_string(),
            });
        }
        self.files.insert(name.to_string(), contents.to_vec());
        Ok(Self::location(name))
    }

    fn remove(&mut self, name: &str) -> EvolvResult<()> {
        self.files.remove(name);
        Ok(())
    }

    fn list(&self) -> EvolvResult<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }

    fn read(&self, name: &str) -> EvolvResult<Vec<u8>> {
        self.files.get(name).cloned().ok_or_else(|| EvolvError::AuditReadFailed {
            reason: format!("no archive named '{name}'"),
        })
    }
}
