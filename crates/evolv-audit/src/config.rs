//! Ledger configuration.
//!
//! ```toml
//! [ledger]
//! trail_path = "output/audit_trail.csv"
//! archive_dir = "output/logic_archives"
//! default_user = "SYSTEM"
//!
//! [impact]
//! CUSTOM_ACTION = "Data Integrity"
//! ```
//!
//! Every key is optional; omitted keys take the defaults shown above.

use std::{collections::BTreeMap, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};

use evolv_contracts::{
    audit::SYSTEM_USER,
    error::{EvolvError, EvolvResult},
};

use crate::impact::ImpactMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSection {
    /// CSV file holding the ledger rows.
    pub trail_path: PathBuf,
    /// Directory holding the reasoning archives.
    pub archive_dir: PathBuf,
    /// Identity recorded when an entry names no user.
    pub default_user: String,
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            trail_path: PathBuf::from("output/audit_trail.csv"),
            archive_dir: PathBuf::from("output/logic_archives"),
            default_user: SYSTEM_USER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub ledger: LedgerSection,
    /// Action tag → impact label, layered over the built-in table.
    pub impact: BTreeMap<String, String>,
}

impl LedgerConfig {
    /// Parse a configuration from a TOML string.
    ///
    /// Impact labels are checked here so a bad file fails at load time.
    pub fn from_toml_str(toml_str: &str) -> EvolvResult<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| EvolvError::ConfigError {
            reason: format!("failed to parse ledger config TOML: {e}"),
        })?;
        config.impact_map()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> EvolvResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| EvolvError::ConfigError {
            reason: format!("failed to read ledger config '{}': {e}", path.display()),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Root all relative paths under `root`.
    pub fn rooted_at(mut self, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        if self.ledger.trail_path.is_relative() {
            self.ledger.trail_path = root.join(&self.ledger.trail_path);
        }
        if self.ledger.archive_dir.is_relative() {
            self.ledger.archive_dir = root.join(&self.ledger.archive_dir);
        }
        self
    }

    /// The built-in impact table with this configuration's overrides applied.
    pub fn impact_map(&self) -> EvolvResult<ImpactMap> {
        let mut map = ImpactMap::builtin();
        map.apply_overrides(&self.impact)?;
        Ok(map)
    }
}
