//! Store configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use lockstep_core::error::StoreError;

/// Where and how to open the account database.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the RocksDB files.
    pub path: PathBuf,
    /// Create the database (and its column families) if absent.
    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("data").join("accounts"), create_if_missing: true }
    }
}

impl StoreConfig {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf(), ..Self::default() }
    }

    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        serde_json::from_str(json).map_err(|e| StoreError::Codec(e.to_string()))
    }
}
