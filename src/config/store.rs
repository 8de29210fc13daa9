//! Store and dump location configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the catalog store lives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Data directory; the store is created in `<data_dir>/catalog`
    pub data_dir: PathBuf,
}

impl StoreConfig {
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("catalog")
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: directories::ProjectDirs::from("", "", "olindex")
                .map(|d| d.data_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".olindex")),
        }
    }
}

/// Where downloaded dump files are found
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpsConfig {
    /// Directory holding `ol_dump_<category>_latest.txt.gz` files.
    /// Defaults to `<data_dir>/dumps`.
    pub dir: Option<PathBuf>,
}

impl DumpsConfig {
    pub fn resolve_dir(&self, store: &StoreConfig) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| store.data_dir.join("dumps"))
    }
}
