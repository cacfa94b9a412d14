pub mod format;
pub mod instrument_store;
pub mod session_store;

use std::path::PathBuf;

/// Where snapshots live on disk: whole-session catalogs and per-instrument
/// market-data caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub session_dir: PathBuf,
    pub instrument_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            session_dir: PathBuf::from("saved_sessions"),
            instrument_dir: PathBuf::from("instrument_data"),
        }
    }
}
