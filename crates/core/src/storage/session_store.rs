use std::fs;
use std::path::PathBuf;

use crate::errors::CoreError;
use crate::models::catalog::Catalog;

use super::format;

const FILE_PREFIX: &str = "session_";
const FILE_EXT: &str = "ivst";

/// Keyed store of catalog snapshots (whole sessions) on disk.
///
/// One file per session: `session_<id>.ivst`. A snapshot captures the full
/// object graph — all accounts and every instrument reachable from them — so
/// `load(save(x))` reproduces `x` in all observable fields.
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir
            .join(format!("{FILE_PREFIX}{session_id}.{FILE_EXT}"))
    }

    /// Serialize and write a catalog snapshot under `session_id`.
    /// Returns the id for symmetry with key generation at the call site.
    pub fn save(&self, catalog: &Catalog, session_id: &str) -> Result<String, CoreError> {
        let payload = bincode::serialize(catalog)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize catalog: {e}")))?;
        let bytes = format::write_file(format::CURRENT_VERSION, &payload);

        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(session_id), bytes)?;
        Ok(session_id.to_string())
    }

    /// Load a catalog snapshot. `Ok(None)` when no such session exists;
    /// errors only for unreadable or corrupt files.
    pub fn load(&self, session_id: &str) -> Result<Option<Catalog>, CoreError> {
        let path = self.path_for(session_id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(path)?;
        let (version, payload) = format::read_file(&bytes)?;
        Ok(Some(decode_catalog(version, payload)?))
    }

    /// All stored session ids, sorted. Empty when the directory does not
    /// exist yet.
    pub fn list(&self) -> Result<Vec<String>, CoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(stem) = name
                .strip_prefix(FILE_PREFIX)
                .and_then(|rest| rest.strip_suffix(&format!(".{FILE_EXT}")))
            {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Single version-dispatch point for catalog payloads. Older versions get
/// migrated to the current record shape here, once, at load time.
fn decode_catalog(version: u16, payload: &[u8]) -> Result<Catalog, CoreError> {
    match version {
        1 => bincode::deserialize(payload)
            .map_err(|e| CoreError::Deserialization(format!("Failed to deserialize catalog: {e}"))),
        v => Err(CoreError::UnsupportedVersion(v)),
    }
}
