use std::fs;
use std::path::PathBuf;

use crate::errors::CoreError;
use crate::models::instrument::Instrument;

use super::format;

const FILE_EXT: &str = "ivst";

/// Per-instrument market-data snapshots on disk, one file per symbol.
///
/// Written after every successful refresh and read when an instrument is
/// first referenced, so a new session starts from cached data instead of an
/// immediate network fetch.
pub struct InstrumentStore {
    dir: PathBuf,
}

impl InstrumentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{FILE_EXT}", symbol.trim().to_uppercase()))
    }

    /// Serialize and write an instrument snapshot.
    pub fn save(&self, instrument: &Instrument) -> Result<(), CoreError> {
        let payload = bincode::serialize(instrument).map_err(|e| {
            CoreError::Serialization(format!(
                "Failed to serialize instrument {}: {e}",
                instrument.symbol
            ))
        })?;
        let bytes = format::write_file(format::CURRENT_VERSION, &payload);

        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(&instrument.symbol), bytes)?;
        Ok(())
    }

    /// Load a cached instrument snapshot. `Ok(None)` when none exists.
    pub fn load(&self, symbol: &str) -> Result<Option<Instrument>, CoreError> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(path)?;
        let (version, payload) = format::read_file(&bytes)?;
        Ok(Some(decode_instrument(version, payload)?))
    }
}

/// Version-dispatch point for instrument payloads, mirroring the catalog
/// decode path.
fn decode_instrument(version: u16, payload: &[u8]) -> Result<Instrument, CoreError> {
    match version {
        1 => bincode::deserialize(payload).map_err(|e| {
            CoreError::Deserialization(format!("Failed to deserialize instrument: {e}"))
        }),
        v => Err(CoreError::UnsupportedVersion(v)),
    }
}
