//! Persisted tuning output
//!
//! Two JSON blobs live side by side in one directory: the tuned parameters
//! and the outlook table. The tuning job is the only writer; dashboards read
//! through [`StoreReader`]. Each write lands in a temporary file in the same
//! directory and is renamed over the old blob, so a reader sees either the
//! previous or the new content, never a torn file.

use crate::error::{ForecastError, Result};
use crate::models::ParameterSet;
use crate::outlook::OutlookTable;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// A named blob in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    TunedParams,
    Outlook,
}

impl Slot {
    pub fn file_name(&self) -> &'static str {
        match self {
            Slot::TunedParams => "tuned_params.json",
            Slot::Outlook => "outlook.json",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::TunedParams => write!(f, "tuned_params"),
            Slot::Outlook => write!(f, "outlook"),
        }
    }
}

fn read_slot<T: DeserializeOwned>(dir: &Path, slot: Slot) -> Result<T> {
    let path = dir.join(slot.file_name());
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ForecastError::MissingPersistedState(slot.to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    serde_json::from_str(&text)
        .map_err(|e| ForecastError::Serialization(format!("{}: {}", path.display(), e)))
}

/// Read-only view of a store directory
#[derive(Debug, Clone)]
pub struct StoreReader {
    dir: PathBuf,
}

impl StoreReader {
    /// The directory does not have to exist yet; reads then report missing state
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn read_parameters(&self) -> Result<ParameterSet> {
        let params: ParameterSet = read_slot(&self.dir, Slot::TunedParams)?;
        params
            .validate()
            .map_err(|e| ForecastError::Serialization(format!("stored parameters: {}", e)))?;
        Ok(params)
    }

    pub fn read_outlook(&self) -> Result<OutlookTable> {
        read_slot(&self.dir, Slot::Outlook)
    }
}

/// Writable store, owned by the tuning job
#[derive(Debug, Clone)]
pub struct ParameterStore {
    dir: PathBuf,
}

impl ParameterStore {
    /// Open a store directory, creating it if needed
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn reader(&self) -> StoreReader {
        StoreReader::new(&self.dir)
    }

    pub fn write_parameters(&self, params: &ParameterSet) -> Result<()> {
        params.validate()?;
        self.write_slot(Slot::TunedParams, params)
    }

    pub fn read_parameters(&self) -> Result<ParameterSet> {
        self.reader().read_parameters()
    }

    pub fn write_outlook(&self, outlook: &OutlookTable) -> Result<()> {
        self.write_slot(Slot::Outlook, outlook)
    }

    pub fn read_outlook(&self) -> Result<OutlookTable> {
        self.reader().read_outlook()
    }

    fn write_slot<T: Serialize>(&self, slot: Slot, value: &T) -> Result<()> {
        let json = serde_json::to_vec_pretty(value)?;
        let target = self.dir.join(slot.file_name());

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        debug!(tmp = %tmp.path().display(), "staged blob");
        tmp.persist(&target).map_err(|e| ForecastError::Io(e.error))?;

        info!(%slot, path = %target.display(), bytes = json.len(), "wrote store slot");
        Ok(())
    }
}
