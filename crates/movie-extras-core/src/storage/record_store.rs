use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::debug;

use super::models::FolderRecord;
use crate::error::Error;

/// Directory of JSON documents, one per media folder, keyed by folder name.
#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    /// Load the record for a folder; `Ok(None)` when none was ever saved.
    pub fn load(&self, name: &str) -> Result<Option<FolderRecord>, Error> {
        let path = self.path_for(name);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: FolderRecord = serde_json::from_str(&raw)?;
        debug!("Loaded record for '{}' from {}", name, path.display());
        Ok(Some(record))
    }

    pub fn save(&self, record: &FolderRecord) -> Result<(), Error> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&record.name);
        let serialized = serde_json::to_string_pretty(record)?;
        fs::write(&path, serialized)?;
        debug!("Saved record for '{}' to {}", record.name, path.display());
        Ok(())
    }
}
