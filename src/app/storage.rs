use std::fs;
use std::path::PathBuf;

use super::error::Result;

/// Durable key-value storage for the persisted snapshot: one JSON blob
/// under one fixed location.
pub trait Storage {
    /// Read the stored blob, or None if nothing has been stored yet.
    fn load(&self) -> Result<Option<String>>;

    /// Write the blob, replacing any previous value.
    fn store(&self, payload: &str) -> Result<()>;
}

/// Disk-backed storage under the platform data directory.
pub struct DiskStorage {
    path: PathBuf,
}

impl DiskStorage {
    pub fn new() -> Self {
        Self { path: default_snapshot_path() }
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Default for DiskStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for DiskStorage {
    fn load(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, payload: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, payload)?;
        Ok(())
    }
}

/// Returns the snapshot file path: data_dir/markpad/files.json
pub fn default_snapshot_path() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("markpad");
    path.push("files.json");
    path
}
