use super::{ConnectionSource, SourceError};
use crate::connection::ConnectionRecord;
use std::fs;
use std::path::{Path, PathBuf};

/// Snapshot read from a JSON array of records.
///
/// The file is read again on every poll, so it can be edited while watched.
#[derive(Debug, Clone)]
pub struct JsonSnapshotSource {
    path: PathBuf,
}

impl JsonSnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read one snapshot file without building a source
    pub fn read(path: &Path) -> Result<Vec<ConnectionRecord>, SourceError> {
        let raw = fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SourceError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl ConnectionSource for JsonSnapshotSource {
    fn snapshot(&mut self) -> Result<Vec<ConnectionRecord>, SourceError> {
        Self::read(&self.path)
    }
}
