use std::io::ErrorKind;
use std::path::PathBuf;

use super::error::LogbookError;

/// Key-value persistence boundary for the serialized installer log.
/// One logical key: get, set, delete.
pub trait LogStore: Send + Sync {
    fn get(&self) -> Result<Option<String>, LogbookError>;
    fn set(&self, payload: &str) -> Result<(), LogbookError>;
    fn delete(&self) -> Result<(), LogbookError>;
}

/// Stores the serialized log as a single file on disk.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl LogStore for FileStore {
    fn get(&self) -> Result<Option<String>, LogbookError> {
        match std::fs::read_to_string(&self.path) {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, payload: &str) -> Result<(), LogbookError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, payload)?;
        Ok(())
    }

    fn delete(&self) -> Result<(), LogbookError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
