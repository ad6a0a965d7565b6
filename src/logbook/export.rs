use chrono::Utc;
use std::path::{Path, PathBuf};

use super::error::LogbookError;

/// Writes exported log documents into a folder for the share
/// collaborator to pick up. The exporter does not care whether anything
/// downstream consumes the file.
pub struct FileExporter {
    folder: PathBuf,
}

impl FileExporter {
    pub fn new(folder: PathBuf) -> Self {
        Self { folder }
    }

    pub fn export(&self, serialized: &str) -> Result<PathBuf, LogbookError> {
        std::fs::create_dir_all(&self.folder)?;
        let path = self.folder.join(export_file_name(Utc::now()));
        std::fs::write(&path, serialized)?;
        Ok(path)
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }
}

fn export_file_name(now: chrono::DateTime<Utc>) -> String {
    format!("installer-log_{}.json", now.format("%Y%m%dT%H%M%SZ"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_timestamped_document() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = FileExporter::new(dir.path().join("exports"));

        let path = exporter.export("[]").unwrap();
        assert!(path.starts_with(dir.path().join("exports")));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("installer-log_"));
        assert!(name.ends_with(".json"));
    }
}
