//! Live filesystem adapter using `std::fs`.

use std::path::Path;

use crate::ports::filesystem::{FileSystem, FsError};

/// Live filesystem adapter backed by real disk I/O.
pub struct LiveFileSystem;

impl FileSystem for LiveFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, FsError> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), FsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Write-then-rename so a concurrent reader never sees a torn manifest.
        let staging = path.with_extension("yaml.tmp");
        std::fs::write(&staging, contents)?;
        Ok(std::fs::rename(&staging, path)?)
    }

    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        Ok(std::fs::remove_file(path)?)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>, FsError> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                entries.push(name.to_string());
            }
        }
        entries.sort();
        Ok(entries)
    }
}
