//! In-memory filesystem.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::ports::filesystem::{FileSystem, FsError};

/// Filesystem held in a map of path to contents.
///
/// Directories exist implicitly whenever some file lives under them.
#[derive(Default)]
pub struct MemoryFileSystem {
    files: Mutex<BTreeMap<PathBuf, String>>,
}

impl MemoryFileSystem {
    /// Creates an empty filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files currently stored.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, FsError> {
        let files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        files.get(path).cloned().ok_or_else(|| format!("File not found: {}", path.display()).into())
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), FsError> {
        let mut files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        files.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        let mut files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| format!("File not found: {}", path.display()).into())
    }

    fn exists(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        files.contains_key(path) || files.keys().any(|k| k.starts_with(path) && k != path)
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>, FsError> {
        let files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = files
            .keys()
            .filter_map(|k| k.strip_prefix(path).ok())
            .filter_map(|rest| rest.components().next())
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        names.dedup();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_files_and_implicit_directories() {
        let fs = MemoryFileSystem::new();
        fs.write(Path::new("/root/a/one.yaml"), "1").unwrap();
        fs.write(Path::new("/root/a/two.yaml"), "2").unwrap();
        fs.write(Path::new("/root/b/three.yaml"), "3").unwrap();

        assert_eq!(fs.list_dir(Path::new("/root")).unwrap(), vec!["a", "b"]);
        assert_eq!(fs.list_dir(Path::new("/root/a")).unwrap(), vec!["one.yaml", "two.yaml"]);
        assert!(fs.exists(Path::new("/root/b")));
        assert!(!fs.exists(Path::new("/root/c")));
    }

    #[test]
    fn remove_missing_file_errors() {
        let fs = MemoryFileSystem::new();
        assert!(fs.remove_file(Path::new("/nope")).is_err());
        fs.write(Path::new("/yes"), "").unwrap();
        fs.remove_file(Path::new("/yes")).unwrap();
        assert_eq!(fs.file_count(), 0);
    }
}
