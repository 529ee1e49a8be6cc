//! Filesystem port backing the file-based record store.

use std::path::Path;

/// Boxed error type shared by filesystem operations.
pub type FsError = Box<dyn std::error::Error + Send + Sync>;

/// Provides the handful of file operations the record store needs.
///
/// Abstracting the filesystem lets the store run against memory in tests
/// without touching the real disk.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or is not valid UTF-8.
    fn read_to_string(&self, path: &Path) -> Result<String, FsError>;

    /// Writes the given contents to a file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails (permissions, disk full, etc.).
    fn write(&self, path: &Path, contents: &str) -> Result<(), FsError>;

    /// Removes a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be removed.
    fn remove_file(&self, path: &Path) -> Result<(), FsError>;

    /// Returns `true` if the path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Lists the entry names in a directory, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not a directory or cannot be read.
    fn list_dir(&self, path: &Path) -> Result<Vec<String>, FsError>;
}
