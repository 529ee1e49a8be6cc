//! Collects interactions and writes them out as a cassette.

use std::path::{Path, PathBuf};

use chrono::Utc;

use super::format::{Cassette, Interaction};
use super::CassetteError;

/// Accumulates interactions for one recording session.
#[derive(Debug)]
pub struct CassetteRecorder {
    path: PathBuf,
    name: String,
    interactions: Vec<Interaction>,
}

impl CassetteRecorder {
    /// Creates a recorder that will write to `path`.
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self { path: path.into(), name: name.into(), interactions: Vec::new() }
    }

    /// Destination of the cassette file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends an interaction, numbering it after the ones already held.
    pub fn record(
        &mut self,
        port: impl Into<String>,
        method: impl Into<String>,
        input: serde_json::Value,
        output: serde_json::Value,
    ) {
        let seq = self.interactions.len() as u64;
        self.interactions.push(Interaction {
            seq,
            port: port.into(),
            method: method.into(),
            input,
            output,
        });
    }

    /// Number of interactions recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    /// Writes everything recorded so far, replacing any previous file.
    ///
    /// Can be called repeatedly; each call rewrites the whole cassette.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn flush(&self) -> Result<&Path, CassetteError> {
        let io_err = |e: &dyn std::fmt::Display| CassetteError::Io {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        };
        let cassette = Cassette {
            name: self.name.clone(),
            recorded_at: Utc::now(),
            controller_version: env!("CARGO_PKG_VERSION").to_string(),
            interactions: self.interactions.clone(),
        };
        let yaml = serde_yaml::to_string(&cassette).map_err(|e| io_err(&e))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| io_err(&e))?;
        }
        std::fs::write(&self.path, yaml).map_err(|e| io_err(&e))?;
        Ok(&self.path)
    }
}
