//! Cassette data structures.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CassetteError;

/// A single recorded call to a port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    /// Position in the whole session, assigned by the recorder.
    pub seq: u64,
    /// Port name, e.g. `"issues"`.
    pub port: String,
    /// Method invoked on the port.
    pub method: String,
    /// Call arguments.
    pub input: serde_json::Value,
    /// Outcome, as `{"Ok": value}` or `{"Err": error}`.
    pub output: serde_json::Value,
}

/// A recorded session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cassette {
    /// Human-readable session name.
    pub name: String,
    /// When recording finished.
    pub recorded_at: DateTime<Utc>,
    /// Version of the controller that recorded the session.
    #[serde(default)]
    pub controller_version: String,
    /// Calls in the order they were made.
    pub interactions: Vec<Interaction>,
}

impl Cassette {
    /// Reads a cassette from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a cassette.
    pub fn load(path: &Path) -> Result<Self, CassetteError> {
        let content = std::fs::read_to_string(path).map_err(|e| CassetteError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_yaml::from_str(&content).map_err(|e| CassetteError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}
