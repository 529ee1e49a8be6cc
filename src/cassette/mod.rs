//! Cassettes: recorded tracker traffic for deterministic replay.
//!
//! A recording session captures every call the controller makes to the
//! issue tracker, with its input and typed outcome, into a YAML file. A
//! replaying session serves those outcomes back in order, so a full
//! create/update/close lifecycle can be exercised without network access.

pub mod format;
pub mod recorder;
pub mod replayer;

use thiserror::Error;

/// Failures loading, writing, or replaying a cassette.
#[derive(Debug, Error)]
pub enum CassetteError {
    /// The cassette file could not be read or written.
    #[error("cassette I/O failed for {path}: {reason}")]
    Io {
        /// Cassette path.
        path: String,
        /// Underlying failure.
        reason: String,
    },

    /// The cassette file is not valid cassette YAML.
    #[error("cassette {path} is malformed: {reason}")]
    Parse {
        /// Cassette path.
        path: String,
        /// Parse failure.
        reason: String,
    },

    /// Nothing was recorded for this port/method pair.
    #[error("no interactions recorded for {port}::{method}; recorded pairs: [{available}]")]
    Unrecorded {
        /// Port name.
        port: String,
        /// Method name.
        method: String,
        /// Comma-separated `port::method` pairs the cassette does hold.
        available: String,
    },

    /// Every interaction for this port/method pair was already served.
    #[error("all {count} recorded {port}::{method} interactions were consumed")]
    Exhausted {
        /// Port name.
        port: String,
        /// Method name.
        method: String,
        /// How many were recorded.
        count: usize,
    },

    /// The call being replayed differs from the one recorded.
    #[error("interaction {seq} ({port}::{method}) was recorded with input {recorded}, called with {actual}")]
    InputMismatch {
        /// Sequence number of the recorded interaction.
        seq: u64,
        /// Port name.
        port: String,
        /// Method name.
        method: String,
        /// Recorded input as JSON.
        recorded: String,
        /// Actual input as JSON.
        actual: String,
    },

    /// A recorded output does not decode into the expected type.
    #[error("interaction {seq} has an undecodable output: {reason}")]
    Decode {
        /// Sequence number of the recorded interaction.
        seq: u64,
        /// Decode failure.
        reason: String,
    },
}
