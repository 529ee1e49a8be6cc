//! In-memory adapters for tests and dry runs.
//!
//! These hold all state behind a mutex and never touch disk or network.

pub mod clock;
pub mod filesystem;
pub mod issues;

pub use clock::ManualClock;
pub use filesystem::MemoryFileSystem;
pub use issues::{MemoryIssueTracker, TrackerMethod};
