//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the reconciler and an external
//! system (time, filesystem, the issue tracker, the record store).
//! Implementations live in `src/adapters/`.

pub mod clock;
pub mod filesystem;
pub mod issues;
pub mod store;

pub use clock::Clock;
pub use filesystem::{FileSystem, FsError};
pub use issues::{Issue, IssueEdit, IssueFuture, IssueState, IssueTracker, RepoRef};
pub use store::{RecordRef, RecordStore, StoreFuture};
