//! Live adapters for real external interactions.

pub mod clock;
pub mod filesystem;
pub mod issues;

pub use clock::SystemClock;
pub use filesystem::LiveFileSystem;
pub use issues::GithubIssueTracker;
