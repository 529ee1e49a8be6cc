//! The controller: per-record reconciliation and the loop that drives it.

pub mod finalizer;
pub mod reconciler;
pub mod runner;

pub use finalizer::FINALIZER;
pub use reconciler::{Outcome, Reconciler};
pub use runner::{Backoff, Runner, RunnerConfig, TickReport};
