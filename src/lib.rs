//! Reconciliation controller that keeps GitHub issues in line with
//! declarative `GithubIssuer` records.
//!
//! The pieces, leaf first:
//!
//! - [`ports`] and [`adapters`]: the tracker, store, filesystem, and clock
//!   boundaries with live, in-memory, recording, and replaying adapters.
//! - [`github::IssueClient`]: title-keyed lookup, create, update, and close.
//! - [`controller::Reconciler`]: one pass of the sync state machine, plus
//!   the finalizer-gated deletion protocol.
//! - [`controller::Runner`]: the polling loop that delivers passes.

pub mod adapters;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod github;
pub mod model;
pub mod ports;
pub mod store;

use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// `--help` and `--version` print to stdout and succeed.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub async fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => {
            print!("{err}");
            return Ok(());
        }
        Err(err) => return Err(err.to_string()),
    };
    commands::dispatch(&cli).await
}
