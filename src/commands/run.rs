//! `github-issuer run` command.

use crate::cli::RunArgs;
use crate::config::runner_config;
use crate::context::ServiceContext;
use crate::controller::{Reconciler, Runner};

/// Execute the `run` command: poll the store and reconcile until Ctrl-C.
///
/// # Errors
///
/// Returns an error string if the runner flags are invalid.
pub async fn run(ctx: &ServiceContext, args: &RunArgs) -> Result<(), String> {
    let config = runner_config(args).map_err(|e| e.to_string())?;
    let mut runner = Runner::new(Reconciler::from_context(ctx), config);
    runner.run().await;
    Ok(())
}
