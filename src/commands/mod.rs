//! Command dispatch and handlers.

pub mod apply;
pub mod delete;
pub mod reconcile;
pub mod run;
pub mod status;

use crate::cli::{Cli, Command};
use crate::config::ControllerConfig;
use crate::context::ServiceContext;
use crate::model::ResourceKey;

/// Dispatch a parsed command to its handler.
///
/// Commands that reach GitHub (`run`, `reconcile`) need a token; the rest
/// work on the record store alone. When `GITHUB_ISSUER_RECORD` is set,
/// tracker traffic is recorded to that cassette path.
///
/// # Errors
///
/// Returns an error string if configuration is invalid or the handler fails.
pub async fn dispatch(cli: &Cli) -> Result<(), String> {
    let config = ControllerConfig::from_args(&cli.global).map_err(|e| e.to_string())?;
    match &cli.command {
        Command::Run(args) => {
            let ctx = ServiceContext::live(&config)?;
            run::run(&ctx, args).await
        }
        Command::Reconcile { key } => {
            let key = parse_key(key)?;
            let ctx = ServiceContext::live(&config)?;
            reconcile::run(&ctx, &key).await
        }
        Command::Apply { file } => apply::run(&ServiceContext::offline(&config), file).await,
        Command::Delete { key } => {
            delete::run(&ServiceContext::offline(&config), &parse_key(key)?).await
        }
        Command::Status { key } => {
            let key = key.as_deref().map(parse_key).transpose()?;
            status::run(&ServiceContext::offline(&config), key.as_ref()).await
        }
    }
}

fn parse_key(raw: &str) -> Result<ResourceKey, String> {
    raw.parse()
}
