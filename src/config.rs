//! Validated runtime configuration built from CLI flags and environment.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::cli::{GlobalArgs, RunArgs};
use crate::controller::RunnerConfig;

/// Configuration that cannot be used as given.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A duration or count that must be positive was zero.
    #[error("--{flag} must be greater than zero")]
    Zero {
        /// Offending flag, without dashes.
        flag: &'static str,
    },

    /// A command that talks to GitHub was run without a token.
    #[error("GITHUB_TOKEN is not set; pass --github-token or export GITHUB_TOKEN")]
    MissingToken,

    /// The API root is not an http(s) URL.
    #[error("--github-api-url must start with http:// or https://, got '{0}'")]
    ApiUrl(String),
}

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Root of the record store.
    pub records_dir: PathBuf,
    /// GitHub token, if one was supplied.
    pub github_token: Option<String>,
    /// GitHub API root.
    pub github_api_url: String,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Cassette path when tracker traffic should be recorded.
    pub record: Option<PathBuf>,
}

fn positive(value: u64, flag: &'static str) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Zero { flag });
    }
    Ok(value)
}

impl ControllerConfig {
    /// Validates the global flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the timeout is zero or the API URL is not http(s).
    pub fn from_args(args: &GlobalArgs) -> Result<Self, ConfigError> {
        let timeout = positive(args.request_timeout_secs, "request-timeout-secs")?;
        let url = args.github_api_url.trim();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::ApiUrl(url.to_string()));
        }
        Ok(Self {
            records_dir: args.records_dir.clone(),
            github_token: args.github_token.clone().filter(|t| !t.trim().is_empty()),
            github_api_url: url.to_string(),
            request_timeout: Duration::from_secs(timeout),
            record: args.record.clone(),
        })
    }

    /// The GitHub token, required by commands that reach the tracker.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingToken`] when none was supplied.
    pub fn token(&self) -> Result<&str, ConfigError> {
        self.github_token.as_deref().ok_or(ConfigError::MissingToken)
    }
}

/// Builds the runner settings from `run` flags.
///
/// # Errors
///
/// Returns an error if any interval, deadline, or the concurrency is zero.
pub fn runner_config(args: &RunArgs) -> Result<RunnerConfig, ConfigError> {
    if args.concurrency == 0 {
        return Err(ConfigError::Zero { flag: "concurrency" });
    }
    Ok(RunnerConfig {
        resync: Duration::from_secs(positive(args.resync_secs, "resync-secs")?),
        poll: Duration::from_millis(positive(args.poll_millis, "poll-millis")?),
        pass_timeout: Duration::from_secs(positive(args.pass_timeout_secs, "pass-timeout-secs")?),
        concurrency: args.concurrency,
        ..RunnerConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("github-issuer").chain(args.iter().copied()))
    }

    #[test]
    fn run_flags_become_runner_config() {
        let cli = parse(&["run", "--resync-secs", "5", "--poll-millis", "250", "--concurrency", "2"]);
        let Command::Run(args) = cli.command else { panic!("expected run") };
        let config = runner_config(&args).unwrap();
        assert_eq!(config.resync, Duration::from_secs(5));
        assert_eq!(config.poll, Duration::from_millis(250));
        assert_eq!(config.concurrency, 2);
    }

    #[test]
    fn zero_values_are_rejected() {
        let cli = parse(&["run", "--concurrency", "0"]);
        let Command::Run(args) = cli.command else { panic!("expected run") };
        assert_eq!(runner_config(&args).unwrap_err(), ConfigError::Zero { flag: "concurrency" });

        let cli = parse(&["status", "--request-timeout-secs", "0"]);
        assert!(matches!(ControllerConfig::from_args(&cli.global), Err(ConfigError::Zero { .. })));
    }

    #[test]
    fn blank_token_counts_as_missing() {
        let cli = parse(&["status", "--github-token", "  "]);
        let config = ControllerConfig::from_args(&cli.global).unwrap();
        assert_eq!(config.token(), Err(ConfigError::MissingToken));
    }

    #[test]
    fn api_url_must_be_http() {
        let cli = parse(&["status", "--github-api-url", "ftp://example.com"]);
        assert!(matches!(ControllerConfig::from_args(&cli.global), Err(ConfigError::ApiUrl(_))));
    }
}
