//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::adapters::live::issues::DEFAULT_API_URL;

/// Top-level CLI parser for `github-issuer`.
#[derive(Debug, Parser)]
#[command(
    name = "github-issuer",
    version,
    about = "Keep GitHub issues in line with declarative GithubIssuer records"
)]
pub struct Cli {
    /// Settings shared by every command.
    #[command(flatten)]
    pub global: GlobalArgs,
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Flags accepted by every command; each can also come from the environment.
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Directory holding `<namespace>/<name>.yaml` records.
    #[arg(
        long,
        env = "GITHUB_ISSUER_RECORDS_DIR",
        default_value = ".github-issuer/records",
        global = true
    )]
    pub records_dir: PathBuf,

    /// Token used to authenticate against the GitHub API.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    pub github_token: Option<String>,

    /// GitHub API root; point at `/api/v3` for GitHub Enterprise.
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub github_api_url: String,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, default_value_t = 30, global = true)]
    pub request_timeout_secs: u64,

    /// Record every tracker call into a cassette at this path.
    #[arg(long, env = "GITHUB_ISSUER_RECORD", global = true, hide = true)]
    pub record: Option<PathBuf>,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the controller loop until interrupted.
    Run(RunArgs),
    /// Run a single reconciliation pass for one record.
    Reconcile {
        /// Record key as `<namespace>/<name>` or a bare name.
        key: String,
    },
    /// Create a record, or replace the spec of an existing one, from a manifest.
    Apply {
        /// Path to a YAML `GithubIssuer` manifest.
        file: PathBuf,
    },
    /// Request deletion of a record.
    Delete {
        /// Record key as `<namespace>/<name>` or a bare name.
        key: String,
    },
    /// Show conditions of one record, or list all records.
    Status {
        /// Record key; omit to list every record.
        key: Option<String>,
    },
}

/// Flags for the controller loop.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Seconds between reconciliations of an unchanged record.
    #[arg(long, default_value_t = 60)]
    pub resync_secs: u64,

    /// Milliseconds between store polls.
    #[arg(long, default_value_t = 1000)]
    pub poll_millis: u64,

    /// Deadline for a single pass, in seconds.
    #[arg(long, default_value_t = 120)]
    pub pass_timeout_secs: u64,

    /// Maximum passes running at once.
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,
}
