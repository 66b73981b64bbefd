use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use replay::config::{ReplayConfig, SuccessRange};

/// Replays recorded sensor readings against the plant analysis API.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log library activity to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send every test request in the file, one at a time
    Send(SendArgs),
    /// Create the API database if it does not exist
    BootstrapDb(BootstrapArgs),
}

#[derive(Args, Debug, Default)]
pub struct SendArgs {
    /// JSON file holding the test requests
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Endpoint the requests are posted to
    #[arg(short, long)]
    pub url: Option<String>,

    /// Seconds to wait between requests
    #[arg(short, long)]
    pub delay: Option<f64>,

    /// Per-request timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Which statuses count as success: any-2xx or ok-only
    #[arg(long)]
    pub success_range: Option<SuccessRange>,

    /// Do not ask for confirmation before sending
    #[arg(short, long)]
    pub yes: bool,
}

impl SendArgs {
    /// Flags win over replay.toml and REPLAY_* variables.
    pub fn apply(&self, mut config: ReplayConfig) -> ReplayConfig {
        if let Some(file) = &self.file {
            config.requests_file = file.clone();
        }
        if let Some(url) = &self.url {
            config.api_url = url.clone();
        }
        if let Some(delay) = self.delay {
            config.request_delay_secs = delay;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(success_range) = self.success_range {
            config.success_range = success_range;
        }
        config
    }
}

#[derive(Args, Debug)]
pub struct BootstrapArgs {
    /// Database to create, overrides DB_NAME
    #[arg(long)]
    pub name: Option<String>,

    /// Print the statement instead of running it
    #[arg(long)]
    pub print: bool,
}
