//! Configuration and CLI argument handling

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// CLI argument parsing structure
#[derive(Debug, Parser)]
#[command(name = "branch-clock")]
#[command(about = "Times work per git branch and logs it to an issue tracker")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Config {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub serve: ServeArgs,

    /// Settings file (defaults to the XDG config directory)
    #[arg(long, global = true, env = "BRANCH_CLOCK_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the daemon (default)
    Serve(ServeArgs),
    /// Store tracker settings and credential
    Configure(ConfigureArgs),
}

/// Daemon options
#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Repository whose current branch selects the task
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,

    /// How long a branch lookup is reused, in milliseconds
    #[arg(long, default_value = "1000")]
    pub branch_cache_ms: u64,

    /// Tracker request timeout in seconds
    #[arg(long, default_value = "30")]
    pub http_timeout_secs: u64,

    /// Tracker credential, overrides the keyring
    #[arg(long, env = "BRANCH_CLOCK_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

/// First-run / credential reconfiguration options
#[derive(Debug, Clone, Args)]
pub struct ConfigureArgs {
    /// Base URL of the tracker, e.g. https://jira.example.com
    #[arg(long)]
    pub tracker_url: String,

    /// Personal access token
    #[arg(long, env = "BRANCH_CLOCK_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Seconds without activity before the inactivity prompt
    #[arg(long, default_value = "600")]
    pub inactivity_timeout: u64,

    /// Log on task switch without asking
    #[arg(long)]
    pub auto_logging: bool,

    /// Minimum accrued seconds worth logging
    #[arg(long, default_value = "300")]
    pub auto_logging_time: u64,

    /// Store the token without probing the tracker
    #[arg(long)]
    pub skip_validation: bool,

    /// Tracker request timeout in seconds
    #[arg(long, default_value = "30")]
    pub http_timeout_secs: u64,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}

impl ServeArgs {
    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve_with_defaults() {
        let config = Config::try_parse_from(["branch-clock"]).unwrap();
        assert!(config.command.is_none());
        assert_eq!(config.serve.address(), "127.0.0.1:20554");
        assert_eq!(config.serve.branch_cache_ms, 1000);
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn configure_subcommand_parses_thresholds() {
        let config = Config::try_parse_from([
            "branch-clock",
            "-v",
            "configure",
            "--tracker-url",
            "https://jira.example.com",
            "--token",
            "secret",
            "--auto-logging",
            "--auto-logging-time",
            "120",
        ])
        .unwrap();

        assert_eq!(config.log_level(), "debug");
        match config.command {
            Some(Command::Configure(args)) => {
                assert_eq!(args.tracker_url, "https://jira.example.com");
                assert!(args.auto_logging);
                assert_eq!(args.auto_logging_time, 120);
                assert_eq!(args.inactivity_timeout, 600);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
