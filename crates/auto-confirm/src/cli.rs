use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use confirm_daemon::DEFAULT_PORT;
use confirm_engine::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "auto-confirm",
    version,
    about = "Policy gate that auto-approves, denies, or defers confirmation requests"
)]
pub struct Cli {
    /// Path to the configuration file (default: ~/.auto-confirm.json)
    #[arg(short, long, global = true, env = "CONFIG_FILE_PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show configuration and metrics
    Status,

    /// Enable auto-confirmation
    Enable,

    /// Disable auto-confirmation
    Disable,

    /// Show metrics
    Metrics {
        /// Reset counters after printing them
        #[arg(long)]
        reset: bool,
    },

    /// Run a message through the gate and print the decision
    Test {
        /// Message to evaluate
        message: String,

        /// Action description appended to the message
        #[arg(short, long, default_value = "")]
        action: String,
    },

    /// Initialize the gate and print the active policy
    Init,

    /// Manage the always/never-confirm pattern lists
    #[command(subcommand)]
    Patterns(PatternsCommand),

    /// Show or change the configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Run the HTTP daemon
    Daemon {
        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Address to bind to
        #[arg(long, default_value = "127.0.0.1")]
        bind: IpAddr,
    },
}

#[derive(Subcommand, Debug)]
pub enum PatternsCommand {
    /// List both pattern lists
    List,

    /// Add a pattern that is always auto-confirmed
    AddAlways { pattern: String },

    /// Add a pattern that is never auto-confirmed
    AddNever { pattern: String },

    /// Remove a pattern from both lists
    Remove { pattern: String },

    /// Restore the default pattern lists
    Reset,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the configuration as JSON
    Show,

    /// Change configuration values
    Set(SetArgs),

    /// Restore the default configuration
    Reset,
}

#[derive(Args, Debug, Default)]
pub struct SetArgs {
    /// Maximum auto-approvals per minute
    #[arg(long)]
    pub max_per_minute: Option<u32>,

    /// Confirmation timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<LogLevel>,

    /// Whether metrics are reported
    #[arg(long)]
    pub metrics_enabled: Option<bool>,
}

impl SetArgs {
    pub fn is_empty(&self) -> bool {
        self.max_per_minute.is_none()
            && self.timeout_ms.is_none()
            && self.log_level.is_none()
            && self.metrics_enabled.is_none()
    }
}
