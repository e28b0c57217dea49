use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vayuu")]
#[command(version, about = "Vayuu - personal AI assistant on Telegram")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file path (defaults to ~/.vayuu/config.toml)
    #[arg(long, global = true, env = "VAYUU_CONFIG")]
    pub config: Option<String>,

    /// Override the configured chat model
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Override the agent working directory
    #[arg(long, global = true)]
    pub workdir: Option<String>,

    /// Write logs to daily files in this directory instead of stderr
    #[arg(long, global = true, env = "VAYUU_LOG_DIR")]
    pub log_dir: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the Telegram bot (default)
    Run,

    /// Interactive first-run configuration
    Setup,

    /// Configuration inspection
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConfigCommands {
    /// Print the resolved configuration with secrets masked
    Show,

    /// Print the config file location
    Path,
}
