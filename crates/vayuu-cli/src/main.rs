mod bot;
mod channel;
mod cli;
mod config;
mod runtime;
mod setup;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, ConfigCommands};
use config::AppConfig;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use vayuu_storage::paths;

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();
    let config_path = match cli.config.as_deref() {
        Some(path) => paths::expand_home(path),
        None => paths::default_config_path()?,
    };

    match cli.command.take().unwrap_or(Commands::Run) {
        Commands::Setup => {
            let _guard = init_logging(&log_level(&cli, "info"), None)?;
            setup::run_setup(&config_path)
        }
        Commands::Config {
            command: ConfigCommands::Path,
        } => {
            println!("{}", config_path.display());
            Ok(())
        }
        Commands::Config {
            command: ConfigCommands::Show,
        } => {
            let config = load_config(&cli, &config_path)?;
            print!("{}", toml::to_string_pretty(&config.masked())?);
            Ok(())
        }
        Commands::Run => {
            let config = load_config(&cli, &config_path)?;
            config.validate()?;

            let log_dir = cli
                .log_dir
                .as_deref()
                .map(paths::expand_home)
                .or_else(|| config.log_dir());
            let _guard = init_logging(&log_level(&cli, &config.log_level), log_dir.as_deref())?;
            runtime::run(config).await
        }
    }
}

fn load_config(cli: &Cli, config_path: &Path) -> Result<AppConfig> {
    let explicit = cli.config.as_ref().map(|_| config_path);
    let mut config = AppConfig::load(explicit)?;
    config.apply_overrides(cli.model.clone(), cli.workdir.clone());
    Ok(config)
}

fn log_level(cli: &Cli, configured: &str) -> String {
    if cli.verbose {
        "debug".to_string()
    } else {
        configured.to_string()
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `level`.
///
/// With a log directory, logs go to a daily rolling `vayuu.log`; the returned
/// guard must live as long as the process.
fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::daily(dir, "vayuu.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false)
                .with_level(true)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
            Ok(None)
        }
    }
}
