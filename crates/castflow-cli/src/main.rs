mod cli;
mod commands;
mod completions;
mod config;
mod error;
mod output;

use anyhow::Result;
use castflow_browser::PlaywrightLauncher;
use castflow_core::NodeRegistry;
use clap::Parser;
use cli::{Cli, Commands};
use config::{CliConfig, paths};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let _guard = init_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        error::handle_error(err);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = cli.command {
        completions::generate_completions(shell);
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => CliConfig::load_from_path(Some(path.clone())),
        None => CliConfig::load(),
    };
    let launcher = Arc::new(PlaywrightLauncher::new(config.playwright_config()));
    let registry = NodeRegistry::with_builtin(launcher.clone(), config.run_settings(cli.headless));

    match cli.command {
        Commands::Run(args) => commands::run::run(args, &registry, cli.format).await,
        Commands::Nodes(args) => commands::nodes::run(args, &registry, cli.format),
        Commands::Probe => commands::probe::run(&launcher, cli.format).await,
        Commands::Completions { .. } => Ok(()),
    }
}

/// Always log to a daily file under the data dir; `--verbose` adds stderr.
fn init_logging(verbose: bool) -> Option<WorkerGuard> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = match paths::logs_dir() {
        Ok(log_dir) => {
            let file_appender = tracing_appender::rolling::daily(log_dir, "castflow.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false)
                .with_level(true);
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };
    let stderr_layer = verbose.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
    guard
}
