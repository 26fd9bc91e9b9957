mod cli;
mod output;

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use splooker_core::models::settings::DEFAULT_BASE_PATH;
use splooker_core::services::journal::ProvisionalJournal;
use splooker_core::services::registry_store::RegistryStore;
use splooker_core::services::{initialize, settings_loader, Deployer, DockerCli, Nginx};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let _guard = setup_logging(cli.verbose, cli.log_file.as_deref());

    let base_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BASE_PATH));
    let settings = settings_loader::load(&base_path)?;

    match cli.command {
        Commands::Setup { force } => {
            let registry = initialize(&settings, force).await?;
            println!(
                "initialized {} with ports {}-{}",
                settings.registry_path().display(),
                registry.port_range_start,
                registry.port_range_end()
            );
        }
        Commands::Run { name } => {
            let deployer = Deployer::new(
                settings.clone(),
                DockerCli::from_settings(&settings.runtime),
                Nginx::from_settings(&settings),
            );
            let report = deployer.deploy(&name).await?;
            println!("{}", output::render_deployment(&report));
        }
        Commands::Status => {
            let registry = RegistryStore::new(&settings.registry_path()).load().await?;
            let provisional = ProvisionalJournal::new(&settings.journal_path())
                .load()
                .await?;
            println!("{}", output::render_status(&registry, &provisional));
        }
        Commands::Sweep => {
            let deployer = Deployer::new(
                settings.clone(),
                DockerCli::from_settings(&settings.runtime),
                Nginx::from_settings(&settings),
            );
            let report = deployer.sweep().await?;
            println!("{}", output::render_sweep(&report));
        }
    }

    Ok(())
}

/// Log to stderr, or to `log_file` when given. The returned guard must be held
/// for the lifetime of the program so buffered lines are flushed.
fn setup_logging(verbose: bool, log_file: Option<&Path>) -> WorkerGuard {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    match log_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "splooker.log".into());
            let file_appender = tracing_appender::rolling::never(directory, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_writer(non_blocking)
                .with_env_filter(filter)
                .with_ansi(false)
                .init();
            guard
        }
        None => {
            let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());
            tracing_subscriber::fmt()
                .with_writer(non_blocking)
                .with_env_filter(filter)
                .init();
            guard
        }
    }
}
