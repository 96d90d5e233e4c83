use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod bridge;
mod cli;
mod command;
mod domain;
mod provider;
mod review;
mod server;
mod service;
mod ui;

use cli::{Cli, Commands};
use domain::settings::SettingsStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let Some(command) = cli.command else {
        eprintln!("No command specified. Use --help for usage information.");
        eprintln!("Use 'zakkuri serve' to start the review service or 'zakkuri chat' to talk to it.");
        return Ok(());
    };

    let config_dir = cli.config_dir;
    let store = || SettingsStore::new(config_dir.clone());

    match command {
        Commands::Serve {
            api_key,
            port,
            bind,
            model,
            provider_url,
        } => {
            command::run_serve(api_key, bind, port, model, provider_url).await?;
        }
        Commands::Review { selection, service } => {
            command::run_review(&store()?, selection, &service).await?;
        }
        Commands::Chat { selection, service } => {
            command::run_chat(&store()?, selection, &service).await?;
        }
        Commands::Models { service } => {
            command::run_models(&store()?, &service).await?;
        }
        Commands::Status { service } => {
            command::run_status(&store()?, &service).await?;
        }
        Commands::Settings { action } => {
            command::run_settings(&store()?, action)?;
        }
    }

    Ok(())
}
