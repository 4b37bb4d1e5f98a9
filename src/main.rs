//! Gjenlyd CLI entry point.

use anyhow::Result;
use clap::Parser;
use gjenlyd::cli::{commands, Cli, Commands};
use gjenlyd::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("gjenlyd={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Ensure the data directory exists
    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match &cli.command {
        Commands::Init => {
            commands::run_init(&settings)?;
        }

        Commands::Process { input } => {
            commands::run_process(input, settings).await?;
        }

        Commands::Ask {
            input,
            question,
            top_k,
            weight,
        } => {
            commands::run_ask(input, question, *top_k, *weight, settings).await?;
        }

        Commands::Invalidate { document_id } => {
            commands::run_invalidate(document_id, settings).await?;
        }
    }

    Ok(())
}
