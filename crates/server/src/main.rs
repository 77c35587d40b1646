mod bootstrap;
mod chat;
mod health;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use storechat_core::config::{AppConfig, LoadOptions};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "storechat-server", about = "Storefront chat assistant HTTP server")]
struct Cli {
    /// Path to a TOML config file. Defaults to ./storechat.toml or ./config/storechat.toml.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn init_logging(config: &AppConfig) {
    use storechat_core::config::LogFormat::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is the normal production case.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    let require_file = cli.config.is_some();
    let config = AppConfig::load(LoadOptions {
        config_path: cli.config,
        require_file,
        ..LoadOptions::default()
    })?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config)?;

    let orders = app.orders.clone();
    tokio::spawn(async move { bootstrap::warm_up_token(&orders).await });

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("could not bind {address}"))?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "storechat-server listening"
    );

    axum::serve(listener, chat::app_router(app.orchestrator.clone()))
        .with_graceful_shutdown(wait_for_shutdown())
        .await
        .context("http server terminated unexpectedly")?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "storechat-server stopping"
    );

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "could not listen for shutdown signal"
        );
    }
}
