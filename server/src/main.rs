//! `taskboard-server` entry point.
//!
//! Loads layered configuration, opens (and migrates) the SQLite database,
//! then serves the API until Ctrl+C.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use taskboard_server::AppState;
use taskboard_server::config::ConfigLoader;
use taskboard_server::db::Database;
use tokio::net::TcpListener;

#[derive(Debug, Parser)]
#[command(name = "taskboard-server", version, about = "Taskboard REST API")]
struct Cli {
    /// Config file (defaults to $TASKBOARD_CONFIG, then <config dir>/taskboard/config.toml).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address to listen on; overrides config and environment.
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,

    /// SQLite database path; overrides config and environment.
    #[arg(long, value_name = "FILE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = cli.config {
        loader = loader.with_config_path(path);
    }
    let mut config = loader.load().context("failed to load configuration")?;
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }
    if let Some(database) = cli.database {
        config.database = database;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log)),
        )
        .init();

    tracing::info!("taskboard-server v{} starting", env!("CARGO_PKG_VERSION"));
    if config.uses_default_secret() {
        tracing::warn!("Using the default JWT secret; set TASKBOARD_JWT_SECRET in production");
    }

    let db = Database::open(&config.database)
        .with_context(|| format!("failed to open database {}", config.database.display()))?;
    tracing::info!("Database at {}", config.database.display());

    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Signal received, shutting down");
        let _ = shutdown_tx.send(true);
    });

    let state = AppState::new(db, &config);
    taskboard_server::serve(listener, state, async move {
        let _ = shutdown_rx.wait_for(|stop| *stop).await;
    })
    .await?;

    tracing::info!("taskboard-server exiting cleanly");
    Ok(())
}
