//! kb-files reference server
//!
//! Loads configuration, opens the `SQLite` metadata store, mounts the file
//! routes and sweeps abandoned uploads in the background.

#![allow(clippy::multiple_crate_versions)]

mod sweeper;

use anyhow::{Context, Result};
use clap::Parser;
use kb_files::config::KbFilesConfig;
use kb_files::module::{self, FileModule, ModuleContext};
use kb_files::observability::{self, ObservabilityConfig};
use kb_files::storage::SqliteMetadataCollection;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "kb-files-server")]
#[command(version)]
#[command(about = "Serves kb-files uploads over HTTP", long_about = None)]
struct Cli {
    /// Configuration file, replacing the default search path
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Listen address, overriding `server.bind`
    #[arg(short, long, value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// Service name used for config lookup and logging
    #[arg(long, default_value = "kb-files")]
    service_name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    observability::init(&ObservabilityConfig::new(&cli.service_name))?;

    let mut config = match &cli.config {
        Some(path) => KbFilesConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => KbFilesConfig::load_for_service(&cli.service_name)?,
    };
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    std::fs::create_dir_all(&config.storage.data_dir).with_context(|| {
        format!(
            "Failed to create data directory {}",
            config.storage.data_dir.display()
        )
    })?;

    let metadata =
        SqliteMetadataCollection::connect(&config.database.url, config.database.max_connections)
            .await
            .with_context(|| format!("Failed to open metadata database {}", config.database.url))?;

    let FileModule { router, store } = module::init(ModuleContext {
        metadata: Arc::new(metadata),
        data_dir: config.storage.data_dir.clone(),
        max_upload_bytes: config.storage.max_upload_bytes,
    })?;

    let sweeper = config.storage.sweep_interval().map(|every| {
        tokio::spawn(sweeper::run(
            Arc::clone(&store),
            every,
            config.storage.pending_max_age(),
        ))
    });

    let listener = tokio::net::TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;

    tracing::info!(
        addr = %config.server.bind,
        data_dir = %config.storage.data_dir.display(),
        "Starting server"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
