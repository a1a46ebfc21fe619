mod api;
mod config;
mod store;
mod store_manager;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::store::TargetStore;
use crate::store_manager::StoreHandle;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("targetd=info")),
        )
        .init();

    tracing::info!("Starting targetd");

    // Load config; without an argument the built-in defaults apply.
    let mut config = match std::env::args().nth(1) {
        Some(path) => {
            let config = Config::load(&path)
                .with_context(|| format!("Failed to load config from {path}"))?;
            tracing::info!("Loaded config from {}", path);
            config
        }
        None => Config::default(),
    };
    config.apply_env_overrides();

    // Ensure the targets directory and an initial empty document exist
    // before serving traffic; the probing agent may already be watching.
    let store = init_storage(&config)?;
    tracing::info!(path = %store.path().display(), "Targets file ready");

    // Start the store thread
    let store_handle = StoreHandle::spawn(store);

    // Build API router
    let app_state = api::routes::AppState {
        store: store_handle.clone(),
        config: Arc::new(config.clone()),
    };
    let app = api::routes::router(app_state);

    // Bind HTTP server
    let listener = tokio::net::TcpListener::bind(&config.api.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", config.api.listen))?;

    tracing::info!("API listening on {}", config.api.listen);

    // Run server with graceful shutdown
    let cancel = CancellationToken::new();
    let server_cancel = cancel.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_cancel.cancelled().await })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutdown signal received");

    cancel.cancel();
    let _ = server_handle.await;

    // Shutdown store thread
    if let Err(e) = store_handle.shutdown().await {
        tracing::error!("Failed to shutdown store: {}", e);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Create the targets directory and initialize an empty document if none
/// is present yet.
fn init_storage(config: &Config) -> Result<TargetStore> {
    std::fs::create_dir_all(&config.targets.dir).with_context(|| {
        format!(
            "Failed to create targets directory: {}",
            config.targets.dir.display()
        )
    })?;

    let store = TargetStore::new(config.targets_path());
    if !store.path().exists() {
        store
            .save(&[])
            .context("Failed to initialize empty targets file")?;
        tracing::info!(path = %store.path().display(), "Initialized empty targets file");
    }
    Ok(store)
}
