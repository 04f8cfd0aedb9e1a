//! skyport-importer - tweet archive to Bluesky import service
//!
//! Serves the login / upload / select / import flow over HTTP and streams
//! import progress as Server-Sent Events.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;

use skyport_common::config::load_module_config;
use skyport_importer::config::{Args, ServiceConfig, MODULE_NAME};
use skyport_importer::services::BskyConnector;
use skyport_importer::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The log level lives in the TOML file, so read it before tracing is up
    let toml = load_module_config(args.config.as_deref(), MODULE_NAME)
        .context("Failed to load configuration")?;
    let config = ServiceConfig::resolve(args, toml);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        "Starting Skyport Importer ({}) v{} [{}] built {} ({})",
        MODULE_NAME,
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!(
        pds_host = %config.pds_host,
        http_timeout_secs = config.http_timeout.as_secs(),
        event_buffer = config.event_buffer,
        max_upload_bytes = config.max_upload_bytes,
        "Configuration resolved"
    );
    if let Some(root) = &config.temp_root {
        info!("Session workspaces under {}", root.display());
    }

    let connector = Arc::new(BskyConnector::new(
        config.pds_host.clone(),
        config.http_timeout,
    ));
    let bind_addr = config.bind_addr.clone();
    let app = build_router(AppState::new(config, connector));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    info!("{} listening on http://{}", MODULE_NAME, bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
