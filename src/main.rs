//! tickerwire - caching edge for news feeds and market quotes
//!
//! Serves crypto and stock quotes and a set of read-only news routes, each
//! backed by an in-memory TTL cache.

use clap::Parser;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tickerwire::cache::TtlStore;
use tickerwire::cli::Cli;
use tickerwire::config::Config;
use tickerwire::server::{build_router, AppState};
use tickerwire::sweep::{SweepConfig, SweepHandle};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load environment variables from .env file (if exists) before RUST_LOG is read
    let dotenv = dotenvy::dotenv();

    // Initialize tracing; RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&cli.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting tickerwire...");

    match dotenv {
        Ok(_) => info!("Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let config = cli.apply(Config::from_env())?;

    let store = TtlStore::new().with_max_entries(config.cache_max_entries);
    info!(
        ttl_secs = config.cache_ttl_secs,
        max_entries = config.cache_max_entries,
        "cache store initialized"
    );
    match config.upstream_url {
        Some(ref url) => info!(upstream = %url, "news backend routes enabled"),
        None => info!("TICKERWIRE_UPSTREAM_URL not set, news backend routes will answer 503"),
    }

    let sweep = SweepHandle::spawn(
        store.clone(),
        SweepConfig {
            interval: config.sweep_interval.max(Duration::from_secs(1)),
            max_age: config.sweep_max_age,
            enabled: config.sweep_enabled,
        },
    );

    let state = AppState::new(&config, store);
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!("HTTP server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweep.shutdown().await;
    info!("Server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down gracefully...");
}
