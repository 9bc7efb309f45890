//! Herald server: notification fan-out and delivery.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt};

use herald_api::AppState;
use herald_cache::CacheManager;
use herald_core::config::AppConfig;
use herald_notify::NotificationService;
use herald_notify::directory::InMemoryDirectory;
use herald_realtime::RealtimeEngine;

#[tokio::main]
async fn main() {
    let env = std::env::var("HERALD_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e:#}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting Herald v{}", env!("CARGO_PKG_VERSION"));

    // ── Cache ────────────────────────────────────────────────────
    tracing::info!(provider = %config.cache.provider, "Initializing cache...");
    let cache = Arc::new(
        CacheManager::new(&config.cache)
            .await
            .context("Cache init failed")?,
    );

    // ── Presence + realtime ──────────────────────────────────────
    let presence = herald_realtime::presence::build_presence_store(&config.notify, cache.clone())
        .context("Presence store init failed")?;
    let realtime = RealtimeEngine::new(config.realtime.clone(), presence.clone());

    // ── Push provider ────────────────────────────────────────────
    let push = herald_notify::push::build_push_provider(&config.push)
        .context("Push provider init failed")?;

    // ── Directory ────────────────────────────────────────────────
    // Process-local until the host application supplies its own lookups.
    let directory = Arc::new(InMemoryDirectory::new());

    // ── Notification service ─────────────────────────────────────
    let notifications = Arc::new(NotificationService::new(
        config.notify.clone(),
        directory.clone(),
        directory,
        presence,
        realtime.channel(),
        push,
    ));
    let maintenance = CancellationToken::new();
    notifications.spawn_maintenance(maintenance.clone());

    // ── HTTP server ──────────────────────────────────────────────
    let state = AppState {
        config: Arc::new(config.clone()),
        cache,
        realtime: realtime.clone(),
        notifications: notifications.clone(),
    };
    let app = herald_api::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Herald listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
        })
        .await
        .context("Server error")?;

    // ── Drain ────────────────────────────────────────────────────
    realtime.shutdown();
    maintenance.cancel();
    notifications
        .shutdown(Duration::from_secs(config.server.shutdown_grace_seconds))
        .await;

    tracing::info!("Herald shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
