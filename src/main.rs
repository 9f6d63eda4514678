//! Cutout Gateway - A background-removal API gateway
//!
//! Composition root: wires configuration, cache, processing client and
//! webhook worker into the HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cutout_gateway::cache::SharedCache;
use cutout_gateway::notify::{NotificationDispatcher, WebhookSink};
use cutout_gateway::processor::ReplicateProcessor;
use cutout_gateway::{create_router, AppState, Config, Orchestrator, OrchestratorSettings};

/// Main entry point for the gateway.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Create the shared cache and the processing client
/// 4. Start the webhook notification worker
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on the configured address
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cutout_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Cutout Gateway");

    let config = Config::from_env().context("invalid configuration")?;
    info!(
        "Configuration loaded: max_entries={}, cache_ttl={}s, cache_enabled={}, webhooks={}, prefix={}",
        config.max_entries,
        config.cache_ttl,
        config.cache_enabled,
        config.webhook_enabled,
        config.api_prefix
    );

    let cache = SharedCache::with_capacity(config.max_entries, config.cache_ttl);
    info!("Cache store initialized");

    let processor =
        ReplicateProcessor::from_config(&config).context("failed to create processing client")?;

    let sink = WebhookSink::new(config.webhook_timeout).context("failed to create webhook client")?;
    let (dispatcher, worker_handle) = NotificationDispatcher::spawn(
        Arc::new(sink),
        config.notification_queue_size,
        config.webhook_timeout,
    );
    info!("Notification worker started");

    let orchestrator = Orchestrator::new(
        cache,
        Arc::new(processor),
        Some(dispatcher),
        OrchestratorSettings::from_config(&config),
    );

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let app = create_router(AppState::new(orchestrator, config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    worker_handle.abort();
    warn!("Notification worker aborted");

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
