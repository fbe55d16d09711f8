//! HTTP server setup and lifecycle.
//!
//! Wires together:
//! - VAPID credentials and the Web Push delivery adapter
//! - The subscription registry and dispatcher
//! - The axum API router with graceful shutdown
//! - The optional Prometheus metrics server

use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::api::rate_limit::RateLimits;
use crate::api::{create_router, AppState, RouterOptions};
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::observability::metrics::prometheus_registry;
use crate::observability::prometheus::{run_metrics_server, MetricsState};
use crate::push::{PushDelivery, VapidError, VapidKeys, WebPushDelivery};
use crate::registry::SubscriptionRegistry;

/// Errors that prevent the server from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid VAPID configuration: {0}")]
    Vapid(#[from] VapidError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load the VAPID keypair from configuration.
///
/// Missing keys are not fatal: the server runs, but the public-key endpoint
/// and every delivery fail until keys are configured. Keys that are present
/// but invalid are rejected.
pub fn load_vapid_keys(config: &Config) -> Result<Option<VapidKeys>, VapidError> {
    let public = config.vapid_public_key.as_deref().filter(|k| !k.trim().is_empty());
    let private = config.vapid_private_key.as_deref().filter(|k| !k.trim().is_empty());

    match (public, private) {
        (Some(public), Some(private)) => {
            let keys = VapidKeys::from_base64url(public, private)?;
            tracing::info!("VAPID keys loaded successfully");
            Ok(Some(keys))
        }
        _ => {
            tracing::warn!(
                public_key_set = public.is_some(),
                private_key_set = private.is_some(),
                "VAPID keys are not set; set VAPID_PUBLIC_KEY and VAPID_PRIVATE_KEY to enable push delivery"
            );
            Ok(None)
        }
    }
}

/// Build handler state with the Web Push delivery adapter.
pub fn build_state(config: &Config) -> Result<AppState, ServerError> {
    let keys = load_vapid_keys(config)?;
    let vapid_configured = keys.is_some();
    let vapid_public_key = keys
        .as_ref()
        .map(|k| k.public_key_base64url().to_string())
        .or_else(|| config.vapid_public_key.clone().filter(|k| !k.trim().is_empty()));

    let delivery = WebPushDelivery::new(
        keys,
        config.vapid_subject_uri(),
        config.push_timeout(),
        config.push_ttl,
    )?;

    Ok(build_state_with_delivery(
        config,
        Arc::new(delivery),
        vapid_public_key,
        vapid_configured,
    ))
}

/// Build handler state around an arbitrary delivery adapter.
pub fn build_state_with_delivery(
    config: &Config,
    delivery: Arc<dyn PushDelivery>,
    vapid_public_key: Option<String>,
    vapid_configured: bool,
) -> AppState {
    let registry = Arc::new(SubscriptionRegistry::new());
    let dispatcher = Dispatcher::new(registry.clone(), delivery, config.prune_expired);

    AppState {
        registry,
        dispatcher,
        vapid_public_key,
        vapid_configured,
    }
}

/// Router options derived from configuration.
pub fn router_options(config: &Config) -> RouterOptions {
    RouterOptions {
        allowed_origins: config.allowed_origins.clone(),
        body_limit: config.body_limit,
        rate_limits: RateLimits::new(
            config.api_rate_policy(),
            config.subscribe_rate_policy(),
            config.trust_proxy,
        ),
    }
}

/// Run the Herald HTTP server.
///
/// # Arguments
///
/// * `config` - Server configuration
/// * `shutdown_rx` - Receiver for shutdown signal
///
/// # Returns
///
/// Returns when the server has shut down.
pub async fn run_server(
    config: Config,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<(), ServerError> {
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    run_server_with_listener(config, listener, shutdown_rx).await
}

/// Run the server on an already-bound listener.
pub async fn run_server_with_listener(
    config: Config,
    listener: TcpListener,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), ServerError> {
    let state = build_state(&config)?;

    // Spawn the metrics server if enabled
    if config.metrics_enabled {
        let metrics_listener_addr = (config.host.clone(), config.metrics_port);
        let metrics_state = MetricsState::new(
            prometheus_registry(),
            state.registry.clone(),
            state.vapid_configured,
        );
        let metrics_shutdown_rx = shutdown_rx.clone();

        tokio::spawn(async move {
            let addr = match tokio::net::lookup_host(metrics_listener_addr)
                .await
                .ok()
                .and_then(|mut addrs| addrs.next())
            {
                Some(addr) => addr,
                None => {
                    tracing::error!("Could not resolve metrics address");
                    return;
                }
            };
            if let Err(e) = run_metrics_server(addr, metrics_state, metrics_shutdown_rx).await {
                tracing::error!(error = %e, "Metrics server error");
            }
        });
    }

    let app = create_router(state, &router_options(&config));

    tracing::info!(address = %listener.local_addr()?, "Starting Herald HTTP server");

    // Run server with graceful shutdown
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
            tracing::info!("Shutdown signal received, stopping server");
        })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
