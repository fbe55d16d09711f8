//! Operational HTTP endpoint, served on its own port.
//!
//! - `/metrics`: Prometheus text exposition; the subscription gauge is
//!   refreshed from the live registry on every scrape
//! - `/health`: liveness plus the current subscription count
//! - `/ready`: 200 once push delivery is possible (VAPID keys loaded),
//!   503 otherwise

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use prometheus::{Encoder, Registry, TextEncoder};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;

use crate::observability::metrics::set_subscription_count;
use crate::registry::SubscriptionRegistry;

/// State behind the operational endpoints.
#[derive(Clone)]
pub struct MetricsState {
    registry: Registry,
    subscriptions: Arc<SubscriptionRegistry>,
    vapid_configured: bool,
}

impl MetricsState {
    pub fn new(
        registry: Registry,
        subscriptions: Arc<SubscriptionRegistry>,
        vapid_configured: bool,
    ) -> Self {
        Self {
            registry,
            subscriptions,
            vapid_configured,
        }
    }
}

/// Router for the operational endpoints.
pub fn metrics_router(state: MetricsState) -> Router {
    Router::new()
        .route("/metrics", get(scrape))
        .route("/health", get(liveness))
        .route("/ready", get(readiness))
        .with_state(state)
}

async fn scrape(State(state): State<MetricsState>) -> Response {
    set_subscription_count(state.subscriptions.len());

    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&state.registry.gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to encode metrics: {e}"))
            .into_response();
    }

    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        buffer,
    )
        .into_response()
}

async fn liveness(State(state): State<MetricsState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "subscriptions": state.subscriptions.len(),
    }))
}

async fn readiness(State(state): State<MetricsState>) -> Response {
    if state.vapid_configured {
        (StatusCode::OK, Json(json!({ "status": "ready" }))).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not_ready",
                "reason": "VAPID credentials are not configured",
            })),
        )
            .into_response()
    }
}

/// Serve the operational endpoints until the shutdown signal fires.
pub async fn run_metrics_server(
    addr: SocketAddr,
    state: MetricsState,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Starting metrics server");

    axum::serve(listener, metrics_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
            tracing::info!("Metrics server shutting down");
        })
        .await
}
