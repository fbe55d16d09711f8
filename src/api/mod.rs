//! HTTP API.
//!
//! Routes:
//! - `GET /` - Service banner
//! - `POST /api/subscribe` - Register a subscription
//! - `POST /api/unsubscribe` - Remove a subscription
//! - `POST /api/send-notification` - Broadcast to all subscribers
//! - `GET /api/vapid-public-key` - Public key for `applicationServerKey`
//! - `GET /api/subscriptions` - List subscriptions
//! - `GET /api/health` - Health check
//! - `GET /api/subscription/{endpoint}` - Look up one subscription
//! - `POST /api/notify/test` - Push to one subscriber

pub mod handlers;
pub mod rate_limit;
pub mod types;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::dispatch::Dispatcher;
use crate::error::ApiError;
use crate::registry::SubscriptionRegistry;
use rate_limit::RateLimits;

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SubscriptionRegistry>,
    pub dispatcher: Dispatcher,
    /// Served to browsers; `None` makes the public-key endpoint fail.
    pub vapid_public_key: Option<String>,
    /// Whether a valid signing keypair is loaded.
    pub vapid_configured: bool,
}

/// Router-level settings.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Origins allowed by CORS; `*` mirrors any origin.
    pub allowed_origins: Vec<String>,
    /// Maximum request body size in bytes.
    pub body_limit: usize,
    /// Per-IP quotas.
    pub rate_limits: RateLimits,
}

/// Create the API router.
pub fn create_router(state: AppState, options: &RouterOptions) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/api/subscribe", post(handlers::subscribe))
        .route("/api/unsubscribe", post(handlers::unsubscribe))
        .route("/api/send-notification", post(handlers::send_notification))
        .route("/api/vapid-public-key", get(handlers::vapid_public_key))
        .route("/api/subscriptions", get(handlers::list_subscriptions))
        .route("/api/health", get(handlers::health))
        .route("/api/subscription/{endpoint}", get(handlers::subscription_status))
        .route("/api/notify/test", post(handlers::send_test_notification))
        .fallback(handlers::not_found)
        .with_state(state)
        // Middleware stack, innermost first:
        // rate limit -> body limit -> panic boundary -> cors -> trace
        .layer(middleware::from_fn_with_state(
            options.rate_limits.clone(),
            rate_limit::limit_requests,
        ))
        .layer(DefaultBodyLimit::max(options.body_limit))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors_layer(&options.allowed_origins))
        .layer(TraceLayer::new_for_http())
}

/// Build the CORS layer from the configured allow-list.
///
/// Preflight requests are answered by the layer itself and never reach a
/// handler.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_origin = if allowed_origins.iter().any(|origin| origin.trim() == "*") {
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .map(|origin| origin.trim())
            .filter(|origin| !origin.is_empty())
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::PUT,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true)
}

/// Convert a handler panic into the generic error envelope.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "Handler panicked");

    ApiError::Validation("request could not be processed".to_string()).into_response()
}
