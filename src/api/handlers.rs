//! HTTP handlers.
//!
//! Each handler validates its input, calls into the registry or the
//! dispatcher, and maps the result onto the JSON envelope.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use super::types::{
    HealthResponse, PublicKeyResponse, RootResponse, SendResponse, StatusResponse,
    SubscriptionStatusResponse, SubscriptionsResponse, TestNotificationRequest,
    TestNotificationResponse, UnsubscribeRequest,
};
use super::AppState;
use crate::error::ApiError;
use crate::observability::metrics::set_subscription_count;
use crate::push::{DeliveryStatus, NotificationRequest};
use crate::registry::{AddOutcome, Subscription};

/// Handle GET / - service banner.
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Web Push Notification Backend".to_string(),
        status: "active".to_string(),
    })
}

/// Handle POST /api/subscribe - register a browser subscription.
pub async fn subscribe(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Json(value) = body?;
    let subscription = Subscription::from_json(value).inspect_err(|e| {
        tracing::debug!(error = %e, "Rejected subscription");
    })?;

    let status = match state.registry.add(subscription) {
        AddOutcome::Added => "success",
        AddOutcome::AlreadySubscribed => "already_subscribed",
    };
    set_subscription_count(state.registry.len());

    Ok(Json(StatusResponse::new(status)))
}

/// Handle POST /api/unsubscribe - remove a subscription by endpoint.
///
/// Unknown endpoints are not an error.
pub async fn unsubscribe(
    State(state): State<AppState>,
    body: Result<Json<UnsubscribeRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Json(request) = body?;
    let endpoint = request.endpoint.trim();
    if endpoint.is_empty() {
        return Err(ApiError::Validation("Endpoint required".to_string()));
    }

    let removed = state.registry.remove(endpoint);
    tracing::debug!(removed, "Unsubscribe request handled");
    set_subscription_count(state.registry.len());

    Ok(Json(StatusResponse::new("success")))
}

/// Handle POST /api/send-notification - broadcast to every subscriber.
pub async fn send_notification(
    State(state): State<AppState>,
    body: Result<Json<NotificationRequest>, JsonRejection>,
) -> Result<Json<SendResponse>, ApiError> {
    let Json(request) = body?;
    let payload = request.into_payload();

    let report = state.dispatcher.broadcast(&payload).await?;

    Ok(Json(report.into()))
}

/// Handle POST /api/notify/test - push to one subscriber.
///
/// Missing title and body default to test-message text. Anything other than
/// an accepted push is reported as an error.
pub async fn send_test_notification(
    State(state): State<AppState>,
    body: Result<Json<TestNotificationRequest>, JsonRejection>,
) -> Result<Json<TestNotificationResponse>, ApiError> {
    let Json(request) = body?;
    let endpoint = request.endpoint.trim().to_string();
    if endpoint.is_empty() {
        return Err(ApiError::Validation("Endpoint required".to_string()));
    }

    let payload = request.notification.into_test_payload();
    let report = state.dispatcher.send_to(&endpoint, &payload).await?;

    match report.result.outcome {
        DeliveryStatus::Delivered => Ok(Json(report.into())),
        DeliveryStatus::Expired => Err(ApiError::Delivery(
            "Failed to send test notification: subscription has expired".to_string(),
        )),
        DeliveryStatus::Failed => Err(ApiError::Delivery(format!(
            "Failed to send test notification: {}",
            report.result.error.as_deref().unwrap_or("unknown error")
        ))),
    }
}

/// Handle GET /api/subscription/{endpoint} - look up one subscription.
///
/// The endpoint is percent-encoded into a single path segment.
pub async fn subscription_status(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
) -> Result<Json<SubscriptionStatusResponse>, ApiError> {
    let subscription = state
        .registry
        .get(&endpoint)
        .ok_or_else(|| ApiError::NotFound("Subscription not found".to_string()))?;

    Ok(Json(SubscriptionStatusResponse {
        status: "success".to_string(),
        subscription,
    }))
}

/// Handle GET /api/vapid-public-key.
pub async fn vapid_public_key(
    State(state): State<AppState>,
) -> Result<Json<PublicKeyResponse>, ApiError> {
    let public_key = state
        .vapid_public_key
        .clone()
        .ok_or_else(|| ApiError::Configuration("VAPID public key not configured".to_string()))?;

    Ok(Json(PublicKeyResponse { public_key }))
}

/// Handle GET /api/subscriptions - list every subscription.
pub async fn list_subscriptions(State(state): State<AppState>) -> Json<SubscriptionsResponse> {
    let subscriptions = state.registry.list();
    Json(SubscriptionsResponse {
        count: subscriptions.len(),
        subscriptions,
    })
}

/// Handle GET /api/health.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        subscriptions: state.registry.len(),
        vapid_configured: state.vapid_configured,
    })
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "status": "error",
            "message": "endpoint not found",
            "path": uri.path(),
        })),
    )
}
