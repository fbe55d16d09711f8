//! JSON wire types for the HTTP API.
//!
//! Shared with `heraldctl`, which deserializes the same documents.

use serde::{Deserialize, Serialize};

use crate::dispatch::{BroadcastReport, DeliveryResult, TargetedReport};
use crate::push::{DeliveryStatus, NotificationRequest};
use crate::registry::Subscription;

/// `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub status: String,
}

/// Plain `{"status": ...}` envelope used by subscribe and unsubscribe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }
}

/// `POST /api/unsubscribe` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsubscribeRequest {
    pub endpoint: String,
}

/// `POST /api/send-notification` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResponse {
    pub status: String,
    pub broadcast_id: String,
    pub sent: usize,
    pub failed: usize,
    pub expired: usize,
    pub pruned: usize,
    pub total_subscribers: usize,
    pub results: Vec<DeliveryResult>,
}

impl From<BroadcastReport> for SendResponse {
    fn from(report: BroadcastReport) -> Self {
        Self {
            status: "success".to_string(),
            broadcast_id: report.id,
            sent: report.sent,
            failed: report.failed,
            expired: report.expired,
            pruned: report.pruned,
            total_subscribers: report.total,
            results: report.results,
        }
    }
}

/// `GET /api/subscription/{endpoint}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionStatusResponse {
    pub status: String,
    pub subscription: Subscription,
}

/// `POST /api/notify/test` body: a target endpoint plus optional overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestNotificationRequest {
    #[serde(default)]
    pub endpoint: String,
    #[serde(flatten)]
    pub notification: NotificationRequest,
}

/// `POST /api/notify/test` response when the push was accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestNotificationResponse {
    pub status: String,
    pub notification_id: String,
    pub endpoint: String,
    pub outcome: DeliveryStatus,
}

impl From<TargetedReport> for TestNotificationResponse {
    fn from(report: TargetedReport) -> Self {
        Self {
            status: "success".to_string(),
            notification_id: report.id,
            endpoint: report.result.endpoint,
            outcome: report.result.outcome,
        }
    }
}

/// `GET /api/vapid-public-key`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

/// `GET /api/subscriptions`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionsResponse {
    pub count: usize,
    pub subscriptions: Vec<Subscription>,
}

/// `GET /api/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub subscriptions: usize,
    pub vapid_configured: bool,
}
