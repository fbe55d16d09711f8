//! Delivery adapter: one encrypted push message to one subscriber.
//!
//! Uses the `web-push` crate for RFC 8291 payload encryption and VAPID
//! signing, then sends the HTTP request via reqwest so the timeout and
//! connection pool are under our control.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use web_push::{
    ContentEncoding, SubscriptionInfo, VapidSignatureBuilder, WebPushMessage,
    WebPushMessageBuilder,
};

use crate::push::vapid::VapidKeys;
use crate::registry::Subscription;

/// Outcome of a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The push service accepted the message.
    Delivered,
    /// The push service reports the subscription is gone (404/410).
    Expired,
    /// Any other failure: transport, encryption, configuration or HTTP status.
    Failed(String),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }

    /// Outcome without the failure reason.
    pub fn status(&self) -> DeliveryStatus {
        match self {
            Self::Delivered => DeliveryStatus::Delivered,
            Self::Expired => DeliveryStatus::Expired,
            Self::Failed(_) => DeliveryStatus::Failed,
        }
    }
}

/// Wire form of a delivery outcome, as reported per subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Delivered,
    Expired,
    Failed,
}

impl DeliveryStatus {
    /// Lowercase label, also used as the metrics `outcome` label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Expired => "expired",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sends a payload to a single subscription.
///
/// Implementations never return an error: every failure is logged and
/// reported through [`DeliveryOutcome`].
#[async_trait]
pub trait PushDelivery: Send + Sync {
    async fn deliver(&self, subscription: &Subscription, payload: &[u8]) -> DeliveryOutcome;
}

/// Errors raised inside [`WebPushDelivery`] before classification.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("VAPID credentials are not configured")]
    NotConfigured,

    #[error("failed to build push message: {0}")]
    WebPush(#[from] web_push::WebPushError),

    #[error("push request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("push service responded with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl DeliveryError {
    /// Whether the push service reported the subscription as gone.
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Rejected { status: 404 | 410, .. })
    }
}

/// [`PushDelivery`] backed by the Web Push protocol.
pub struct WebPushDelivery {
    client: reqwest::Client,
    keys: Option<VapidKeys>,
    subject: String,
    ttl: u32,
}

impl WebPushDelivery {
    /// Create an adapter.
    ///
    /// # Arguments
    ///
    /// * `keys` - VAPID keypair; `None` makes every delivery fail
    /// * `subject` - VAPID `sub` claim (`mailto:` or `https:` URI)
    /// * `timeout` - Timeout applied to each push request
    /// * `ttl` - Seconds the push service may hold an undelivered message
    pub fn new(
        keys: Option<VapidKeys>,
        subject: impl Into<String>,
        timeout: Duration,
        ttl: u32,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            keys,
            subject: subject.into(),
            ttl,
        })
    }

    fn build_message(
        &self,
        subscription: &Subscription,
        payload: &[u8],
    ) -> Result<WebPushMessage, DeliveryError> {
        let keys = self.keys.as_ref().ok_or(DeliveryError::NotConfigured)?;

        let sub_info = SubscriptionInfo::new(
            &subscription.endpoint,
            &subscription.keys.p256dh,
            &subscription.keys.auth,
        );

        let mut sig_builder = VapidSignatureBuilder::from_base64(keys.private_key_base64url(), &sub_info)?;
        sig_builder.add_claim("sub", self.subject.as_str());
        let signature = sig_builder.build()?;

        let mut builder = WebPushMessageBuilder::new(&sub_info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_vapid_signature(signature);
        builder.set_ttl(self.ttl);

        Ok(builder.build()?)
    }

    async fn send(&self, subscription: &Subscription, payload: &[u8]) -> Result<(), DeliveryError> {
        let message = self.build_message(subscription, payload)?;

        let mut request = self
            .client
            .post(message.endpoint.to_string())
            .header("TTL", message.ttl.to_string());

        if let Some(urgency) = message.urgency {
            request = request.header("Urgency", urgency.to_string());
        }

        if let Some(topic) = message.topic {
            request = request.header("Topic", topic);
        }

        if let Some(push_payload) = message.payload {
            request = request
                .header("Content-Encoding", push_payload.content_encoding.to_str())
                .header("Content-Type", "application/octet-stream");

            for (key, value) in &push_payload.crypto_headers {
                request = request.header(*key, value.as_str());
            }

            request = request.body(push_payload.content);
        }

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl PushDelivery for WebPushDelivery {
    async fn deliver(&self, subscription: &Subscription, payload: &[u8]) -> DeliveryOutcome {
        match self.send(subscription, payload).await {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(e) if e.is_gone() => {
                tracing::info!(endpoint = %subscription.endpoint, error = %e, "Subscription expired");
                DeliveryOutcome::Expired
            }
            Err(e) => {
                tracing::warn!(endpoint = %subscription.endpoint, error = %e, "Failed to send push notification");
                DeliveryOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gone_statuses() {
        let gone = |status| DeliveryError::Rejected {
            status,
            body: String::new(),
        };
        assert!(gone(410).is_gone());
        assert!(gone(404).is_gone());
        assert!(!gone(500).is_gone());
        assert!(!gone(429).is_gone());
        assert!(!DeliveryError::NotConfigured.is_gone());
    }

    #[tokio::test]
    async fn test_unconfigured_adapter_fails_without_network() {
        let delivery =
            WebPushDelivery::new(None, "mailto:test@example.com", Duration::from_secs(1), 60)
                .unwrap();
        let sub = Subscription::new("https://push.example.com/1", "p256dh", "auth");

        let outcome = delivery.deliver(&sub, b"{}").await;
        assert_eq!(
            outcome,
            DeliveryOutcome::Failed("VAPID credentials are not configured".to_string())
        );
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(DeliveryOutcome::Delivered.status().as_str(), "delivered");
        assert_eq!(DeliveryOutcome::Expired.status().as_str(), "expired");
        assert_eq!(DeliveryOutcome::Failed("x".into()).status().as_str(), "failed");
        assert!(DeliveryOutcome::Delivered.is_delivered());
        assert!(!DeliveryOutcome::Expired.is_delivered());
        assert!(!DeliveryOutcome::Failed("x".into()).is_delivered());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(DeliveryStatus::Expired).unwrap(),
            serde_json::json!("expired")
        );
        let status: DeliveryStatus = serde_json::from_str("\"delivered\"").unwrap();
        assert_eq!(status, DeliveryStatus::Delivered);
        assert_eq!(DeliveryOutcome::Failed("x".into()).status(), DeliveryStatus::Failed);
    }
}
