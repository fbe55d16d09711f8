//! Broadcast fan-out.
//!
//! A broadcast snapshots the registry and hands the payload to the delivery
//! adapter once per subscriber, sequentially and in registry order. One
//! subscriber failing never stops the loop.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::generate_broadcast_id;
use crate::observability::metrics::{record_broadcast, record_delivery, set_subscription_count};
use crate::push::{DeliveryOutcome, DeliveryStatus, NotificationPayload, PushDelivery};
use crate::registry::{Subscription, SubscriptionRegistry};

/// Errors raised before any delivery is attempted.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Subscription not found")]
    NotFound,

    #[error("invalid notification payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Outcome for one subscriber within a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub endpoint: String,
    pub outcome: DeliveryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryResult {
    fn new(endpoint: String, outcome: &DeliveryOutcome) -> Self {
        let error = match outcome {
            DeliveryOutcome::Failed(reason) => Some(reason.clone()),
            _ => None,
        };
        Self {
            endpoint,
            outcome: outcome.status(),
            error,
        }
    }
}

/// Summary of a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastReport {
    /// UUIDv7 identifying this broadcast in logs.
    pub id: String,
    pub sent: usize,
    /// Every non-delivered subscriber, expired ones included.
    pub failed: usize,
    /// Subscribers the push service reported as gone.
    pub expired: usize,
    /// Subscribers in the registry snapshot.
    pub total: usize,
    /// Expired subscriptions removed after the broadcast.
    pub pruned: usize,
    pub results: Vec<DeliveryResult>,
}

/// Result of a send to a single subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetedReport {
    pub id: String,
    pub result: DeliveryResult,
    pub pruned: bool,
}

/// Fans a payload out to every registered subscription.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<SubscriptionRegistry>,
    delivery: Arc<dyn PushDelivery>,
    prune_expired: bool,
}

impl Dispatcher {
    /// Create a dispatcher.
    ///
    /// When `prune_expired` is set, subscriptions classified as expired are
    /// removed from the registry once the send finishes, unless they were
    /// re-subscribed in the meantime.
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        delivery: Arc<dyn PushDelivery>,
        prune_expired: bool,
    ) -> Self {
        Self {
            registry,
            delivery,
            prune_expired,
        }
    }

    /// Send `payload` to every subscriber.
    #[tracing::instrument(skip_all, fields(broadcast_id))]
    pub async fn broadcast(
        &self,
        payload: &NotificationPayload,
    ) -> Result<BroadcastReport, DispatchError> {
        let start = Instant::now();
        let id = generate_broadcast_id();
        tracing::Span::current().record("broadcast_id", id.as_str());

        let body = payload.to_bytes()?;

        // Deliveries run without holding the registry lock.
        let subscribers = self.registry.list();
        let total = subscribers.len();

        let mut sent = 0;
        let mut failed = 0;
        let mut expired = Vec::new();
        let mut results = Vec::with_capacity(total);

        for subscription in subscribers {
            let outcome = self.delivery.deliver(&subscription, &body).await;
            record_delivery(outcome.status());
            results.push(DeliveryResult::new(subscription.endpoint.clone(), &outcome));

            match outcome {
                DeliveryOutcome::Delivered => sent += 1,
                DeliveryOutcome::Expired => {
                    failed += 1;
                    expired.push(subscription);
                }
                DeliveryOutcome::Failed(_) => failed += 1,
            }
        }

        let pruned = self.prune(&expired);

        let latency = start.elapsed().as_secs_f64();
        record_broadcast(latency);

        tracing::info!(
            sent,
            failed,
            expired = expired.len(),
            total,
            latency_ms = latency * 1000.0,
            "Broadcast complete"
        );

        Ok(BroadcastReport {
            id,
            sent,
            failed,
            expired: expired.len(),
            total,
            pruned,
            results,
        })
    }

    /// Send `payload` to the one subscriber registered under `endpoint`.
    #[tracing::instrument(skip_all, fields(broadcast_id, endpoint = %endpoint))]
    pub async fn send_to(
        &self,
        endpoint: &str,
        payload: &NotificationPayload,
    ) -> Result<TargetedReport, DispatchError> {
        let id = generate_broadcast_id();
        tracing::Span::current().record("broadcast_id", id.as_str());

        let subscription = self.registry.get(endpoint).ok_or(DispatchError::NotFound)?;
        let body = payload.to_bytes()?;

        let outcome = self.delivery.deliver(&subscription, &body).await;
        record_delivery(outcome.status());
        let result = DeliveryResult::new(subscription.endpoint.clone(), &outcome);

        let pruned = outcome == DeliveryOutcome::Expired && self.prune(&[subscription]) > 0;
        tracing::info!(
            delivered = outcome.is_delivered(),
            outcome = %result.outcome,
            pruned,
            "Targeted send complete"
        );

        Ok(TargetedReport { id, result, pruned })
    }

    fn prune(&self, expired: &[Subscription]) -> usize {
        let pruned = if self.prune_expired && !expired.is_empty() {
            let pruned = self.registry.remove_stale(expired);
            tracing::info!(pruned, "Removed expired subscriptions");
            pruned
        } else {
            0
        };
        set_subscription_count(self.registry.len());
        pruned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Subscription;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Delivery stub that fails endpoints containing "fail" and expires
    /// endpoints containing "gone", recording the call order.
    #[derive(Default)]
    struct ScriptedDelivery {
        calls: Mutex<Vec<(String, Vec<u8>)>>,
    }

    #[async_trait]
    impl PushDelivery for ScriptedDelivery {
        async fn deliver(&self, subscription: &Subscription, payload: &[u8]) -> DeliveryOutcome {
            self.calls
                .lock()
                .unwrap()
                .push((subscription.endpoint.clone(), payload.to_vec()));

            if subscription.endpoint.contains("fail") {
                DeliveryOutcome::Failed("boom".into())
            } else if subscription.endpoint.contains("gone") {
                DeliveryOutcome::Expired
            } else {
                DeliveryOutcome::Delivered
            }
        }
    }

    fn setup(endpoints: &[&str], prune: bool) -> (Dispatcher, Arc<SubscriptionRegistry>, Arc<ScriptedDelivery>) {
        let registry = Arc::new(SubscriptionRegistry::new());
        for endpoint in endpoints {
            registry.add(Subscription::new(*endpoint, "p256dh", "auth"));
        }
        let delivery = Arc::new(ScriptedDelivery::default());
        let dispatcher = Dispatcher::new(registry.clone(), delivery.clone(), prune);
        (dispatcher, registry, delivery)
    }

    #[tokio::test]
    async fn test_broadcast_empty_registry() {
        let (dispatcher, _, delivery) = setup(&[], false);

        let report = dispatcher.broadcast(&NotificationPayload::default()).await.unwrap();

        assert_eq!((report.sent, report.failed, report.total), (0, 0, 0));
        assert!(report.results.is_empty());
        assert!(delivery.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_isolates_failures_and_visits_everyone() {
        let endpoints = [
            "https://push.example.com/fail-1",
            "https://push.example.com/ok-1",
            "https://push.example.com/fail-2",
            "https://push.example.com/ok-2",
            "https://push.example.com/ok-3",
        ];
        let (dispatcher, _, delivery) = setup(&endpoints, false);

        let report = dispatcher.broadcast(&NotificationPayload::default()).await.unwrap();

        assert_eq!(report.sent, 3);
        assert_eq!(report.failed, 2);
        assert_eq!(report.total, 5);

        let visited: Vec<String> = delivery
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|(endpoint, _)| endpoint.clone())
            .collect();
        assert_eq!(visited, endpoints);

        let failed: Vec<&str> = report
            .results
            .iter()
            .filter(|r| r.outcome == DeliveryStatus::Failed)
            .map(|r| r.endpoint.as_str())
            .collect();
        assert_eq!(failed, vec![endpoints[0], endpoints[2]]);
        assert_eq!(report.results[0].error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_broadcast_sends_payload_json() {
        let (dispatcher, _, delivery) = setup(&["https://push.example.com/ok"], false);
        let payload = NotificationPayload {
            title: "Hello".into(),
            ..NotificationPayload::default()
        };

        dispatcher.broadcast(&payload).await.unwrap();

        let calls = delivery.calls.lock().unwrap();
        let sent: NotificationPayload = serde_json::from_slice(&calls[0].1).unwrap();
        assert_eq!(sent, payload);
    }

    #[tokio::test]
    async fn test_expired_subscriptions_are_kept_by_default() {
        let (dispatcher, registry, _) =
            setup(&["https://push.example.com/gone", "https://push.example.com/ok"], false);

        let report = dispatcher.broadcast(&NotificationPayload::default()).await.unwrap();

        assert_eq!(report.expired, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.pruned, 0);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_expired_subscriptions_pruned_when_enabled() {
        let (dispatcher, registry, _) = setup(
            &[
                "https://push.example.com/gone",
                "https://push.example.com/fail",
                "https://push.example.com/ok",
            ],
            true,
        );

        let report = dispatcher.broadcast(&NotificationPayload::default()).await.unwrap();

        assert_eq!(report.pruned, 1);
        assert!(!registry.contains("https://push.example.com/gone"));
        // Generic failures are never pruned
        assert!(registry.contains("https://push.example.com/fail"));
        assert_eq!(registry.len(), 2);
    }

    /// Delivery stub that re-subscribes the endpoint with new keys while
    /// the send is in flight, then reports the old record as expired.
    struct ResubscribingDelivery {
        registry: Arc<SubscriptionRegistry>,
    }

    #[async_trait]
    impl PushDelivery for ResubscribingDelivery {
        async fn deliver(&self, subscription: &Subscription, _payload: &[u8]) -> DeliveryOutcome {
            self.registry.remove(&subscription.endpoint);
            self.registry
                .add(Subscription::new(subscription.endpoint.clone(), "fresh-p256dh", "fresh-auth"));
            DeliveryOutcome::Expired
        }
    }

    #[tokio::test]
    async fn test_pruning_spares_resubscription_during_broadcast() {
        let registry = Arc::new(SubscriptionRegistry::new());
        registry.add(Subscription::new("https://push.example.com/a", "p256dh", "auth"));
        let delivery = Arc::new(ResubscribingDelivery {
            registry: registry.clone(),
        });
        let dispatcher = Dispatcher::new(registry.clone(), delivery, true);

        let report = dispatcher.broadcast(&NotificationPayload::default()).await.unwrap();

        assert_eq!(report.expired, 1);
        assert_eq!(report.pruned, 0);
        let kept = registry.get("https://push.example.com/a").expect("fresh subscription kept");
        assert_eq!(kept.keys.p256dh, "fresh-p256dh");
    }

    #[tokio::test]
    async fn test_send_to_single_subscriber() {
        let (dispatcher, _, delivery) = setup(
            &["https://push.example.com/ok-1", "https://push.example.com/ok-2"],
            false,
        );

        let report = dispatcher
            .send_to("https://push.example.com/ok-2", &NotificationPayload::default())
            .await
            .unwrap();

        assert_eq!(report.result.outcome, DeliveryStatus::Delivered);
        assert!(!report.pruned);
        let visited: Vec<String> = delivery
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|(endpoint, _)| endpoint.clone())
            .collect();
        assert_eq!(visited, vec!["https://push.example.com/ok-2"]);
    }

    #[tokio::test]
    async fn test_send_to_unknown_endpoint() {
        let (dispatcher, _, delivery) = setup(&["https://push.example.com/ok"], false);

        let err = dispatcher
            .send_to("https://push.example.com/missing", &NotificationPayload::default())
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::NotFound));
        assert!(delivery.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_to_expired_prunes_when_enabled() {
        let (dispatcher, registry, _) = setup(&["https://push.example.com/gone"], true);

        let report = dispatcher
            .send_to("https://push.example.com/gone", &NotificationPayload::default())
            .await
            .unwrap();

        assert_eq!(report.result.outcome, DeliveryStatus::Expired);
        assert!(report.pruned);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_ids_are_unique() {
        let (dispatcher, _, _) = setup(&[], false);
        let a = dispatcher.broadcast(&NotificationPayload::default()).await.unwrap();
        let b = dispatcher.broadcast(&NotificationPayload::default()).await.unwrap();
        assert_ne!(a.id, b.id);
    }
}
