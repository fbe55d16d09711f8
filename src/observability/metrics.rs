//! Prometheus metrics.
//!
//! Key metrics:
//! - herald_push_deliveries_total{outcome}: Counter of delivery attempts
//! - herald_broadcasts_total: Counter of broadcasts
//! - herald_broadcast_duration_seconds: Histogram of broadcast latency
//! - herald_subscriptions: Gauge of registered subscriptions

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::OnceLock;

use crate::push::DeliveryStatus;

/// Global metrics instance.
static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Herald metrics registry.
#[derive(Debug)]
pub struct Metrics {
    registry: Registry,
    /// Delivery attempts by outcome (delivered, expired, failed).
    pub deliveries_total: IntCounterVec,
    /// Total number of broadcasts.
    pub broadcasts_total: IntCounter,
    /// Histogram of broadcast latency in seconds.
    pub broadcast_duration: Histogram,
    /// Number of registered subscriptions.
    pub subscriptions: IntGauge,
}

impl Metrics {
    fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let deliveries_total = IntCounterVec::new(
            Opts::new("herald_push_deliveries_total", "Push delivery attempts by outcome"),
            &["outcome"],
        )?;
        let broadcasts_total =
            IntCounter::new("herald_broadcasts_total", "Total number of broadcasts")?;
        let broadcast_duration = Histogram::with_opts(
            HistogramOpts::new(
                "herald_broadcast_duration_seconds",
                "Time to deliver a broadcast to every subscriber",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]),
        )?;
        let subscriptions =
            IntGauge::new("herald_subscriptions", "Number of registered subscriptions")?;

        registry.register(Box::new(deliveries_total.clone()))?;
        registry.register(Box::new(broadcasts_total.clone()))?;
        registry.register(Box::new(broadcast_duration.clone()))?;
        registry.register(Box::new(subscriptions.clone()))?;

        Ok(Self {
            registry,
            deliveries_total,
            broadcasts_total,
            broadcast_duration,
            subscriptions,
        })
    }
}

/// Initialize the metrics system.
///
/// This should be called once at startup. Subsequent calls are ignored.
pub fn init_metrics() {
    if METRICS.get().is_some() {
        return;
    }
    match Metrics::new() {
        Ok(metrics) => {
            let _ = METRICS.set(metrics);
        }
        Err(e) => tracing::warn!(error = %e, "Failed to create metrics, recording disabled"),
    }
}

/// Registry to expose over HTTP; empty when metrics are not initialized.
pub fn prometheus_registry() -> Registry {
    METRICS
        .get()
        .map(|m| m.registry.clone())
        .unwrap_or_default()
}

/// Record one delivery attempt.
pub fn record_delivery(outcome: DeliveryStatus) {
    if let Some(m) = METRICS.get() {
        m.deliveries_total.with_label_values(&[outcome.as_str()]).inc();
    }
}

/// Record a completed broadcast.
pub fn record_broadcast(latency_seconds: f64) {
    if let Some(m) = METRICS.get() {
        m.broadcasts_total.inc();
        m.broadcast_duration.observe(latency_seconds);
    }
}

/// Record the current registry size.
pub fn set_subscription_count(count: usize) {
    if let Some(m) = METRICS.get() {
        m.subscriptions.set(i64::try_from(count).unwrap_or(i64::MAX));
    }
}
