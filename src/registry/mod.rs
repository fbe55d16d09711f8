//! In-memory subscription registry.
//!
//! Subscriptions are keyed by endpoint and kept in insertion order. The
//! registry lives for the lifetime of the process; nothing is persisted.

mod subscription;

pub use subscription::{Subscription, SubscriptionError, SubscriptionKeys};

use indexmap::IndexMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Result of adding a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The subscription was appended.
    Added,
    /// A subscription with the same endpoint already exists; nothing changed.
    AlreadySubscribed,
}

/// Registry of active push subscriptions.
///
/// Shared between request handlers and the dispatcher via `Arc`.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    /// Map of endpoint -> subscription, in insertion order.
    entries: Mutex<IndexMap<String, Subscription>>,
}

impl SubscriptionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<String, Subscription>> {
        // The map is never left half-updated, so a poisoned lock is still usable.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a subscription unless its endpoint is already registered.
    pub fn add(&self, subscription: Subscription) -> AddOutcome {
        let mut entries = self.lock();

        if entries.contains_key(&subscription.endpoint) {
            return AddOutcome::AlreadySubscribed;
        }

        entries.insert(subscription.endpoint.clone(), subscription);
        tracing::info!(total = entries.len(), "New subscription added");
        AddOutcome::Added
    }

    /// Remove the subscription with the given endpoint.
    ///
    /// Returns the number of entries removed (0 or 1). Removing an unknown
    /// endpoint is not an error.
    pub fn remove(&self, endpoint: &str) -> usize {
        let mut entries = self.lock();
        let removed = usize::from(entries.shift_remove(endpoint).is_some());
        if removed > 0 {
            tracing::info!(total = entries.len(), "Subscription removed");
        }
        removed
    }

    /// Remove each listed subscription if the registry still holds that
    /// exact record.
    ///
    /// An endpoint that was re-subscribed with different keys since `stale`
    /// was snapshotted is left alone. Returns how many entries were removed.
    pub fn remove_stale(&self, stale: &[Subscription]) -> usize {
        let mut entries = self.lock();
        stale
            .iter()
            .filter(|snapshot| {
                if entries.get(&snapshot.endpoint) == Some(*snapshot) {
                    entries.shift_remove(&snapshot.endpoint);
                    true
                } else {
                    false
                }
            })
            .count()
    }

    /// Look up a subscription by endpoint.
    pub fn get(&self, endpoint: &str) -> Option<Subscription> {
        self.lock().get(endpoint).cloned()
    }

    /// Snapshot of all subscriptions in registry order.
    pub fn list(&self) -> Vec<Subscription> {
        self.lock().values().cloned().collect()
    }

    /// Whether a subscription with this endpoint exists.
    pub fn contains(&self, endpoint: &str) -> bool {
        self.lock().contains_key(endpoint)
    }

    /// Number of registered subscriptions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
