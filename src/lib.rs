//! Herald: a Web Push fan-out backend.
//!
//! Herald stores browser push subscriptions in memory and broadcasts
//! notifications to every subscriber using the standard Web Push protocol
//! (RFC 8030) with VAPID authentication (RFC 8292).
//!
//! # Architecture
//!
//! - **Registry**: an insertion-ordered, endpoint-keyed subscription set
//! - **Dispatcher**: sequential fan-out with per-subscriber outcomes
//! - **Delivery**: payload encryption and transport to push services
//! - **HTTP API**: axum handlers behind a CORS allow-list
//!
//! # Modules
//!
//! - [`api`]: HTTP router, handlers and wire types
//! - [`client`]: HTTP client used by `heraldctl`
//! - [`config`]: CLI and environment configuration
//! - [`dispatch`]: Broadcast fan-out
//! - [`error`]: API error taxonomy
//! - [`observability`]: Tracing and metrics setup
//! - [`push`]: Payloads, VAPID keys and the delivery adapter
//! - [`registry`]: Subscription storage
//! - [`server`]: Server wiring and lifecycle

// Lint configuration
#![warn(clippy::all)]
#![allow(
    clippy::module_name_repetitions, // registry::SubscriptionRegistry is fine
    clippy::must_use_candidate,      // Not all functions need #[must_use]
    clippy::missing_errors_doc,      // Error docs can be verbose
    clippy::missing_panics_doc       // Panic docs can be verbose
)]

pub mod api;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod observability;
pub mod push;
pub mod registry;
pub mod server;

use uuid::Uuid;

/// Generate a new UUIDv7 (time-sortable) broadcast ID.
///
/// # Example
///
/// ```
/// let id = herald::generate_broadcast_id();
/// assert!(id.len() == 36); // UUID string format
/// ```
#[must_use]
pub fn generate_broadcast_id() -> String {
    Uuid::now_v7().to_string()
}
