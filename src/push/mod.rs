//! Web Push building blocks.
//!
//! Provides:
//! - Notification payloads with defaults
//! - VAPID key loading and generation
//! - The delivery adapter that encrypts and sends one message

pub mod delivery;
pub mod payload;
pub mod vapid;

pub use delivery::{DeliveryOutcome, DeliveryStatus, PushDelivery, WebPushDelivery};
pub use payload::{NotificationPayload, NotificationRequest};
pub use vapid::{VapidError, VapidKeys};
