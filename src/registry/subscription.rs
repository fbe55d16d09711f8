//! Browser push subscription records.
//!
//! A subscription is the JSON object produced by the browser's
//! `PushSubscription.toJSON()`. Herald only interprets `endpoint` and the
//! `keys` needed for encryption; every other field is kept verbatim.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Validation failures for an incoming subscription record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("No subscription data provided")]
    Missing,

    #[error("Invalid subscription data: endpoint required")]
    MissingEndpoint,

    #[error("Invalid subscription data: endpoint is not a valid URL")]
    InvalidEndpoint,

    #[error("Invalid subscription data: keys required")]
    MissingKeys,

    #[error("Invalid subscription data: {0}")]
    Malformed(String),
}

/// Key material needed to encrypt a payload for one browser.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    /// Browser's P-256 ECDH public key (base64url).
    pub p256dh: String,
    /// Shared auth secret (base64url).
    pub auth: String,
}

/// A browser's push subscription.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Push service endpoint URL; unique per browser instance.
    pub endpoint: String,
    /// Encryption key material.
    pub keys: SubscriptionKeys,
    /// Fields we do not interpret (e.g. `expirationTime`).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Subscription {
    /// Build a subscription with no extra fields.
    pub fn new(
        endpoint: impl Into<String>,
        p256dh: impl Into<String>,
        auth: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            keys: SubscriptionKeys {
                p256dh: p256dh.into(),
                auth: auth.into(),
            },
            extra: Map::new(),
        }
    }

    /// Validate and decode a raw subscription record.
    ///
    /// Accepts either the bare subscription object or the wrapped form
    /// `{"subscription": {...}, ...}` sent by richer clients.
    pub fn from_json(value: Value) -> Result<Self, SubscriptionError> {
        let mut object = match value {
            Value::Null => return Err(SubscriptionError::Missing),
            Value::Object(object) if object.is_empty() => return Err(SubscriptionError::Missing),
            Value::Object(object) => object,
            _ => {
                return Err(SubscriptionError::Malformed(
                    "expected a JSON object".to_string(),
                ))
            }
        };

        if !object.contains_key("endpoint") {
            if let Some(Value::Object(inner)) = object.remove("subscription") {
                object = inner;
            }
        }

        let endpoint = match object.get("endpoint") {
            Some(Value::String(endpoint)) if !endpoint.trim().is_empty() => endpoint,
            _ => return Err(SubscriptionError::MissingEndpoint),
        };

        match Url::parse(endpoint) {
            Ok(url) if matches!(url.scheme(), "https" | "http") => {}
            _ => return Err(SubscriptionError::InvalidEndpoint),
        }

        let has_key = |name: &str| {
            object
                .get("keys")
                .and_then(|keys| keys.get(name))
                .and_then(Value::as_str)
                .is_some_and(|key| !key.is_empty())
        };
        if !has_key("p256dh") || !has_key("auth") {
            return Err(SubscriptionError::MissingKeys);
        }

        serde_json::from_value(Value::Object(object))
            .map_err(|e| SubscriptionError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(endpoint: &str) -> Value {
        json!({
            "endpoint": endpoint,
            "expirationTime": null,
            "keys": { "p256dh": "BPub", "auth": "secret" }
        })
    }

    #[test]
    fn test_from_json_accepts_browser_record() {
        let sub = Subscription::from_json(raw("https://push.example.com/abc")).unwrap();
        assert_eq!(sub.endpoint, "https://push.example.com/abc");
        assert_eq!(sub.keys.p256dh, "BPub");
        assert_eq!(sub.keys.auth, "secret");
        assert_eq!(sub.extra.get("expirationTime"), Some(&Value::Null));
    }

    #[test]
    fn test_from_json_preserves_unknown_fields_on_serialize() {
        let sub = Subscription::from_json(raw("https://push.example.com/abc")).unwrap();
        let out = serde_json::to_value(&sub).unwrap();
        assert_eq!(out, raw("https://push.example.com/abc"));
    }

    #[test]
    fn test_from_json_unwraps_subscription_envelope() {
        let wrapped = json!({
            "subscription": raw("https://push.example.com/wrapped"),
            "device": { "userAgent": "test" }
        });
        let sub = Subscription::from_json(wrapped).unwrap();
        assert_eq!(sub.endpoint, "https://push.example.com/wrapped");
        assert!(!sub.extra.contains_key("device"));
    }

    #[test]
    fn test_from_json_rejects_missing_data() {
        assert_eq!(
            Subscription::from_json(Value::Null),
            Err(SubscriptionError::Missing)
        );
        assert_eq!(
            Subscription::from_json(json!({})),
            Err(SubscriptionError::Missing)
        );
    }

    #[test]
    fn test_from_json_rejects_missing_endpoint() {
        let value = json!({ "keys": { "p256dh": "a", "auth": "b" } });
        assert_eq!(
            Subscription::from_json(value),
            Err(SubscriptionError::MissingEndpoint)
        );

        let value = json!({ "endpoint": "", "keys": { "p256dh": "a", "auth": "b" } });
        assert_eq!(
            Subscription::from_json(value),
            Err(SubscriptionError::MissingEndpoint)
        );
    }

    #[test]
    fn test_from_json_rejects_non_url_endpoint() {
        assert_eq!(
            Subscription::from_json(raw("not a url")),
            Err(SubscriptionError::InvalidEndpoint)
        );
        assert_eq!(
            Subscription::from_json(raw("ftp://push.example.com/x")),
            Err(SubscriptionError::InvalidEndpoint)
        );
    }

    #[test]
    fn test_from_json_rejects_missing_keys() {
        let value = json!({ "endpoint": "https://push.example.com/abc" });
        assert_eq!(
            Subscription::from_json(value),
            Err(SubscriptionError::MissingKeys)
        );

        let value = json!({
            "endpoint": "https://push.example.com/abc",
            "keys": { "p256dh": "a" }
        });
        assert_eq!(
            Subscription::from_json(value),
            Err(SubscriptionError::MissingKeys)
        );
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(matches!(
            Subscription::from_json(json!([1, 2, 3])),
            Err(SubscriptionError::Malformed(_))
        ));
    }
}
