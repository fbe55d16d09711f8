//! Test utilities and in-process harness for Herald tests.
//!
//! Provides:
//! - A scripted delivery adapter with deterministic outcomes
//! - A router harness that drives requests through `tower::ServiceExt`
//! - Browser subscription fixtures with real P-256 key material

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
use herald::api::{create_router, AppState};
use herald::config::Config;
use herald::observability::tracing::init_test_tracing;
use herald::push::{DeliveryOutcome, PushDelivery};
use herald::registry::Subscription;
use herald::server::{build_state_with_delivery, router_options};
use p256::elliptic_curve::rand_core::OsRng;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Delivery stub: endpoints containing `fail` fail, endpoints containing
/// `gone` are reported expired, everything else is delivered.
#[derive(Default)]
pub struct ScriptedDelivery {
    pub calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedDelivery {
    pub fn visited(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(endpoint, _)| endpoint.clone())
            .collect()
    }

    pub fn payloads(&self) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

#[async_trait]
impl PushDelivery for ScriptedDelivery {
    async fn deliver(&self, subscription: &Subscription, payload: &[u8]) -> DeliveryOutcome {
        let payload = serde_json::from_slice(payload).expect("payload should be JSON");
        self.calls
            .lock()
            .unwrap()
            .push((subscription.endpoint.clone(), payload));

        if subscription.endpoint.contains("fail") {
            DeliveryOutcome::Failed("scripted failure".into())
        } else if subscription.endpoint.contains("gone") {
            DeliveryOutcome::Expired
        } else {
            DeliveryOutcome::Delivered
        }
    }
}

/// Router plus handles to its collaborators.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub delivery: Arc<ScriptedDelivery>,
}

impl TestApp {
    /// App with a scripted delivery adapter and the given public key.
    pub fn new(config: &Config, vapid_public_key: Option<&str>) -> Self {
        init_test_tracing();
        let delivery = Arc::new(ScriptedDelivery::default());
        let state = build_state_with_delivery(
            config,
            delivery.clone(),
            vapid_public_key.map(str::to_string),
            vapid_public_key.is_some(),
        );
        let router = create_router(state.clone(), &router_options(config));
        Self {
            router,
            state,
            delivery,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&Config::test_config(), None)
    }

    /// Send a request and decode the JSON response body.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    /// Send a raw request and decode the JSON response body.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn subscribe(&self, endpoint: &str) -> (StatusCode, Value) {
        self.post("/api/subscribe", subscription_json(endpoint)).await
    }
}

/// A browser-style subscription record with placeholder keys.
pub fn subscription_json(endpoint: &str) -> Value {
    json!({
        "endpoint": endpoint,
        "expirationTime": null,
        "keys": { "p256dh": "BPlaceholderKey", "auth": "placeholder" }
    })
}

/// Key material a real browser would generate for a subscription.
pub struct BrowserKeys {
    pub p256dh: String,
    pub auth: String,
}

impl BrowserKeys {
    pub fn generate() -> Self {
        let secret = p256::SecretKey::random(&mut OsRng);
        let public = secret.public_key().to_encoded_point(false);
        Self {
            p256dh: BASE64URL.encode(public.as_bytes()),
            auth: BASE64URL.encode([7u8; 16]),
        }
    }

    pub fn subscription(&self, endpoint: &str) -> Subscription {
        Subscription::new(endpoint, self.p256dh.clone(), self.auth.clone())
    }

    pub fn subscription_json(&self, endpoint: &str) -> Value {
        json!({
            "endpoint": endpoint,
            "expirationTime": null,
            "keys": { "p256dh": self.p256dh, "auth": self.auth }
        })
    }
}
