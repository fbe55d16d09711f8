//! Connection handling for the Herald HTTP API.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::api::types::{
    HealthResponse, PublicKeyResponse, SendResponse, StatusResponse, SubscriptionStatusResponse,
    SubscriptionsResponse, TestNotificationRequest, TestNotificationResponse, UnsubscribeRequest,
};
use crate::push::NotificationRequest;

/// Errors returned by [`HeraldClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server responded with HTTP {status}: {message}")]
    Api { status: StatusCode, message: String },
}

/// Connection settings.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Base URL, e.g. `http://localhost:5000`.
    pub endpoint: String,
    pub timeout: Duration,
}

impl ConnectConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Client for the Herald HTTP API.
#[derive(Debug, Clone)]
pub struct HeraldClient {
    http: reqwest::Client,
    base: reqwest::Url,
}

impl HeraldClient {
    /// Build a client for the configured endpoint.
    pub fn connect(config: ConnectConfig) -> Result<Self, ClientError> {
        let base = reqwest::Url::parse(config.endpoint.trim_end_matches('/'))
            .map_err(|_| ClientError::InvalidEndpoint(config.endpoint.clone()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ClientError::InvalidEndpoint(config.endpoint));
        }
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, base })
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.get("/api/health").await
    }

    pub async fn subscriptions(&self) -> Result<SubscriptionsResponse, ClientError> {
        self.get("/api/subscriptions").await
    }

    pub async fn vapid_public_key(&self) -> Result<String, ClientError> {
        let response: PublicKeyResponse = self.get("/api/vapid-public-key").await?;
        Ok(response.public_key)
    }

    /// Trigger a broadcast to every subscriber.
    pub async fn send(&self, request: &NotificationRequest) -> Result<SendResponse, ClientError> {
        self.post("/api/send-notification", request).await
    }

    /// Look up one subscription by endpoint.
    pub async fn subscription(
        &self,
        endpoint: &str,
    ) -> Result<SubscriptionStatusResponse, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidEndpoint(self.base.to_string()))?
            .pop_if_empty()
            .extend(["api", "subscription", endpoint]);
        tracing::debug!(%url, "GET");
        let response = self.http.get(url).send().await?;
        decode(response).await
    }

    /// Push a test notification to a single subscriber.
    pub async fn send_test(
        &self,
        request: &TestNotificationRequest,
    ) -> Result<TestNotificationResponse, ClientError> {
        self.post("/api/notify/test", request).await
    }

    pub async fn unsubscribe(&self, endpoint: &str) -> Result<StatusResponse, ClientError> {
        let request = UnsubscribeRequest {
            endpoint: endpoint.to_string(),
        };
        self.post("/api/unsubscribe", &request).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base.as_str().trim_end_matches('/'), path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        tracing::debug!(path, "GET");
        let response = self.http.get(self.url(path)).send().await?;
        decode(response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        tracing::debug!(path, "POST");
        let response = self.http.post(self.url(path)).json(body).send().await?;
        decode(response).await
    }
}

/// Decode a success body, or lift the server's error envelope into
/// [`ClientError::Api`].
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(text);
    Err(ClientError::Api { status, message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_rejects_non_http_endpoint() {
        let err = HeraldClient::connect(ConnectConfig::new("ftp://localhost")).unwrap_err();
        assert!(matches!(err, ClientError::InvalidEndpoint(_)));

        let err = HeraldClient::connect(ConnectConfig::new("not a url")).unwrap_err();
        assert!(matches!(err, ClientError::InvalidEndpoint(_)));
    }

    #[test]
    fn test_trailing_slash_is_ignored() {
        let client = HeraldClient::connect(ConnectConfig::new("http://localhost:5000/")).unwrap();
        assert_eq!(client.url("/api/health"), "http://localhost:5000/api/health");
    }

    #[tokio::test]
    async fn test_subscription_lookup_encodes_endpoint_as_one_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/subscription/https:%2F%2Fpush.example.com%2Fabc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "subscription": {
                    "endpoint": "https://push.example.com/abc",
                    "keys": { "p256dh": "k", "auth": "a" }
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HeraldClient::connect(ConnectConfig::new(server.uri())).unwrap();
        let found = client.subscription("https://push.example.com/abc").await.unwrap();

        assert_eq!(found.subscription.endpoint, "https://push.example.com/abc");
    }

    #[tokio::test]
    async fn test_error_envelope_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/vapid-public-key"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "status": "error",
                "message": "VAPID public key not configured"
            })))
            .mount(&server)
            .await;

        let client = HeraldClient::connect(ConnectConfig::new(server.uri())).unwrap();
        let err = client.vapid_public_key().await.unwrap_err();

        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(message, "VAPID public key not configured");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
