//! Notification payload sent to every subscriber.

use serde::{Deserialize, Serialize};

pub const DEFAULT_TITLE: &str = "Notification";
pub const DEFAULT_BODY: &str = "You have a new message";
pub const DEFAULT_ICON: &str = "/icon.png";
pub const DEFAULT_URL: &str = "/";

pub const TEST_TITLE: &str = "Test Notification";
pub const TEST_BODY: &str = "This is a test notification from your dashboard";

/// Notification request as received from an operator.
///
/// Every field is optional; missing or `null` fields fall back to defaults
/// when converted with [`NotificationRequest::into_payload`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NotificationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl NotificationRequest {
    /// Substitute defaults for missing fields.
    pub fn into_payload(self) -> NotificationPayload {
        NotificationPayload {
            title: self.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            body: self.body.unwrap_or_else(|| DEFAULT_BODY.to_string()),
            icon: self.icon.unwrap_or_else(|| DEFAULT_ICON.to_string()),
            url: self.url.unwrap_or_else(|| DEFAULT_URL.to_string()),
        }
    }

    /// Like [`into_payload`](Self::into_payload), but missing text says this
    /// is a test message.
    pub fn into_test_payload(self) -> NotificationPayload {
        NotificationRequest {
            title: self.title.or_else(|| Some(TEST_TITLE.to_string())),
            body: self.body.or_else(|| Some(TEST_BODY.to_string())),
            ..self
        }
        .into_payload()
    }
}

/// The JSON document encrypted into each push message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub url: String,
}

impl Default for NotificationPayload {
    fn default() -> Self {
        NotificationRequest::default().into_payload()
    }
}

impl NotificationPayload {
    /// Serialize to the bytes handed to the delivery adapter.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
