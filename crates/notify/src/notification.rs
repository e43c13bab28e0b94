//! Notification payloads, responses and channel families.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifier of a logical channel family ("email", "sms", "push", ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelType(String);

impl ChannelType {
    /// Create a channel type from any family name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn email() -> Self {
        Self::new("email")
    }

    #[must_use]
    pub fn sms() -> Self {
        Self::new("sms")
    }

    #[must_use]
    pub fn push() -> Self {
        Self::new("push")
    }

    #[must_use]
    pub fn chat() -> Self {
        Self::new("chat")
    }

    #[must_use]
    pub fn social() -> Self {
        Self::new("social")
    }

    /// Get the family name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A logical notification submitted once and handed to whichever driver is
/// selected.
///
/// Drivers translate it into their own wire shape. Fields the core does not
/// know about are kept in `fields` and serialized inline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Address, phone number, device token or chat target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Notification {
    /// Create a notification carrying a plain text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    /// Attach a driver-specific field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// The message content, checking `message`, `text` then `body`.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        [&self.message, &self.text, &self.body]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|s| !s.trim().is_empty())
    }

    /// Get a driver-specific field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// Delivery state reported by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Accepted by the provider
    Sent,
    /// Accepted for later delivery
    Queued,
    /// Delivered to only some recipients
    Partial,
    /// Rejected or not delivered
    Failed,
}

impl DeliveryStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Queued => "queued",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single send.
///
/// The dispatcher only looks at `success` and `error`. `raw` and the
/// flattened `extra` fields (`units`, `successCount`, ...) are passed back to
/// the caller untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub status: DeliveryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NotificationResponse {
    /// A successful send with an optional provider reference.
    #[must_use]
    pub fn sent(message_id: Option<String>) -> Self {
        Self {
            success: true,
            message_id,
            status: DeliveryStatus::Sent,
            error: None,
            raw: None,
            extra: Map::new(),
        }
    }

    /// A failed send.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            status: DeliveryStatus::Failed,
            error: Some(error.into()),
            raw: None,
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: DeliveryStatus) -> Self {
        self.status = status;
        self
    }

    /// Attach the provider's raw response body.
    #[must_use]
    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Attach a driver-specific extension field.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}
