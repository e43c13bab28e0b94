//! Slack incoming-webhook driver.
//!
//! Settings read from [`ChannelConfig`]:
//!
//! - `webhook_url`: incoming webhook URL (required for readiness)
//! - `username`, `icon_emoji`, `channel`: optional message overrides
//! - `timeout_secs`: request timeout, default 10

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::channels::NotificationChannel;
use crate::config::ChannelConfig;
use crate::error::ChannelError;
use crate::notification::{ChannelType, Notification, NotificationResponse};
use crate::validation;

/// Environment variable for Slack webhook URL.
const ENV_SLACK_WEBHOOK_URL: &str = "SLACK_WEBHOOK_URL";

/// Slack rejects message text above this length.
const MAX_TEXT_CHARS: usize = 40_000;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Slack webhook notification channel.
pub struct SlackChannel {
    name: String,
    webhook_url: Option<String>,
    username: Option<String>,
    icon_emoji: Option<String>,
    target_channel: Option<String>,
    priority: i32,
    weight: Option<f64>,
    timeout: Duration,
    client: reqwest::Client,
}

impl SlackChannel {
    /// Create a Slack channel from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let webhook_url = std::env::var(ENV_SLACK_WEBHOOK_URL)
            .ok()
            .filter(|s| !s.trim().is_empty());

        if webhook_url.is_some() {
            debug!("Slack notifications enabled");
        } else {
            debug!("Slack notifications disabled (SLACK_WEBHOOK_URL not set)");
        }

        let mut channel = Self::from_config(&ChannelConfig::new("slack"));
        channel.webhook_url = webhook_url;
        channel
    }

    /// Create a Slack channel with a specific webhook URL.
    #[must_use]
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self::from_config(&ChannelConfig::new("slack").with_setting("webhook_url", webhook_url.into()))
    }

    /// Create a Slack channel from its configuration.
    #[must_use]
    pub fn from_config(config: &ChannelConfig) -> Self {
        let setting = |key: &str| config.setting_str(key).map(str::to_string);
        Self {
            name: config.name.clone(),
            webhook_url: setting("webhook_url"),
            username: setting("username"),
            icon_emoji: setting("icon_emoji"),
            target_channel: setting("channel"),
            priority: config.priority,
            weight: config.weight,
            timeout: Duration::from_secs(
                config
                    .setting_u64("timeout_secs")
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            client: reqwest::Client::new(),
        }
    }

    /// Factory for [`NotificationManager::register_factory`](crate::NotificationManager::register_factory).
    pub fn factory() -> impl Fn(ChannelConfig) -> Arc<dyn NotificationChannel> + Send + Sync {
        |config: ChannelConfig| Arc::new(Self::from_config(&config)) as Arc<dyn NotificationChannel>
    }

    /// Format a notification as a Slack webhook payload.
    fn format_payload(&self, notification: &Notification) -> SlackPayload {
        let content = notification.content().unwrap_or_default().to_string();

        let attachments = match &notification.title {
            Some(title) => vec![SlackAttachment {
                fallback: title.clone(),
                color: severity_color(notification).to_string(),
                title: title.clone(),
                text: content.clone(),
                fields: format_fields(notification),
            }],
            None => vec![],
        };

        SlackPayload {
            text: notification.title.clone().unwrap_or(content),
            username: self.username.clone(),
            icon_emoji: self.icon_emoji.clone(),
            channel: self.target_channel.clone(),
            attachments,
        }
    }
}

#[async_trait]
impl NotificationChannel for SlackChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn channel_type(&self) -> ChannelType {
        ChannelType::chat()
    }

    fn is_ready(&self) -> bool {
        self.webhook_url.is_some()
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn weight(&self) -> Option<f64> {
        self.weight
    }

    fn validate(&self, notification: &Notification) -> Result<(), ChannelError> {
        validation::require_max_length(&self.name, notification, MAX_TEXT_CHARS)
    }

    async fn send(
        &self,
        notification: &Notification,
    ) -> Result<NotificationResponse, ChannelError> {
        self.validate(notification)?;

        let webhook_url = self
            .webhook_url
            .as_ref()
            .ok_or_else(|| ChannelError::NotConfigured(ENV_SLACK_WEBHOOK_URL.to_string()))?;

        let payload = self.format_payload(notification);

        debug!(channel = %self.name, "Sending notification");

        let response = match self
            .client
            .post(webhook_url)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(channel = %self.name, error = %e, "Slack webhook request failed");
                return Ok(NotificationResponse::failure(format!(
                    "HTTP request failed: {e}"
                )));
            }
        };

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(channel = %self.name, error = %e, "Failed to read Slack response body");
                String::new()
            }
        };

        if status.is_success() {
            debug!(channel = %self.name, "Notification sent successfully");
            return Ok(NotificationResponse::sent(None)
                .with_raw(Value::String(body))
                .with_extra("statusCode", status.as_u16()));
        }

        warn!(
            channel = %self.name,
            status = %status,
            body = %body,
            "Slack webhook request failed"
        );

        let mut failure = NotificationResponse::failure(format!("Slack returned {status}: {body}"))
            .with_raw(Value::String(body))
            .with_extra("statusCode", status.as_u16());
        if let Some(secs) = retry_after {
            failure = failure.with_extra("retryAfterSecs", secs);
        }
        Ok(failure)
    }
}

/// Attachment color from the notification's `severity` or `color` field.
fn severity_color(notification: &Notification) -> &str {
    if let Some(color) = notification.field("color").and_then(Value::as_str) {
        return color;
    }
    match notification.field("severity").and_then(Value::as_str) {
        Some("warning") => "#f39c12",  // Orange
        Some("critical") => "#e74c3c", // Red
        _ => "#3498db",                // Blue
    }
}

/// Attachment fields from the notification's `fields` object.
fn format_fields(notification: &Notification) -> Vec<SlackField> {
    let Some(Value::Object(map)) = notification.field("fields") else {
        return vec![];
    };
    map.iter()
        .map(|(title, value)| SlackField {
            title: title.clone(),
            value: match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            short: true,
        })
        .collect()
}

// =============================================================================
// Slack API types
// =============================================================================

#[derive(Debug, Serialize)]
struct SlackPayload {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon_emoji: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<SlackAttachment>,
}

#[derive(Debug, Serialize)]
struct SlackAttachment {
    fallback: String,
    color: String,
    title: String,
    text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<SlackField>,
}

#[derive(Debug, Serialize)]
struct SlackField {
    title: String,
    value: String,
    short: bool,
}
