//! Channel contract and driver implementations.

pub mod slack;

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::notification::{ChannelType, Notification, NotificationResponse};
use crate::validation;

/// Trait every delivery driver (Slack, FCM, SMTP, ...) implements.
///
/// [`FallbackGroup`](crate::FallbackGroup) implements it as well, so a group
/// can be registered wherever a single driver can.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Name of this driver (e.g. "slack").
    fn name(&self) -> &str;

    /// Channel family this driver delivers to.
    fn channel_type(&self) -> ChannelType;

    /// Cheap local check that the driver is configured. Must not block or
    /// contact the provider.
    fn is_ready(&self) -> bool;

    /// Dispatch priority; higher is tried first.
    fn priority(&self) -> i32 {
        0
    }

    /// Relative selection weight for weighted random groups. `None` counts
    /// as 1.
    fn weight(&self) -> Option<f64> {
        None
    }

    /// Structural check of the request before any provider call.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Validation`] if the request shape is rejected.
    fn validate(&self, notification: &Notification) -> Result<(), ChannelError> {
        validation::require_content(self.name(), notification)
    }

    /// Send a notification.
    ///
    /// Provider failures are reported as a response with `success: false`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed requests, or a provider
    /// error when the driver cannot express the failure as a response.
    async fn send(&self, notification: &Notification)
        -> Result<NotificationResponse, ChannelError>;
}
