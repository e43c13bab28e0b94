//! Error types for the notification dispatcher.

use thiserror::Error;

use crate::notification::NotificationResponse;

/// Boxed error carried by provider failures for diagnostics.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by a channel's `send`.
///
/// Ordinary provider failures are reported as a failed
/// [`NotificationResponse`](crate::NotificationResponse), not through this type.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The request shape was rejected before any provider call
    #[error("Invalid notification for {channel}: {message}")]
    Validation { channel: String, message: String },

    /// The underlying provider call failed and the driver chose to raise it
    #[error("Provider error from {channel}: {message}")]
    Provider {
        channel: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Every member of a priority group failed its readiness check
    #[error("All drivers unavailable for group {group}")]
    AllDriversUnavailable { group: String },

    /// Channel is missing required configuration
    #[error("Channel not configured: {0}")]
    NotConfigured(String),
}

impl ChannelError {
    /// Build a validation error for `channel`.
    pub fn validation(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Build a provider error for `channel` without an underlying source.
    pub fn provider(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            channel: channel.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Build a provider error wrapping the driver's raw error.
    pub fn provider_with_source(
        channel: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        let source = source.into();
        Self::Provider {
            channel: channel.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Whether the request shape itself was rejected.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Whether the failure came from the provider side and may be retried
    /// on another driver.
    #[must_use]
    pub const fn is_provider(&self) -> bool {
        matches!(self, Self::Provider { .. } | Self::NotConfigured(_))
    }

    /// Express this error as a failed send.
    ///
    /// A provider error's underlying source is kept in the `errorSource`
    /// extension field in its debug form.
    #[must_use]
    pub fn to_failure_response(&self) -> NotificationResponse {
        let response = NotificationResponse::failure(self.to_string());
        match self {
            Self::Provider {
                source: Some(source),
                ..
            } => response.with_extra("errorSource", format!("{source:?}")),
            _ => response,
        }
    }
}

/// Errors raised while building a [`FallbackGroup`](crate::FallbackGroup).
#[derive(Debug, Error)]
pub enum GroupError {
    /// A group needs at least one member
    #[error("Fallback group {0} has no members")]
    Empty(String),

    /// A member weight is negative or not finite
    #[error("Invalid weight {weight} for member {member} of group {group}")]
    InvalidWeight {
        group: String,
        member: String,
        weight: f64,
    },

    /// Member weights add up past the largest representable number
    #[error("Member weights of group {0} do not sum to a finite number")]
    NonFiniteTotalWeight(String),

    /// Random selection needs a positive total weight
    #[error("Member weights of group {0} sum to zero")]
    ZeroTotalWeight(String),

    /// A configured group references a channel that is not registered
    #[error("Group {group} references unknown channel {member}")]
    UnknownMember { group: String, member: String },
}

/// Errors raised by the [`NotificationManager`](crate::NotificationManager).
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Lookup by an unregistered name
    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    /// `get_default_channel` called with no default set
    #[error("No default channel configured")]
    NoDefaultChannelConfigured,

    /// No factory is registered under the requested driver name
    #[error("No factory registered for driver: {0}")]
    UnknownFactory(String),

    /// No registered channel is ready to send
    #[error("No channel available")]
    NoChannelAvailable,

    /// Group construction failed
    #[error(transparent)]
    Group(#[from] GroupError),

    /// The selected channel raised while sending
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),
}
