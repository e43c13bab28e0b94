//! Registry and channel configuration.
//!
//! Configuration is read from a TOML file, a JSON value, or environment
//! variables:
//!
//! - `NOTIFY_DEFAULT_CHANNEL`: name of the default channel
//! - `NOTIFY_ENABLE_FALLBACK`: set to "false" or "0" to disable fallback lookup
//!
//! ```toml
//! default_channel = "alerts"
//!
//! [[channels]]
//! name = "slack-primary"
//! driver = "slack"
//! priority = 10
//! settings = { webhook_url = "https://hooks.slack.com/services/T/B/X" }
//!
//! [[groups]]
//! name = "alerts"
//! strategy = "priority_fallback"
//! members = ["slack-primary"]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::env;
use std::path::Path;

use crate::error::ManagerError;
use crate::group::Strategy;

/// Environment variable naming the default channel.
const ENV_DEFAULT_CHANNEL: &str = "NOTIFY_DEFAULT_CHANNEL";

/// Environment variable toggling fallback lookup.
const ENV_ENABLE_FALLBACK: &str = "NOTIFY_ENABLE_FALLBACK";

const fn default_true() -> bool {
    true
}

/// Configuration for a [`NotificationManager`](crate::NotificationManager).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Channel returned by `get_default_channel`.
    #[serde(default)]
    pub default_channel: Option<String>,
    /// Whether `get_channel_with_fallback` may scan other channels.
    #[serde(default = "default_true")]
    pub enable_fallback: bool,
    /// Channels to build through registered factories, in order.
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
    /// Fallback groups over the channels above.
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            default_channel: None,
            enable_fallback: true,
            channels: Vec::new(),
            groups: Vec::new(),
        }
    }
}

impl ManagerConfig {
    /// Read the registry flags from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let default_channel = env::var(ENV_DEFAULT_CHANNEL)
            .ok()
            .filter(|s| !s.trim().is_empty());
        let enable_fallback = env::var(ENV_ENABLE_FALLBACK)
            .map(|v| !(v.eq_ignore_ascii_case("false") || v == "0"))
            .unwrap_or(true);

        Self {
            default_channel,
            enable_fallback,
            ..Default::default()
        }
    }

    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Config`] if the document is malformed.
    pub fn from_toml_str(content: &str) -> Result<Self, ManagerError> {
        toml::from_str(content).map_err(|e| ManagerError::Config(e.to_string()))
    }

    /// Parse a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Config`] if the value does not match.
    pub fn from_json(value: Value) -> Result<Self, ManagerError> {
        serde_json::from_value(value).map_err(|e| ManagerError::Config(e.to_string()))
    }

    /// Load a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Config`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManagerError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ManagerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }
}

/// Configuration for one channel instance.
///
/// `settings` is opaque to the core and interpreted by the driver's factory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Logical name the instance is registered under.
    pub name: String,
    /// Factory to build it with; defaults to `name`.
    #[serde(default)]
    pub driver: Option<String>,
    /// Higher is tried first.
    #[serde(default)]
    pub priority: i32,
    /// Relative selection weight for random groups; unset counts as 1.
    #[serde(default)]
    pub weight: Option<f64>,
    /// Driver-specific credentials and endpoints.
    #[serde(default)]
    pub settings: Map<String, Value>,
}

impl ChannelConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = Some(driver.into());
        self
    }

    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub const fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    #[must_use]
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Factory name used to build this channel.
    #[must_use]
    pub fn driver_name(&self) -> &str {
        self.driver.as_deref().unwrap_or(&self.name)
    }

    /// Get a non-empty string setting.
    #[must_use]
    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.settings
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Get an integer setting.
    #[must_use]
    pub fn setting_u64(&self, key: &str) -> Option<u64> {
        self.settings.get(key).and_then(Value::as_u64)
    }
}

/// Configuration for a fallback group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Logical name the group is registered under.
    pub name: String,
    /// Channel family reported by the group; defaults to the first member's.
    #[serde(default)]
    pub channel_type: Option<String>,
    #[serde(default)]
    pub strategy: Strategy,
    /// Priority of the group itself within the registry.
    #[serde(default)]
    pub priority: i32,
    /// Names of registered channels, in registration order.
    pub members: Vec<String>,
}
