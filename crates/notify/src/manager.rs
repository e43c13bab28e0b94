//! Channel registry.
//!
//! The [`NotificationManager`] maps logical names to channel instances and
//! factories, and resolves which channel should handle a send.

use futures::future::join_all;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::channels::NotificationChannel;
use crate::config::{ChannelConfig, GroupConfig, ManagerConfig};
use crate::error::{GroupError, ManagerError};
use crate::group::FallbackGroup;
use crate::notification::{ChannelType, Notification, NotificationResponse};

/// Builds a channel instance from its configuration.
pub type ChannelFactory = Arc<dyn Fn(ChannelConfig) -> Arc<dyn NotificationChannel> + Send + Sync>;

/// A registered channel and its registration sequence number, used to break
/// priority ties.
struct Entry {
    channel: Arc<dyn NotificationChannel>,
    seq: u64,
}

/// Registry of named notification channels.
pub struct NotificationManager {
    channels: HashMap<String, Entry>,
    factories: HashMap<String, ChannelFactory>,
    default_channel: Option<String>,
    fallback_enabled: bool,
    next_seq: u64,
}

impl fmt::Debug for NotificationManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationManager")
            .field("channels", &self.available_channels())
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .field("default_channel", &self.default_channel)
            .field("fallback_enabled", &self.fallback_enabled)
            .finish()
    }
}

impl Default for NotificationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationManager {
    /// Create an empty registry with fallback enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: HashMap::new(),
            factories: HashMap::new(),
            default_channel: None,
            fallback_enabled: true,
            next_seq: 0,
        }
    }

    /// Create an empty registry with the default channel and fallback flag
    /// taken from `config`.
    ///
    /// The default channel is not checked here since it is usually registered
    /// afterwards.
    #[must_use]
    pub fn from_config(config: &ManagerConfig) -> Self {
        Self {
            default_channel: config.default_channel.clone(),
            fallback_enabled: config.enable_fallback,
            ..Self::new()
        }
    }

    /// Register a factory under `name`, replacing any previous one.
    pub fn register_factory<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(ChannelConfig) -> Arc<dyn NotificationChannel> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!(factory = %name, "Registering channel factory");
        self.factories.insert(name, Arc::new(factory));
        self
    }

    /// Register a channel instance under `name`, replacing any previous one.
    ///
    /// A replaced name takes a fresh registration sequence number.
    pub fn register_channel(
        &mut self,
        name: impl Into<String>,
        channel: Arc<dyn NotificationChannel>,
    ) -> &mut Self {
        let name = name.into();
        let seq = self.next_seq;
        self.next_seq += 1;

        if self.channels.insert(name.clone(), Entry { channel, seq }).is_some() {
            debug!(channel = %name, "Replaced registered channel");
        } else {
            debug!(channel = %name, "Registered channel");
        }
        self
    }

    /// Build a channel with the factory named by `config.driver` (or the
    /// channel name) and register it under `config.name`.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::UnknownFactory`] if no such factory exists.
    pub fn create_channel(&mut self, config: ChannelConfig) -> Result<&mut Self, ManagerError> {
        let (name, channel) = self.build_channel(config)?;
        Ok(self.register_channel(name, channel))
    }

    /// Build a fallback group over registered channels and register it.
    ///
    /// # Errors
    ///
    /// Returns [`GroupError::UnknownMember`] if a member is not registered, or
    /// any error from [`FallbackGroupBuilder::build`](crate::FallbackGroupBuilder::build).
    pub fn create_group(&mut self, config: &GroupConfig) -> Result<&mut Self, ManagerError> {
        let group = self.build_group(config, &[])?;
        Ok(self.register_channel(config.name.clone(), group))
    }

    /// Build every channel and group in `config`, in order, then apply its
    /// default channel and fallback flag.
    ///
    /// Nothing is registered unless the whole configuration builds, so a
    /// failed load leaves the registry as it was.
    ///
    /// # Errors
    ///
    /// Returns the first factory, group or default-channel error encountered.
    pub fn load_config(&mut self, config: &ManagerConfig) -> Result<&mut Self, ManagerError> {
        let mut staged: Vec<(String, Arc<dyn NotificationChannel>)> = Vec::new();
        for channel in &config.channels {
            staged.push(self.build_channel(channel.clone())?);
        }
        for group in &config.groups {
            let built = self.build_group(group, &staged)?;
            staged.push((group.name.clone(), built));
        }

        if let Some(default) = &config.default_channel {
            let known = self.channels.contains_key(default)
                || staged.iter().any(|(name, _)| name == default);
            if !known {
                return Err(ManagerError::ChannelNotFound(default.clone()));
            }
        }

        for (name, channel) in staged {
            self.register_channel(name, channel);
        }
        self.set_fallback_enabled(config.enable_fallback);
        if let Some(default) = &config.default_channel {
            self.set_default_channel(default)?;
        }

        info!(
            channels = self.channels.len(),
            ready = self.ready_channels().len(),
            "Notification channels loaded"
        );
        Ok(self)
    }

    fn build_channel(
        &self,
        config: ChannelConfig,
    ) -> Result<(String, Arc<dyn NotificationChannel>), ManagerError> {
        let factory = self
            .factories
            .get(config.driver_name())
            .cloned()
            .ok_or_else(|| ManagerError::UnknownFactory(config.driver_name().to_string()))?;

        let name = config.name.clone();
        let driver = config.driver_name().to_string();
        let channel = factory(config);
        info!(
            channel = %name,
            driver = %driver,
            ready = channel.is_ready(),
            "Created channel"
        );
        Ok((name, channel))
    }

    /// Members resolve against `staged` first (latest entry wins), then the
    /// registry.
    fn build_group(
        &self,
        config: &GroupConfig,
        staged: &[(String, Arc<dyn NotificationChannel>)],
    ) -> Result<Arc<dyn NotificationChannel>, ManagerError> {
        let mut builder = FallbackGroup::builder(&config.name, config.strategy)
            .priority(config.priority);
        if let Some(channel_type) = &config.channel_type {
            builder = builder.channel_type(ChannelType::new(channel_type.as_str()));
        }

        for member in &config.members {
            let channel = staged
                .iter()
                .rev()
                .find(|(name, _)| name == member)
                .map(|(_, channel)| channel)
                .or_else(|| self.channels.get(member).map(|entry| &entry.channel))
                .ok_or_else(|| GroupError::UnknownMember {
                    group: config.name.clone(),
                    member: member.clone(),
                })?;
            builder = builder.member(Arc::clone(channel));
        }

        let group = builder.build()?;
        info!(
            group = %config.name,
            strategy = %config.strategy,
            members = config.members.len(),
            "Created fallback group"
        );
        Ok(Arc::new(group))
    }

    /// Look up a channel by exact name, ignoring readiness.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::ChannelNotFound`] if `name` is not registered.
    pub fn get_channel(&self, name: &str) -> Result<Arc<dyn NotificationChannel>, ManagerError> {
        self.channels
            .get(name)
            .map(|entry| Arc::clone(&entry.channel))
            .ok_or_else(|| ManagerError::ChannelNotFound(name.to_string()))
    }

    /// Get the configured default channel.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NoDefaultChannelConfigured`] if no default is
    /// set, or [`ManagerError::ChannelNotFound`] if it is no longer
    /// registered.
    pub fn get_default_channel(&self) -> Result<Arc<dyn NotificationChannel>, ManagerError> {
        let name = self
            .default_channel
            .as_deref()
            .ok_or(ManagerError::NoDefaultChannelConfigured)?;
        self.get_channel(name)
    }

    /// Resolve the best available channel.
    ///
    /// Returns `preferred` when it is registered and ready. Otherwise, if
    /// fallback is enabled, returns the first ready channel in priority
    /// order. Returns `None` when nothing qualifies.
    #[must_use]
    pub fn get_channel_with_fallback(
        &self,
        preferred: Option<&str>,
    ) -> Option<Arc<dyn NotificationChannel>> {
        if let Some(name) = preferred {
            match self.channels.get(name) {
                Some(entry) if entry.channel.is_ready() => {
                    return Some(Arc::clone(&entry.channel));
                }
                Some(_) => debug!(channel = name, "Preferred channel not ready"),
                None => debug!(channel = name, "Preferred channel not registered"),
            }
        }

        if !self.fallback_enabled {
            return None;
        }

        let fallback = self
            .sorted_entries()
            .into_iter()
            .find(|(_, entry)| entry.channel.is_ready());

        match fallback {
            Some((name, entry)) => {
                debug!(channel = %name, preferred = ?preferred, "Using fallback channel");
                Some(Arc::clone(&entry.channel))
            }
            None => {
                warn!(preferred = ?preferred, "No ready notification channel");
                None
            }
        }
    }

    /// Names of all registered channels in priority order.
    #[must_use]
    pub fn available_channels(&self) -> Vec<String> {
        self.sorted_entries()
            .into_iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Names of ready channels in priority order.
    #[must_use]
    pub fn ready_channels(&self) -> Vec<String> {
        self.sorted_entries()
            .into_iter()
            .filter(|(_, entry)| entry.channel.is_ready())
            .map(|(name, _)| name.clone())
            .collect()
    }

    #[must_use]
    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// Whether `name` is registered and ready.
    #[must_use]
    pub fn is_channel_ready(&self, name: &str) -> bool {
        self.channels
            .get(name)
            .is_some_and(|entry| entry.channel.is_ready())
    }

    #[must_use]
    pub fn has_factory(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Set the default channel.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::ChannelNotFound`] if `name` is not registered.
    pub fn set_default_channel(&mut self, name: &str) -> Result<&mut Self, ManagerError> {
        if !self.channels.contains_key(name) {
            return Err(ManagerError::ChannelNotFound(name.to_string()));
        }
        self.default_channel = Some(name.to_string());
        Ok(self)
    }

    #[must_use]
    pub fn default_channel_name(&self) -> Option<&str> {
        self.default_channel.as_deref()
    }

    pub fn set_fallback_enabled(&mut self, enabled: bool) -> &mut Self {
        self.fallback_enabled = enabled;
        self
    }

    #[must_use]
    pub const fn is_fallback_enabled(&self) -> bool {
        self.fallback_enabled
    }

    /// Remove a channel. Unknown names are ignored.
    pub fn remove_channel(&mut self, name: &str) -> &mut Self {
        if self.channels.remove(name).is_some() {
            debug!(channel = name, "Removed channel");
            if self.default_channel.as_deref() == Some(name) {
                self.default_channel = None;
            }
        }
        self
    }

    /// Remove every channel, factory and the default channel.
    pub fn clear(&mut self) -> &mut Self {
        self.channels.clear();
        self.factories.clear();
        self.default_channel = None;
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Send through the best available channel, preferring `preferred` or
    /// else the default channel.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NoChannelAvailable`] if nothing is ready, or
    /// the channel's own error.
    pub async fn send(
        &self,
        preferred: Option<&str>,
        notification: &Notification,
    ) -> Result<NotificationResponse, ManagerError> {
        let preferred = preferred.or(self.default_channel.as_deref());
        let channel = self
            .get_channel_with_fallback(preferred)
            .ok_or(ManagerError::NoChannelAvailable)?;
        Ok(channel.send(notification).await?)
    }

    /// Send through exactly the named channel, without fallback.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::ChannelNotFound`] or the channel's own error.
    pub async fn send_to(
        &self,
        name: &str,
        notification: &Notification,
    ) -> Result<NotificationResponse, ManagerError> {
        let channel = self.get_channel(name)?;
        Ok(channel.send(notification).await?)
    }

    /// Send the same notification to several channels concurrently.
    ///
    /// Results are returned in the order of `names`.
    pub async fn broadcast(
        &self,
        names: &[&str],
        notification: &Notification,
    ) -> Vec<(String, Result<NotificationResponse, ManagerError>)> {
        let sends = names.iter().map(|&name| async move {
            let result = self.send_to(name, notification).await;
            if let Err(e) = &result {
                warn!(channel = name, error = %e, "Broadcast send failed");
            }
            (name.to_string(), result)
        });
        join_all(sends).await
    }

    /// Entries sorted by (priority desc, registration order asc).
    fn sorted_entries(&self) -> Vec<(&String, &Entry)> {
        let mut entries: Vec<_> = self.channels.iter().collect();
        entries.sort_by_key(|(_, entry)| (Reverse(entry.channel.priority()), entry.seq));
        entries
    }
}
