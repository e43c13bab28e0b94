//! Fallback groups: one logical channel backed by several drivers.
//!
//! A [`FallbackGroup`] picks the driver for each send according to its
//! [`Strategy`]:
//!
//! - [`Strategy::PriorityFallback`] tries ready drivers from highest to lowest
//!   priority until one succeeds, and returns the last failure if none do.
//! - [`Strategy::RoundRobin`] cycles through drivers in registration order and
//!   makes exactly one attempt per send.
//! - [`Strategy::Random`] picks one driver with probability proportional to
//!   its weight and makes exactly one attempt per send.
//!
//! Round robin and random never retry; callers that want both distribution
//! and reliability wrap them in their own retry loop.

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::channels::NotificationChannel;
use crate::error::{ChannelError, GroupError};
use crate::notification::{ChannelType, Notification, NotificationResponse};

/// Driver selection policy for a [`FallbackGroup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Highest priority ready driver first, falling through on failure
    #[default]
    PriorityFallback,
    /// One driver per send, cycling in registration order
    RoundRobin,
    /// One driver per send, chosen by weight
    Random,
}

impl Strategy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PriorityFallback => "priority_fallback",
            Self::RoundRobin => "round_robin",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Member {
    channel: Arc<dyn NotificationChannel>,
    priority: i32,
    weight: f64,
}

/// A logical channel backed by an ordered or weighted set of drivers.
pub struct FallbackGroup {
    name: String,
    channel_type: ChannelType,
    strategy: Strategy,
    priority: i32,
    /// Members in registration order.
    members: Vec<Member>,
    /// Member indices sorted by (priority desc, registration asc).
    priority_order: Vec<usize>,
    total_weight: f64,
    /// Next round robin slot.
    cursor: AtomicUsize,
}

impl fmt::Debug for FallbackGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackGroup")
            .field("name", &self.name)
            .field("channel_type", &self.channel_type)
            .field("strategy", &self.strategy)
            .field("members", &self.member_names())
            .finish_non_exhaustive()
    }
}

impl FallbackGroup {
    /// Start building a group.
    pub fn builder(name: impl Into<String>, strategy: Strategy) -> FallbackGroupBuilder {
        FallbackGroupBuilder {
            name: name.into(),
            channel_type: None,
            strategy,
            priority: 0,
            members: Vec::new(),
        }
    }

    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; empty groups cannot be built.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member driver names in registration order.
    #[must_use]
    pub fn member_names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.channel.name()).collect()
    }

    /// Member driver names in priority fallback order.
    #[must_use]
    pub fn priority_order(&self) -> Vec<&str> {
        self.priority_order
            .iter()
            .map(|&i| self.members[i].channel.name())
            .collect()
    }

    async fn send_priority_fallback(
        &self,
        notification: &Notification,
    ) -> Result<NotificationResponse, ChannelError> {
        let mut last_failure = None;

        for &index in &self.priority_order {
            let channel = &self.members[index].channel;
            if !channel.is_ready() {
                debug!(group = %self.name, channel = channel.name(), "Driver not ready, skipping");
                continue;
            }

            debug!(group = %self.name, channel = channel.name(), "Attempting driver");
            match channel.send(notification).await {
                Ok(response) if response.success => return Ok(response),
                Ok(response) => {
                    warn!(
                        group = %self.name,
                        channel = channel.name(),
                        error = response.error.as_deref().unwrap_or("unknown"),
                        "Driver failed, falling back"
                    );
                    last_failure = Some(response);
                }
                Err(e) if e.is_provider() => {
                    warn!(
                        group = %self.name,
                        channel = channel.name(),
                        error = %e,
                        "Driver raised, falling back"
                    );
                    last_failure = Some(e.to_failure_response());
                }
                Err(e) => return Err(e),
            }
        }

        last_failure.ok_or_else(|| {
            warn!(group = %self.name, "No ready driver in group");
            ChannelError::AllDriversUnavailable {
                group: self.name.clone(),
            }
        })
    }

    /// Advance the cursor and return the member it pointed at.
    fn next_round_robin(&self) -> &Member {
        let slot = self.cursor.fetch_add(1, Ordering::Relaxed);
        &self.members[slot % self.members.len()]
    }

    fn pick_weighted(&self) -> &Member {
        let draw = rand::rng().random_range(0.0..self.total_weight);
        let weights: Vec<f64> = self.members.iter().map(|m| m.weight).collect();
        &self.members[weighted_index(&weights, draw)]
    }

    async fn send_single(
        &self,
        member: &Member,
        notification: &Notification,
    ) -> Result<NotificationResponse, ChannelError> {
        let channel = &member.channel;
        debug!(
            group = %self.name,
            strategy = %self.strategy,
            channel = channel.name(),
            "Selected driver"
        );

        let result = channel.send(notification).await;
        match &result {
            Ok(response) if !response.success => warn!(
                group = %self.name,
                channel = channel.name(),
                error = response.error.as_deref().unwrap_or("unknown"),
                "Driver failed"
            ),
            Err(e) => warn!(group = %self.name, channel = channel.name(), error = %e, "Driver raised"),
            Ok(_) => {}
        }
        result
    }
}

#[async_trait]
impl NotificationChannel for FallbackGroup {
    fn name(&self) -> &str {
        &self.name
    }

    fn channel_type(&self) -> ChannelType {
        self.channel_type.clone()
    }

    fn is_ready(&self) -> bool {
        self.members.iter().any(|m| m.channel.is_ready())
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn validate(&self, notification: &Notification) -> Result<(), ChannelError> {
        // Members validate their own requests when selected.
        crate::validation::require_content(&self.name, notification)
    }

    async fn send(
        &self,
        notification: &Notification,
    ) -> Result<NotificationResponse, ChannelError> {
        match self.strategy {
            Strategy::PriorityFallback => self.send_priority_fallback(notification).await,
            Strategy::RoundRobin => {
                let member = self.next_round_robin();
                self.send_single(member, notification).await
            }
            Strategy::Random => {
                let member = self.pick_weighted();
                self.send_single(member, notification).await
            }
        }
    }
}

/// Builder for [`FallbackGroup`].
pub struct FallbackGroupBuilder {
    name: String,
    channel_type: Option<ChannelType>,
    strategy: Strategy,
    priority: i32,
    members: Vec<Arc<dyn NotificationChannel>>,
}

impl FallbackGroupBuilder {
    /// Channel family reported by the group; defaults to the first member's.
    #[must_use]
    pub fn channel_type(mut self, channel_type: ChannelType) -> Self {
        self.channel_type = Some(channel_type);
        self
    }

    /// Priority of the group itself when registered in a manager.
    #[must_use]
    pub const fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Append a member. Its priority and weight come from the driver.
    #[must_use]
    pub fn member(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.members.push(channel);
        self
    }

    /// Append several members in order.
    #[must_use]
    pub fn members(mut self, channels: impl IntoIterator<Item = Arc<dyn NotificationChannel>>) -> Self {
        self.members.extend(channels);
        self
    }

    /// Build the group.
    ///
    /// # Errors
    ///
    /// Returns [`GroupError::Empty`] without members, [`GroupError::InvalidWeight`]
    /// for negative or non-finite weights, [`GroupError::NonFiniteTotalWeight`]
    /// when the weights overflow, and [`GroupError::ZeroTotalWeight`] for a
    /// random group whose weights sum to zero.
    pub fn build(self) -> Result<FallbackGroup, GroupError> {
        let Some(first) = self.members.first() else {
            return Err(GroupError::Empty(self.name));
        };
        let channel_type = self.channel_type.unwrap_or_else(|| first.channel_type());

        let mut members = Vec::with_capacity(self.members.len());
        for channel in self.members {
            let weight = channel.weight().unwrap_or(1.0);
            if !weight.is_finite() || weight < 0.0 {
                return Err(GroupError::InvalidWeight {
                    group: self.name,
                    member: channel.name().to_string(),
                    weight,
                });
            }
            members.push(Member {
                priority: channel.priority(),
                weight,
                channel,
            });
        }

        let total_weight: f64 = members.iter().map(|m| m.weight).sum();
        if !total_weight.is_finite() {
            return Err(GroupError::NonFiniteTotalWeight(self.name));
        }
        if self.strategy == Strategy::Random && total_weight <= 0.0 {
            return Err(GroupError::ZeroTotalWeight(self.name));
        }

        // Stable sort keeps registration order among equal priorities.
        let mut priority_order: Vec<usize> = (0..members.len()).collect();
        priority_order.sort_by_key(|&i| std::cmp::Reverse(members[i].priority));

        Ok(FallbackGroup {
            name: self.name,
            channel_type,
            strategy: self.strategy,
            priority: self.priority,
            members,
            priority_order,
            total_weight,
            cursor: AtomicUsize::new(0),
        })
    }
}

/// Index of the member whose cumulative weight interval contains `draw`.
///
/// `draw` is expected in `[0, sum(weights))`. Zero-weight members own an
/// empty interval and are never chosen; draws at or past the total fall on
/// the last member with positive weight.
#[must_use]
pub fn weighted_index(weights: &[f64], draw: f64) -> usize {
    let mut cumulative = 0.0;
    let mut last_positive = 0;
    for (index, &weight) in weights.iter().enumerate() {
        if weight <= 0.0 {
            continue;
        }
        cumulative += weight;
        last_positive = index;
        if draw < cumulative {
            return index;
        }
    }
    last_positive
}
