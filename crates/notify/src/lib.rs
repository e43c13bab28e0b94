//! Multi-channel notification dispatch.
//!
//! Callers submit a logical notification once and this crate routes it to a
//! concrete delivery driver (email, SMS, push, chat, ...).
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use notify_dispatch::{
//!     FallbackGroup, Notification, NotificationManager, SlackChannel, Strategy,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let group = FallbackGroup::builder("alerts", Strategy::PriorityFallback)
//!     .member(Arc::new(SlackChannel::new("https://hooks.slack.com/services/T/B/1")))
//!     .member(Arc::new(SlackChannel::from_env()))
//!     .build()?;
//!
//! let mut manager = NotificationManager::new();
//! manager.register_channel("alerts", Arc::new(group));
//! manager.set_default_channel("alerts")?;
//!
//! let response = manager
//!     .send(None, &Notification::text("Deploy finished").with_title("Deploy"))
//!     .await?;
//! assert!(response.success);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`NotificationChannel`] trait defines the interface every driver implements
//! - [`FallbackGroup`] backs one logical channel with several drivers and a
//!   selection [`Strategy`]
//! - [`NotificationManager`] maps names to channels and factories and resolves
//!   which channel handles a send
//!
//! # Configuration
//!
//! See [`ManagerConfig`] for the TOML layout and environment variables.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod config;
pub mod error;
pub mod group;
pub mod manager;
pub mod notification;
pub mod validation;

pub use channels::slack::SlackChannel;
pub use channels::NotificationChannel;
pub use config::{ChannelConfig, GroupConfig, ManagerConfig};
pub use error::{ChannelError, GroupError, ManagerError};
pub use group::{weighted_index, FallbackGroup, FallbackGroupBuilder, Strategy};
pub use manager::{ChannelFactory, NotificationManager};
pub use notification::{ChannelType, DeliveryStatus, Notification, NotificationResponse};
