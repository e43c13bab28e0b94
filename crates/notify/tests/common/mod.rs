//! Scripted channels for dispatch tests.

#![allow(dead_code)]

use async_trait::async_trait;
use notify_dispatch::{
    ChannelError, ChannelType, Notification, NotificationChannel, NotificationResponse,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// What a scripted channel does when asked to send.
#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Succeed,
    /// Return `success: false`
    Fail,
    /// Raise a provider error
    Raise,
    /// Raise a provider error wrapping an I/O error
    RaiseWithSource,
    /// Raise a validation error
    Reject,
    /// Never complete
    Hang,
}

/// Shared record of which channels were asked to send, in order.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub struct ScriptedChannel {
    name: String,
    priority: i32,
    weight: Option<f64>,
    ready: bool,
    outcome: Outcome,
    calls: AtomicUsize,
    log: CallLog,
    last_notification: Mutex<Option<Notification>>,
}

impl ScriptedChannel {
    pub fn new(name: &str, outcome: Outcome) -> Self {
        Self {
            name: name.to_string(),
            priority: 0,
            weight: None,
            ready: true,
            outcome,
            calls: AtomicUsize::new(0),
            log: CallLog::default(),
            last_notification: Mutex::new(None),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn not_ready(mut self) -> Self {
        self.ready = false;
        self
    }

    pub fn with_log(mut self, log: &CallLog) -> Self {
        self.log = Arc::clone(log);
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_notification(&self) -> Option<Notification> {
        self.last_notification.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationChannel for ScriptedChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn channel_type(&self) -> ChannelType {
        ChannelType::email()
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn weight(&self) -> Option<f64> {
        self.weight
    }

    async fn send(
        &self,
        notification: &Notification,
    ) -> Result<NotificationResponse, ChannelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(self.name.clone());
        *self.last_notification.lock().unwrap() = Some(notification.clone());

        match self.outcome {
            Outcome::Succeed => Ok(NotificationResponse::sent(Some(format!("{}-id", self.name)))),
            Outcome::Fail => Ok(NotificationResponse::failure(format!("{} failed", self.name))),
            Outcome::Raise => Err(ChannelError::provider(&self.name, "connection refused")),
            Outcome::RaiseWithSource => Err(ChannelError::provider_with_source(
                &self.name,
                std::io::Error::other("connection reset"),
            )),
            Outcome::Reject => Err(ChannelError::validation(&self.name, "bad request")),
            Outcome::Hang => std::future::pending().await,
        }
    }
}

pub fn as_dyn(channel: &Arc<ScriptedChannel>) -> Arc<dyn NotificationChannel> {
    Arc::clone(channel) as Arc<dyn NotificationChannel>
}
