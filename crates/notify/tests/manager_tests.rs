//! Integration tests for the channel registry.

mod common;

use common::{as_dyn, Outcome, ScriptedChannel};
use notify_dispatch::{
    ChannelConfig, GroupError, ManagerConfig, ManagerError, Notification, NotificationChannel,
    NotificationManager, Strategy,
};
use std::sync::Arc;

fn scripted(name: &str, priority: i32) -> Arc<ScriptedChannel> {
    ScriptedChannel::new(name, Outcome::Succeed)
        .with_priority(priority)
        .build()
}

fn scripted_factory(config: ChannelConfig) -> Arc<dyn NotificationChannel> {
    let mut channel = ScriptedChannel::new(&config.name, Outcome::Succeed).with_priority(config.priority);
    if let Some(weight) = config.weight {
        channel = channel.with_weight(weight);
    }
    if config.setting_str("api_key").is_none() {
        channel = channel.not_ready();
    }
    channel.build()
}

// =============================================================================
// Registration and lookup
// =============================================================================

#[test]
fn test_get_channel_returns_registered_instance() {
    let email = scripted("email", 0);
    let mut manager = NotificationManager::new();
    manager.register_channel("email", as_dyn(&email));

    let found = manager.get_channel("email").unwrap();
    assert!(Arc::ptr_eq(&found, &as_dyn(&email)));
}

#[test]
fn test_reregistration_overwrites() {
    let a = scripted("a", 0);
    let b = scripted("b", 0);
    let mut manager = NotificationManager::new();
    manager
        .register_channel("x", as_dyn(&a))
        .register_channel("x", as_dyn(&b));

    let found = manager.get_channel("x").unwrap();
    assert!(Arc::ptr_eq(&found, &as_dyn(&b)));
    assert_eq!(manager.available_channels(), vec!["x"]);
}

#[test]
fn test_get_unknown_channel_fails() {
    let manager = NotificationManager::new();
    assert!(matches!(
        manager.get_channel("fax"),
        Err(ManagerError::ChannelNotFound(name)) if name == "fax"
    ));
}

#[test]
fn test_get_channel_ignores_readiness() {
    let mut manager = NotificationManager::new();
    manager.register_channel(
        "push",
        ScriptedChannel::new("push", Outcome::Succeed).not_ready().build(),
    );

    assert!(manager.get_channel("push").is_ok());
    assert!(manager.has_channel("push"));
    assert!(!manager.is_channel_ready("push"));
    assert!(!manager.is_channel_ready("missing"));
}

#[test]
fn test_default_channel() {
    let mut manager = NotificationManager::new();
    assert!(matches!(
        manager.get_default_channel(),
        Err(ManagerError::NoDefaultChannelConfigured)
    ));

    assert!(matches!(
        manager.set_default_channel("email"),
        Err(ManagerError::ChannelNotFound(_))
    ));

    let email = scripted("email", 0);
    manager.register_channel("email", as_dyn(&email));
    manager.set_default_channel("email").unwrap();

    let found = manager.get_default_channel().unwrap();
    assert!(Arc::ptr_eq(&found, &as_dyn(&email)));
}

#[test]
fn test_ready_channels_is_ordered_subset() {
    let mut manager = NotificationManager::new();
    manager
        .register_channel("sms", as_dyn(&scripted("sms", 1)))
        .register_channel(
            "push",
            ScriptedChannel::new("push", Outcome::Succeed)
                .with_priority(8)
                .not_ready()
                .build(),
        )
        .register_channel("email", as_dyn(&scripted("email", 3)))
        .register_channel("chat", as_dyn(&scripted("chat", 1)));

    let available = manager.available_channels();
    let ready = manager.ready_channels();

    assert_eq!(available, vec!["push", "email", "sms", "chat"]);
    assert_eq!(ready, vec!["email", "sms", "chat"]);

    let mut positions = ready
        .iter()
        .map(|name| available.iter().position(|a| a == name).unwrap());
    let mut previous = positions.next().unwrap();
    for position in positions {
        assert!(position > previous);
        previous = position;
    }
}

#[test]
fn test_remove_unknown_channel_is_noop() {
    let mut manager = NotificationManager::new();
    manager.register_channel("email", as_dyn(&scripted("email", 0)));

    manager.remove_channel("missing");

    assert_eq!(manager.available_channels(), vec!["email"]);
    assert!(manager.has_channel("email"));
}

#[test]
fn test_remove_and_clear() {
    let mut manager = NotificationManager::new();
    manager
        .register_channel("email", as_dyn(&scripted("email", 0)))
        .register_channel("sms", as_dyn(&scripted("sms", 0)));

    manager.remove_channel("email");
    assert!(!manager.has_channel("email"));
    assert_eq!(manager.len(), 1);

    manager.clear();
    assert!(manager.is_empty());
}

// =============================================================================
// Fallback resolution
// =============================================================================

#[test]
fn test_preferred_ready_channel_wins() {
    let low = scripted("low", 0);
    let high = scripted("high", 9);
    let mut manager = NotificationManager::new();
    manager
        .register_channel("low", as_dyn(&low))
        .register_channel("high", as_dyn(&high));

    let found = manager.get_channel_with_fallback(Some("low")).unwrap();
    assert!(Arc::ptr_eq(&found, &as_dyn(&low)));
}

#[test]
fn test_missing_preferred_falls_back_to_ready_channel() {
    let sms = scripted("sms", 0);
    let mut manager = NotificationManager::new();
    manager.register_channel("sms", as_dyn(&sms));

    let found = manager.get_channel_with_fallback(Some("missing")).unwrap();
    assert!(Arc::ptr_eq(&found, &as_dyn(&sms)));
}

#[test]
fn test_unready_preferred_falls_back_by_priority() {
    let mut manager = NotificationManager::new();
    manager
        .register_channel(
            "email",
            ScriptedChannel::new("email", Outcome::Succeed)
                .with_priority(10)
                .not_ready()
                .build(),
        )
        .register_channel("sms", as_dyn(&scripted("sms", 1)))
        .register_channel("push", as_dyn(&scripted("push", 5)))
        .register_channel("chat", as_dyn(&scripted("chat", 5)));

    let found = manager.get_channel_with_fallback(Some("email")).unwrap();
    assert_eq!(found.name(), "push");
}

#[test]
fn test_fallback_disabled_without_preference_returns_none() {
    let mut manager = NotificationManager::new();
    manager
        .register_channel("sms", as_dyn(&scripted("sms", 0)))
        .set_fallback_enabled(false);

    assert!(manager.get_channel_with_fallback(None).is_none());
    assert!(manager.get_channel_with_fallback(Some("missing")).is_none());
    assert!(manager.get_channel_with_fallback(Some("sms")).is_some());
}

#[test]
fn test_no_ready_channel_returns_none() {
    let mut manager = NotificationManager::new();
    manager.register_channel(
        "sms",
        ScriptedChannel::new("sms", Outcome::Succeed).not_ready().build(),
    );

    assert!(manager.get_channel_with_fallback(None).is_none());
    assert!(NotificationManager::new()
        .get_channel_with_fallback(Some("sms"))
        .is_none());
}

// =============================================================================
// Factories and configuration
// =============================================================================

#[test]
fn test_create_channel_with_factory() {
    let mut manager = NotificationManager::new();
    manager.register_factory("scripted", scripted_factory);

    manager
        .create_channel(
            ChannelConfig::new("email")
                .with_driver("scripted")
                .with_priority(4)
                .with_setting("api_key", "k"),
        )
        .unwrap();

    let email = manager.get_channel("email").unwrap();
    assert_eq!(email.name(), "email");
    assert_eq!(email.priority(), 4);
    assert!(email.is_ready());
}

#[test]
fn test_create_channel_with_unknown_factory() {
    let mut manager = NotificationManager::new();
    let err = manager
        .create_channel(ChannelConfig::new("email").with_driver("smtp"))
        .unwrap_err();

    assert!(matches!(err, ManagerError::UnknownFactory(name) if name == "smtp"));
}

#[test]
fn test_load_config_builds_channels_and_groups() {
    let config = ManagerConfig::from_toml_str(
        r#"
default_channel = "alerts"

[[channels]]
name = "primary"
driver = "scripted"
priority = 1
settings = { api_key = "k1" }

[[channels]]
name = "backup"
driver = "scripted"
settings = { api_key = "k2" }

[[channels]]
name = "unconfigured"
driver = "scripted"

[[groups]]
name = "alerts"
strategy = "priority_fallback"
priority = 20
members = ["backup", "primary"]
"#,
    )
    .unwrap();

    let mut manager = NotificationManager::from_config(&config);
    manager.register_factory("scripted", scripted_factory);
    manager.load_config(&config).unwrap();

    assert_eq!(
        manager.available_channels(),
        vec!["alerts", "primary", "backup", "unconfigured"]
    );
    assert_eq!(manager.ready_channels(), vec!["alerts", "primary", "backup"]);

    let default = manager.get_default_channel().unwrap();
    assert_eq!(default.name(), "alerts");
    assert_eq!(default.channel_type().as_str(), "email");
}

#[test]
fn test_group_with_unknown_member_fails() {
    let config = ManagerConfig::from_json(serde_json::json!({
        "groups": [{"name": "alerts", "strategy": "random", "members": ["ghost"]}]
    }))
    .unwrap();

    let mut manager = NotificationManager::new();
    let err = manager.load_config(&config).unwrap_err();

    assert!(matches!(
        err,
        ManagerError::Group(GroupError::UnknownMember { member, .. }) if member == "ghost"
    ));
}

#[test]
fn test_empty_group_config_fails() {
    let config = ManagerConfig::from_json(serde_json::json!({
        "groups": [{"name": "alerts", "members": []}]
    }))
    .unwrap();
    assert_eq!(config.groups[0].strategy, Strategy::PriorityFallback);

    let mut manager = NotificationManager::new();
    let err = manager.load_config(&config).unwrap_err();
    assert!(matches!(err, ManagerError::Group(GroupError::Empty(_))));
}

/// A group error after valid channels leaves the registry untouched.
#[test]
fn test_failed_load_registers_nothing() {
    let config = ManagerConfig::from_json(serde_json::json!({
        "channels": [{"name": "primary", "driver": "scripted", "settings": {"api_key": "k1"}}],
        "groups": [{"name": "alerts", "members": ["primary", "ghost"]}]
    }))
    .unwrap();

    let mut manager = NotificationManager::new();
    manager.register_factory("scripted", scripted_factory);
    manager.register_channel("keep", as_dyn(&scripted("keep", 0)));
    manager.set_default_channel("keep").unwrap();

    let err = manager.load_config(&config).unwrap_err();

    assert!(matches!(
        err,
        ManagerError::Group(GroupError::UnknownMember { member, .. }) if member == "ghost"
    ));
    assert_eq!(manager.available_channels(), vec!["keep"]);
    assert_eq!(manager.default_channel_name(), Some("keep"));
}

/// An unknown default is caught before any channel is registered.
#[test]
fn test_load_with_unknown_default_registers_nothing() {
    let config = ManagerConfig::from_json(serde_json::json!({
        "default_channel": "missing",
        "channels": [{"name": "primary", "driver": "scripted", "settings": {"api_key": "k1"}}]
    }))
    .unwrap();

    let mut manager = NotificationManager::new();
    manager.register_factory("scripted", scripted_factory);

    let err = manager.load_config(&config).unwrap_err();

    assert!(matches!(err, ManagerError::ChannelNotFound(name) if name == "missing"));
    assert!(manager.available_channels().is_empty());
    assert_eq!(manager.default_channel_name(), None);
}

/// A loaded group may name a channel registered before the load.
#[test]
fn test_load_group_uses_registered_members() {
    let config = ManagerConfig::from_json(serde_json::json!({
        "channels": [{"name": "primary", "driver": "scripted", "settings": {"api_key": "k1"}}],
        "groups": [{"name": "alerts", "members": ["primary", "keep"]}],
        "default_channel": "keep"
    }))
    .unwrap();

    let mut manager = NotificationManager::new();
    manager.register_factory("scripted", scripted_factory);
    manager.register_channel("keep", as_dyn(&scripted("keep", 0)));

    manager.load_config(&config).unwrap();

    assert!(manager.has_channel("alerts"));
    assert_eq!(manager.default_channel_name(), Some("keep"));
}

// =============================================================================
// Sending
// =============================================================================

#[tokio::test]
async fn test_send_uses_default_then_fallback() {
    let email = ScriptedChannel::new("email", Outcome::Succeed).not_ready().build();
    let sms = scripted("sms", 0);

    let mut manager = NotificationManager::new();
    manager
        .register_channel("email", as_dyn(&email))
        .register_channel("sms", as_dyn(&sms));
    manager.set_default_channel("email").unwrap();

    let response = manager.send(None, &Notification::text("hi")).await.unwrap();

    assert!(response.success);
    assert_eq!(email.calls(), 0);
    assert_eq!(sms.calls(), 1);
}

#[tokio::test]
async fn test_send_without_ready_channel_fails() {
    let manager = NotificationManager::new();
    let err = manager
        .send(Some("email"), &Notification::text("hi"))
        .await
        .unwrap_err();

    assert!(matches!(err, ManagerError::NoChannelAvailable));
}

#[tokio::test]
async fn test_send_to_surfaces_channel_errors() {
    let mut manager = NotificationManager::new();
    manager.register_channel(
        "sms",
        ScriptedChannel::new("sms", Outcome::Reject).build(),
    );

    let err = manager
        .send_to("sms", &Notification::text("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::Channel(e) if e.is_validation()));

    let err = manager
        .send_to("fax", &Notification::text("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::ChannelNotFound(_)));
}

#[tokio::test]
async fn test_broadcast_reports_each_channel_in_order() {
    let email = scripted("email", 0);
    let sms = ScriptedChannel::new("sms", Outcome::Fail).build();

    let mut manager = NotificationManager::new();
    manager
        .register_channel("email", as_dyn(&email))
        .register_channel("sms", as_dyn(&sms));

    let results = manager
        .broadcast(&["sms", "missing", "email"], &Notification::text("hi"))
        .await;

    let names: Vec<_> = results.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["sms", "missing", "email"]);

    assert!(!results[0].1.as_ref().unwrap().success);
    assert!(matches!(results[1].1, Err(ManagerError::ChannelNotFound(_))));
    assert!(results[2].1.as_ref().unwrap().success);
}

#[tokio::test]
async fn test_registered_group_dispatches() {
    let a = ScriptedChannel::new("a", Outcome::Succeed).build();
    let b = ScriptedChannel::new("b", Outcome::Succeed).build();

    let mut manager = NotificationManager::new();
    manager
        .register_channel("a", as_dyn(&a))
        .register_channel("b", as_dyn(&b));
    manager
        .create_group(&notify_dispatch::GroupConfig {
            name: "push".into(),
            channel_type: Some("push".into()),
            strategy: Strategy::RoundRobin,
            priority: 0,
            members: vec!["a".into(), "b".into()],
        })
        .unwrap();

    for _ in 0..4 {
        manager.send_to("push", &Notification::text("hi")).await.unwrap();
    }

    assert_eq!(a.calls(), 2);
    assert_eq!(b.calls(), 2);
    assert_eq!(
        manager.get_channel("push").unwrap().channel_type().as_str(),
        "push"
    );
}
