//! Request-shape checks shared by drivers.
//!
//! Drivers call these from their `validate` implementation; each failure is a
//! [`ChannelError::Validation`] naming the driver.

use crate::error::ChannelError;
use crate::notification::Notification;

/// Require at least one of `message`, `text` or `body` to be non-blank.
///
/// # Errors
///
/// Returns a validation error if no content is present.
pub fn require_content(channel: &str, notification: &Notification) -> Result<(), ChannelError> {
    if notification.content().is_some() {
        Ok(())
    } else {
        Err(ChannelError::validation(
            channel,
            "notification needs one of message, text or body",
        ))
    }
}

/// Require the content to be at most `max_chars` characters.
///
/// # Errors
///
/// Returns a validation error if content is missing or too long.
pub fn require_max_length(
    channel: &str,
    notification: &Notification,
    max_chars: usize,
) -> Result<(), ChannelError> {
    require_content(channel, notification)?;
    let len = notification.content().map_or(0, |c| c.chars().count());
    if len > max_chars {
        return Err(ChannelError::validation(
            channel,
            format!("content is {len} characters, limit is {max_chars}"),
        ));
    }
    Ok(())
}
