//! Best-effort notification delivery.
//!
//! # Responsibility
//! - Define the notification payload and the sink contract.
//! - Provide the bounded fan-out pool and bundled sinks.
//!
//! # Invariants
//! - Delivery is at-most-once; failures are logged and counted, never
//!   surfaced to the request that produced the notification.
//! - Sinks must be callable from any worker thread.

use crate::model::directory::Account;
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod fanout;
pub mod outbox;

pub use fanout::{FanoutSettings, FanoutStats, NotificationFanout};
pub use outbox::{OutboxEntry, SqliteOutboxSink};

/// Optional call-to-action attached to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationLink {
    pub label: String,
    pub url: String,
}

/// One message addressed to one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: Account,
    pub title: String,
    pub body: String,
    pub link: Option<NotificationLink>,
}

/// Sink delivery failure.
#[derive(Debug)]
pub enum DeliveryError {
    /// Sink refused this message.
    Rejected(String),
    /// Sink backend is not reachable or not usable.
    Unavailable(String),
}

impl Display for DeliveryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(message) => write!(f, "notification rejected: {message}"),
            Self::Unavailable(message) => write!(f, "notification sink unavailable: {message}"),
        }
    }
}

impl Error for DeliveryError {}

/// Destination for notifications produced by content creation.
pub trait NotificationSink: Send + Sync {
    fn send(&self, notification: &Notification) -> Result<(), DeliveryError>;
}

/// Sink that only writes a metadata log line per notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn send(&self, notification: &Notification) -> Result<(), DeliveryError> {
        info!(
            "event=notification_send module=notify status=ok sink=log recipient_id={} title_chars={} has_link={}",
            notification.recipient.id,
            notification.title.chars().count(),
            notification.link.is_some()
        );
        Ok(())
    }
}
