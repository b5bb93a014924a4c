/// Notification lifecycle: short-lived, view-facing summaries of events
///
/// A bounded list (newest first) where every entry also expires once
/// `now >= created_at + ttl`, whatever the buffer pressure. Expiry is applied
/// lazily on every push and every read.
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;

use super::types::{channels, InboundEvent, Severity};

pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 10;
pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub channel: String,
    pub title: String,
    pub message: String,
    pub level: Severity,
    pub created_at: DateTime<Utc>,
    #[serde(with = "ttl_millis")]
    pub ttl: Duration,
}

impl Notification {
    pub fn expires_at(&self) -> DateTime<Utc> {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        self.created_at
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

mod ttl_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(ttl: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(ttl.as_millis() as u64)
    }
}

#[derive(Debug, Clone)]
pub struct NotificationCenter {
    entries: VecDeque<Notification>,
    capacity: usize,
    ttl: Duration,
    next_id: u64,
}

impl NotificationCenter {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
            ttl,
            next_id: 1,
        }
    }

    /// Whether events on this channel produce notifications
    pub fn is_notifiable(channel: &str) -> bool {
        matches!(
            channel,
            channels::INVENTORY | channels::ORDERS | channels::DELIVERIES | channels::ALERTS
        )
    }

    /// Create a notification for `event`, or `None` for channels that do not notify
    pub fn push(&mut self, event: &InboundEvent, now: DateTime<Utc>) -> Option<Notification> {
        if !Self::is_notifiable(&event.channel) {
            return None;
        }

        self.prune(now);

        let notification = Notification {
            id: self.next_id,
            channel: event.channel.clone(),
            title: title_for(event),
            message: message_for(event),
            level: event.level,
            created_at: now,
            ttl: self.ttl,
        };
        self.next_id += 1;

        self.entries.push_front(notification.clone());
        self.entries.truncate(self.capacity);

        Some(notification)
    }

    /// Unexpired notifications, newest first
    pub fn active(&self, now: DateTime<Utc>) -> Vec<Notification> {
        self.entries
            .iter()
            .filter(|n| !n.is_expired(now))
            .cloned()
            .collect()
    }

    /// Drop expired entries; returns how many were removed
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|n| !n.is_expired(now));
        before - self.entries.len()
    }

    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|n| n.id != id);
        before != self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_CAPACITY, DEFAULT_NOTIFICATION_TTL)
    }
}

fn title_for(event: &InboundEvent) -> String {
    match event.channel.as_str() {
        channels::INVENTORY => "Inventory Update".to_string(),
        channels::ORDERS => "Order Update".to_string(),
        channels::DELIVERIES => "Delivery Update".to_string(),
        channels::ALERTS => event
            .payload_field("alert_type")
            .and_then(Value::as_str)
            .unwrap_or("Alert")
            .to_string(),
        other => other.to_string(),
    }
}

fn message_for(event: &InboundEvent) -> String {
    if !event.message.trim().is_empty() {
        return event.message.clone();
    }

    let array_len = |key: &str| {
        event
            .payload_field(key)
            .and_then(Value::as_array)
            .map(|items| items.len())
            .unwrap_or(0)
    };

    match event.channel.as_str() {
        channels::INVENTORY => format!("{} items need attention", array_len("low_stock_items")),
        channels::DELIVERIES => format!("{} active deliveries", array_len("active_deliveries")),
        channels::ORDERS => format!(
            "{} pending orders",
            event
                .payload_field("pending_orders_count")
                .and_then(Value::as_u64)
                .unwrap_or(0)
        ),
        channels::ALERTS => "System alert".to_string(),
        _ => String::new(),
    }
}
