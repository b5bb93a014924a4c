use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Well-known channel names
pub mod channels {
    pub const INVENTORY: &str = "inventory";
    pub const ORDERS: &str = "orders";
    pub const DELIVERIES: &str = "deliveries";
    pub const ALERTS: &str = "alerts";
}

/// Desired set of channel names (unique, order irrelevant)
pub type ChannelSet = BTreeSet<String>;

pub fn default_channels() -> ChannelSet {
    [channels::INVENTORY, channels::ORDERS, channels::DELIVERIES]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

/// Connection lifecycle state, exactly one at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    /// Synthetic events are being generated; data is not authoritative
    FallbackActive,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::FallbackActive => "fallback_active",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Whether events currently come from the live source rather than the generator
    pub fn is_authoritative(&self) -> bool {
        !matches!(self, ConnectionState::FallbackActive)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    /// Parse a wire level (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "info" => Some(Severity::Info),
            "success" => Some(Severity::Success),
            "warning" | "warn" => Some(Severity::Warning),
            "error" => Some(Severity::Error),
            _ => None,
        }
    }

    pub fn is_alert(&self) -> bool {
        matches!(self, Severity::Warning | Severity::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classified inbound event, immutable once created
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InboundEvent {
    pub channel: String,
    pub level: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl InboundEvent {
    pub fn new(channel: &str, level: Severity, message: &str) -> Self {
        Self {
            channel: channel.to_string(),
            level,
            message: message.to_string(),
            timestamp: Utc::now(),
            payload: None,
        }
    }

    /// Look up a field inside the structured payload
    pub fn payload_field(&self, key: &str) -> Option<&serde_json::Value> {
        self.payload.as_ref().and_then(|p| p.get(key))
    }
}

/// One slot of the history ring buffer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub event: InboundEvent,
}
