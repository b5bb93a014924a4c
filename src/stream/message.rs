/// Wire schema for the push source
///
/// Client → source frames are tagged by `type`. Source → client frames are
/// deliberately lenient: every field is optional and the classifier decides
/// what a usable frame is.
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::types::ChannelSet;
use crate::errors::StreamError;

// ============================================================================
// CLIENT MESSAGES (Client → Source)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Replace the server-side subscription with exactly these channels
    Subscribe { channels: Vec<String> },

    /// Ask the source to push fresh state
    Refresh { timestamp: String },
}

impl ClientMessage {
    pub fn subscribe(channels: &ChannelSet) -> Self {
        ClientMessage::Subscribe {
            channels: channels.iter().cloned().collect(),
        }
    }

    pub fn refresh(now: DateTime<Utc>) -> Self {
        ClientMessage::Refresh {
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn to_json(&self) -> Result<String, StreamError> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// INBOUND FRAMES (Source → Client)
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundFrame {
    #[serde(default)]
    pub channel: Option<String>,

    /// Declared message type (`inventory_update`, `alert`, ...)
    #[serde(default, rename = "type")]
    pub declared_type: Option<String>,

    #[serde(default)]
    pub level: Option<String>,

    #[serde(default)]
    pub message: Option<String>,

    /// Kept raw: strings and epoch millis are read, anything else is ignored
    #[serde(default)]
    pub timestamp: Option<serde_json::Value>,

    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_wire_format() {
        let channels: ChannelSet = ["orders", "inventory"].iter().map(|s| s.to_string()).collect();
        let json = ClientMessage::subscribe(&channels).to_json().unwrap();
        assert_eq!(
            json,
            r#"{"type":"subscribe","channels":["inventory","orders"]}"#
        );
    }

    #[test]
    fn test_refresh_wire_format() {
        let now = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let value: serde_json::Value =
            serde_json::from_str(&ClientMessage::refresh(now).to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "refresh");
        assert_eq!(value["timestamp"], "2024-05-01T10:00:00.000Z");
    }

    #[test]
    fn test_inbound_frame_is_lenient() {
        let frame: InboundFrame =
            serde_json::from_str(r#"{"type":"order_update","data":{"pending_orders_count":3}}"#)
                .unwrap();
        assert_eq!(frame.declared_type.as_deref(), Some("order_update"));
        assert!(frame.channel.is_none());
        assert!(frame.message.is_none());
        assert_eq!(frame.data.unwrap()["pending_orders_count"], 3);
    }
}
