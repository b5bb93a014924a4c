/// Message classifier: raw frame text -> `InboundEvent`
///
/// Classification is pure and bounded: no I/O, no shared state. A frame that
/// cannot be classified yields a `ClassificationError`; the caller logs and
/// drops it without touching the connection.
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use super::message::InboundFrame;
use super::types::{channels, InboundEvent, Severity};
use crate::errors::ClassificationError;

/// Map a declared message type to the channel it belongs to
///
/// Unknown types are their own channel.
pub fn normalize_channel(declared_type: &str) -> &str {
    match declared_type {
        "inventory_update" => channels::INVENTORY,
        "order_update" => channels::ORDERS,
        "delivery_update" | "delivery_notification" => channels::DELIVERIES,
        "alert" => channels::ALERTS,
        other => other,
    }
}

/// Classify one raw frame received at `received_at`
pub fn classify(
    raw: &str,
    received_at: DateTime<Utc>,
) -> Result<InboundEvent, ClassificationError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| ClassificationError::InvalidJson(e.to_string()))?;

    if !value.is_object() {
        return Err(ClassificationError::NotAnObject);
    }

    let frame: InboundFrame = serde_json::from_value(value)
        .map_err(|e| ClassificationError::InvalidField(e.to_string()))?;

    let declared_type = non_empty(frame.declared_type.as_deref());
    let channel = match non_empty(frame.channel.as_deref()) {
        Some(channel) => channel.to_string(),
        None => declared_type
            .map(normalize_channel)
            .ok_or(ClassificationError::MissingChannel)?
            .to_string(),
    };

    let is_alert = channel == channels::ALERTS;
    let data = frame.data;

    let level = match non_empty(frame.level.as_deref()) {
        Some(level) => Severity::from_str(level)
            .ok_or_else(|| ClassificationError::UnknownLevel(level.to_string()))?,
        None if is_alert => data
            .as_ref()
            .and_then(|d| d.get("severity"))
            .and_then(Value::as_str)
            .and_then(alert_severity)
            .unwrap_or(Severity::Info),
        None => Severity::Info,
    };

    let message = match frame.message {
        Some(message) => message,
        None if is_alert => data
            .as_ref()
            .and_then(|d| d.get("message"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        None => String::new(),
    };

    let timestamp = frame
        .timestamp
        .as_ref()
        .and_then(frame_timestamp)
        .unwrap_or(received_at);

    Ok(InboundEvent {
        channel,
        level,
        message,
        timestamp,
        payload: data,
    })
}

/// Map an alert's `severity` (low/medium/high) onto the event levels
pub fn alert_severity(severity: &str) -> Option<Severity> {
    match severity.trim().to_lowercase().as_str() {
        "low" => Some(Severity::Info),
        "medium" => Some(Severity::Warning),
        "high" | "critical" => Some(Severity::Error),
        other => Severity::from_str(other),
    }
}

/// RFC 3339, or a naive ISO-8601 datetime interpreted as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Resolve a frame's `timestamp` value; integers are epoch milliseconds
fn frame_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(raw) => parse_timestamp(raw),
        Value::Number(number) => number
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn received() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_classifies_full_frame() {
        let raw = r#"{
            "channel": "inventory",
            "level": "warning",
            "message": "low stock",
            "timestamp": "2024-06-01T11:59:00Z",
            "data": {"sku": "A-1"}
        }"#;
        let event = classify(raw, received()).unwrap();

        assert_eq!(event.channel, "inventory");
        assert_eq!(event.level, Severity::Warning);
        assert_eq!(event.message, "low stock");
        assert_eq!(event.timestamp, Utc.with_ymd_and_hms(2024, 6, 1, 11, 59, 0).unwrap());
        assert_eq!(event.payload_field("sku").unwrap(), "A-1");
    }

    #[test]
    fn test_channel_defaults_from_declared_type() {
        let event = classify(r#"{"type":"orders","message":"New order"}"#, received()).unwrap();
        assert_eq!(event.channel, "orders");
        assert_eq!(event.level, Severity::Info);
        assert_eq!(event.timestamp, received());

        let event = classify(r#"{"type":"delivery_update","data":{}}"#, received()).unwrap();
        assert_eq!(event.channel, "deliveries");

        let raw = r#"{"type":"connection_confirmed","message":"Connected as admin"}"#;
        let event = classify(raw, received()).unwrap();
        assert_eq!(event.channel, "connection_confirmed");
    }

    #[test]
    fn test_explicit_channel_wins_over_type() {
        let event =
            classify(r#"{"channel":"orders","type":"inventory_update"}"#, received()).unwrap();
        assert_eq!(event.channel, "orders");
    }

    #[test]
    fn test_alert_frames_use_payload() {
        let raw = r#"{"type":"alert","data":{
            "alert_type": "Cold chain",
            "message": "Freezer 3 above threshold",
            "severity": "high"
        }}"#;
        let event = classify(raw, received()).unwrap();

        assert_eq!(event.channel, "alerts");
        assert_eq!(event.level, Severity::Error);
        assert_eq!(event.message, "Freezer 3 above threshold");

        let event =
            classify(r#"{"type":"alert","data":{"severity":"medium"}}"#, received()).unwrap();
        assert_eq!(event.level, Severity::Warning);
        assert_eq!(event.message, "");
    }

    #[test]
    fn test_naive_and_invalid_timestamps() {
        let event = classify(
            r#"{"type":"order_update","timestamp":"2024-06-01T08:30:15.123456"}"#,
            received(),
        )
        .unwrap();
        assert_eq!(
            event.timestamp.format("%H:%M:%S%.3f").to_string(),
            "08:30:15.123"
        );

        let event =
            classify(r#"{"type":"order_update","timestamp":"yesterday"}"#, received()).unwrap();
        assert_eq!(event.timestamp, received());
    }

    #[test]
    fn test_malformed_frames_are_rejected() {
        assert!(matches!(
            classify("{not json", received()),
            Err(ClassificationError::InvalidJson(_))
        ));
        assert_eq!(
            classify(r#""Message received: hello""#, received()),
            Err(ClassificationError::NotAnObject)
        );
        assert_eq!(
            classify(r#"{"message":"orphan"}"#, received()),
            Err(ClassificationError::MissingChannel)
        );
        assert_eq!(
            classify(r#"{"channel":"  ","type":""}"#, received()),
            Err(ClassificationError::MissingChannel)
        );
        assert_eq!(
            classify(r#"{"channel":"orders","level":"loud"}"#, received()),
            Err(ClassificationError::UnknownLevel("loud".to_string()))
        );
        assert!(matches!(
            classify(r#"{"channel":"orders","message":42}"#, received()),
            Err(ClassificationError::InvalidField(_))
        ));
    }

    #[test]
    fn test_non_string_timestamps() {
        let event = classify(
            r#"{"channel":"orders","timestamp":1717246800000}"#,
            received(),
        )
        .unwrap();
        assert_eq!(event.timestamp, Utc.with_ymd_and_hms(2024, 6, 1, 13, 0, 0).unwrap());

        for raw in [
            r#"{"channel":"orders","timestamp":true}"#,
            r#"{"channel":"orders","timestamp":{"at":"noon"}}"#,
            r#"{"channel":"orders","timestamp":1.5e300}"#,
            r#"{"channel":"orders","timestamp":null}"#,
        ] {
            let event = classify(raw, received()).unwrap();
            assert_eq!(event.timestamp, received(), "frame {}", raw);
        }
    }
}
