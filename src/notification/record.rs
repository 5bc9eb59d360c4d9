//! Notification record extracted from an inbound event.

// ============================================================================
// Imports
// ============================================================================

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// Constants
// ============================================================================

/// Fields searched, in order, for preview text.
const PREVIEW_FIELDS: [&str; 4] = ["preview", "text", "content", "message"];

/// Sender used when the event names none.
const UNKNOWN_SENDER: &str = "unknown";

// ============================================================================
// NotificationRecord
// ============================================================================

/// Transient description of one inbound notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    /// `sender-messageId`, or `sender-timestamp` when there is no message id.
    pub dedupe_key: String,

    /// Sender identity.
    pub sender: String,

    /// Shortened message text.
    pub preview: String,

    /// Event time, or receive time if the event carried none.
    pub timestamp: DateTime<Utc>,

    /// `true` once a platform alert was raised for this record.
    pub delivered: bool,
}

impl NotificationRecord {
    /// Builds a record from event data.
    #[must_use]
    pub fn from_event(data: &Value, preview_length: usize) -> Self {
        let sender = data
            .get("sender")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_SENDER)
            .to_string();

        let received_at = Utc::now();
        let timestamp = data
            .get("timestamp")
            .and_then(parse_timestamp)
            .unwrap_or(received_at);

        let identity = data
            .get("messageId")
            .and_then(scalar_to_string)
            .or_else(|| data.get("timestamp").and_then(scalar_to_string))
            .unwrap_or_else(|| received_at.timestamp_millis().to_string());

        let preview = PREVIEW_FIELDS
            .iter()
            .find_map(|field| data.get(*field).and_then(Value::as_str))
            .map(|text| truncate(text, preview_length))
            .unwrap_or_default();

        Self {
            dedupe_key: format!("{sender}-{identity}"),
            sender,
            preview,
            timestamp,
            delivered: false,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accepts epoch milliseconds or an RFC 3339 string.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max_chars).collect();
    short.push_str("...");
    short
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_key_prefers_message_id() {
        let record = NotificationRecord::from_event(
            &json!({ "sender": "alice", "messageId": "m1", "timestamp": 1_700_000_000_000i64 }),
            120,
        );
        assert_eq!(record.dedupe_key, "alice-m1");
        assert_eq!(record.timestamp.timestamp_millis(), 1_700_000_000_000);
        assert!(!record.delivered);
    }

    #[test]
    fn test_key_falls_back_to_timestamp() {
        let record = NotificationRecord::from_event(
            &json!({ "sender": "bob", "timestamp": 1_700_000_000_123i64 }),
            120,
        );
        assert_eq!(record.dedupe_key, "bob-1700000000123");
    }

    #[test]
    fn test_numeric_message_id() {
        let record =
            NotificationRecord::from_event(&json!({ "sender": "bob", "messageId": 42 }), 120);
        assert_eq!(record.dedupe_key, "bob-42");
    }

    #[test]
    fn test_rfc3339_timestamp() {
        let record = NotificationRecord::from_event(
            &json!({ "sender": "carol", "timestamp": "2024-01-02T03:04:05Z" }),
            120,
        );
        assert_eq!(record.timestamp.to_rfc3339(), "2024-01-02T03:04:05+00:00");
        assert_eq!(record.dedupe_key, "carol-2024-01-02T03:04:05Z");
    }

    #[test]
    fn test_preview_truncated() {
        let record = NotificationRecord::from_event(
            &json!({ "sender": "dave", "text": "abcdefghij" }),
            4,
        );
        assert_eq!(record.preview, "abcd...");
    }

    #[test]
    fn test_preview_field_order() {
        let record = NotificationRecord::from_event(
            &json!({ "sender": "erin", "message": "later", "text": "first" }),
            120,
        );
        assert_eq!(record.preview, "first");
    }

    #[test]
    fn test_missing_sender() {
        let record = NotificationRecord::from_event(&json!({ "messageId": "x" }), 120);
        assert_eq!(record.sender, "unknown");
        assert_eq!(record.dedupe_key, "unknown-x");
    }
}
