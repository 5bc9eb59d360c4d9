//! Wire framing and well-known payloads.
//!
//! Every message crossing the channel is an event name plus a JSON body.
//! On WebSocket channels this is carried as a text frame:
//!
//! ```json
//! { "event": "sendMessage", "data": { "text": "hi", "sequenceNumber": 0, "enqueuedAtMillis": 1700000000000 } }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{Error, Result};
use crate::identifiers::SequenceNumber;

// ============================================================================
// Event Names
// ============================================================================

/// Outbound authentication request.
pub const AUTHENTICATE: &str = "authenticate";

/// Inbound authentication result.
pub const AUTHENTICATED: &str = "authenticated";

/// Outbound liveness ping.
pub const HEARTBEAT: &str = "heartbeat";

/// Inbound liveness acknowledgement.
pub const HEARTBEAT_ACK: &str = "heartbeatAck";

/// Field added to every application payload.
pub const SEQUENCE_FIELD: &str = "sequenceNumber";

/// Field added to every application payload.
pub const ENQUEUED_AT_FIELD: &str = "enqueuedAtMillis";

// ============================================================================
// Frame
// ============================================================================

/// A single event on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Event name.
    pub event: String,

    /// Event body.
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    /// Creates a frame.
    #[inline]
    #[must_use]
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Parses a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if `text` is not a `{event, data}` object.
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::protocol(format!("malformed frame: {e}")))
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// Body of the `authenticate` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    /// Username claimed by the client.
    pub username: String,

    /// Session token, `null` when none is known.
    pub token: Option<String>,
}

/// Body of the `authenticated` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthResponse {
    /// Whether the server accepted the credentials.
    #[serde(default)]
    pub success: bool,

    /// Canonical username as confirmed by the server.
    #[serde(default)]
    pub username: Option<String>,

    /// Rejection reason.
    #[serde(default)]
    pub error: Option<String>,
}

// ============================================================================
// Heartbeat
// ============================================================================

/// Body of the `heartbeat` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatPayload {
    /// Milliseconds since the Unix epoch when the ping was sent.
    pub timestamp: i64,
}

// ============================================================================
// Stamping
// ============================================================================

/// Adds ordering fields to an application payload.
///
/// Object payloads keep their domain fields; anything else is nested under
/// `"data"` so the stamp always lands in an object.
#[must_use]
pub fn stamp_payload(payload: Value, sequence: SequenceNumber, enqueued_at_millis: i64) -> Value {
    let mut object = match payload {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("data".to_string(), other);
            map
        }
    };

    object.insert(SEQUENCE_FIELD.to_string(), json!(sequence.as_u64()));
    object.insert(ENQUEUED_AT_FIELD.to_string(), json!(enqueued_at_millis));

    Value::Object(object)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_wire_format() {
        let frame = Frame::new("sendMessage", json!({ "text": "hi" }));
        let text = serde_json::to_string(&frame).unwrap();
        assert_eq!(text, r#"{"event":"sendMessage","data":{"text":"hi"}}"#);
    }

    #[test]
    fn test_frame_without_data() {
        let frame: Frame = serde_json::from_str(r#"{"event":"heartbeatAck"}"#).unwrap();
        assert_eq!(frame.event, HEARTBEAT_ACK);
        assert!(frame.data.is_null());
    }

    #[test]
    fn test_auth_request_null_token() {
        let request = AuthRequest {
            username: "alice".into(),
            token: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({ "username": "alice", "token": null }));
    }

    #[test]
    fn test_auth_response_failure() {
        let response: AuthResponse =
            serde_json::from_value(json!({ "success": false, "error": "expired" })).unwrap();
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("expired"));
        assert!(response.username.is_none());
    }

    #[test]
    fn test_stamp_object_payload() {
        let stamped = stamp_payload(json!({ "text": "hi" }), SequenceNumber::new(3), 1000);
        assert_eq!(
            stamped,
            json!({ "text": "hi", "sequenceNumber": 3, "enqueuedAtMillis": 1000 })
        );
    }

    #[test]
    fn test_stamp_scalar_payload_is_nested() {
        let stamped = stamp_payload(json!("ping"), SequenceNumber::ZERO, 5);
        assert_eq!(stamped["data"], json!("ping"));
        assert_eq!(stamped[SEQUENCE_FIELD], json!(0));
    }

    #[test]
    fn test_decode_rejects_malformed_frame() {
        assert!(matches!(Frame::decode("not json"), Err(Error::Protocol { .. })));
        assert!(matches!(Frame::decode(r#"{"data": 1}"#), Err(Error::Protocol { .. })));
        assert_eq!(
            Frame::decode(r#"{"event":"heartbeatAck"}"#).unwrap(),
            Frame::new(HEARTBEAT_ACK, Value::Null)
        );
    }
}
