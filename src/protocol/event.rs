//! Channel lifecycle and message events.
//!
//! A [`DuplexChannel`](crate::transport::DuplexChannel) reports everything
//! that happens to it as a [`ChannelEvent`] on the sender it was bound to
//! when it was opened.
//!
//! | Event | Meaning |
//! |-------|---------|
//! | `Connected` | Channel-level connect acknowledged |
//! | `ConnectError` | One connect attempt failed |
//! | `Disconnected` | Channel dropped, with a [`DisconnectReason`] |
//! | `Message` | Inbound frame |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde_json::Value;

use super::frame::Frame;

// ============================================================================
// ChannelEvent
// ============================================================================

/// Event emitted by a duplex channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Channel is connected.
    Connected,

    /// A connect attempt failed.
    ConnectError {
        /// Provider-specific failure description.
        message: String,
    },

    /// Channel is no longer connected.
    Disconnected {
        /// Why the channel dropped.
        reason: DisconnectReason,
    },

    /// Inbound application or control frame.
    Message {
        /// Event name.
        event: String,
        /// Event body.
        data: Value,
    },
}

impl ChannelEvent {
    /// Creates a connect error event.
    #[inline]
    #[must_use]
    pub fn connect_error(message: impl Into<String>) -> Self {
        Self::ConnectError {
            message: message.into(),
        }
    }

    /// Creates a disconnect event.
    #[inline]
    #[must_use]
    pub fn disconnected(reason: DisconnectReason) -> Self {
        Self::Disconnected { reason }
    }

    /// Creates a message event.
    #[inline]
    #[must_use]
    pub fn message(event: impl Into<String>, data: Value) -> Self {
        Self::Message {
            event: event.into(),
            data,
        }
    }
}

impl From<Frame> for ChannelEvent {
    fn from(frame: Frame) -> Self {
        Self::Message {
            event: frame.event,
            data: frame.data,
        }
    }
}

// ============================================================================
// DisconnectReason
// ============================================================================

/// Why a channel stopped being connected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DisconnectReason {
    /// The local side asked to disconnect.
    ClientRequested,
    /// The remote side asked to disconnect.
    ServerRequested,
    /// The underlying connection was closed.
    TransportClose,
    /// The underlying connection failed.
    TransportError,
    /// The peer stopped answering transport pings.
    PingTimeout,
    /// Provider-specific reason.
    Other(String),
}

impl DisconnectReason {
    /// Returns `true` when the drop was explicitly requested by either side.
    ///
    /// Intentional drops are not retried.
    #[inline]
    #[must_use]
    pub fn is_intentional(&self) -> bool {
        matches!(self, Self::ClientRequested | Self::ServerRequested)
    }

    /// Returns the canonical reason string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ClientRequested => "io client disconnect",
            Self::ServerRequested => "io server disconnect",
            Self::TransportClose => "transport close",
            Self::TransportError => "transport error",
            Self::PingTimeout => "ping timeout",
            Self::Other(reason) => reason,
        }
    }
}

impl From<&str> for DisconnectReason {
    fn from(reason: &str) -> Self {
        match reason {
            "io client disconnect" => Self::ClientRequested,
            "io server disconnect" => Self::ServerRequested,
            "transport close" => Self::TransportClose,
            "transport error" => Self::TransportError,
            "ping timeout" => Self::PingTimeout,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_intentional_reasons() {
        assert!(DisconnectReason::ClientRequested.is_intentional());
        assert!(DisconnectReason::ServerRequested.is_intentional());
        assert!(!DisconnectReason::TransportClose.is_intentional());
        assert!(!DisconnectReason::PingTimeout.is_intentional());
        assert!(!DisconnectReason::Other("weird".into()).is_intentional());
    }

    #[test]
    fn test_reason_strings_round_trip() {
        for reason in ["io client disconnect", "io server disconnect", "transport close"] {
            assert_eq!(DisconnectReason::from(reason).as_str(), reason);
        }
        assert_eq!(
            DisconnectReason::from("parse error"),
            DisconnectReason::Other("parse error".into())
        );
    }

    #[test]
    fn test_frame_into_event() {
        let event: ChannelEvent = Frame::new("newMessage", json!({ "text": "yo" })).into();
        assert_eq!(
            event,
            ChannelEvent::message("newMessage", json!({ "text": "yo" }))
        );
    }
}
