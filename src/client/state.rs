//! Connection state.

use std::fmt;

/// Lifecycle state of a [`RealtimeClient`](crate::RealtimeClient).
///
/// Exactly one value is held at a time. Transitions:
///
/// ```text
/// Disconnected ──connect()──► Connecting ──ack──► Connected
///                                  │                  │
///                            connect error      unexpected drop
///                                  ▼                  ▼
///                             Reconnecting ◄──────────┘
///                                  │
///                           backoff elapsed ──► Connecting
///
/// any ──enable_fallback_mode()──► Fallback ──disable──► Disconnected
/// any ──disconnect()──► Disconnected
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Idle. Resting state after `disconnect()`.
    #[default]
    Disconnected,
    /// Waiting for the channel to acknowledge a connect request.
    Connecting,
    /// Channel is live.
    Connected,
    /// Waiting out the backoff before the next connect attempt.
    Reconnecting,
    /// Deliberately offline; no channel exists.
    Fallback,
}

impl ConnectionState {
    /// Returns the state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Fallback => "fallback",
        }
    }

    /// Returns `true` while a connection attempt is underway.
    #[inline]
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Connecting | Self::Reconnecting)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
