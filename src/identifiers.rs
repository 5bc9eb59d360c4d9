//! Type-safe identifiers.
//!
//! Newtype wrappers keep registry keys, outbound sequence numbers and
//! channel generations from being mixed up at compile time.
//!
//! | Type | Wraps | Purpose |
//! |------|-------|---------|
//! | [`ClientId`] | `String` | Registry key for one logical client |
//! | [`SequenceNumber`] | `u64` | Outbound message ordering stamp |
//! | [`ChannelGeneration`] | `u64` | Distinguishes successive channel instances |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// ClientId
// ============================================================================

/// Logical client identifier used by [`ClientRegistry`](crate::ClientRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Creates a client identifier.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ClientId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ============================================================================
// SequenceNumber
// ============================================================================

/// Monotonic stamp assigned to every outbound application message.
///
/// Starts at zero and is never reused for the lifetime of a client.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SequenceNumber(u64);

impl SequenceNumber {
    /// First sequence number handed out by a fresh client.
    pub const ZERO: Self = Self(0);

    /// Wraps a raw value.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the following sequence number.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ChannelGeneration
// ============================================================================

/// Counter bumped every time a client creates a new channel instance.
///
/// Events tagged with an older generation belong to a torn-down channel
/// and are discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelGeneration(u64);

impl ChannelGeneration {
    /// Returns the following generation.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_display() {
        let id = ClientId::new("chat");
        assert_eq!(id.to_string(), "chat");
        assert_eq!(id.as_str(), "chat");
        assert_eq!(ClientId::from("chat"), id);
    }

    #[test]
    fn test_sequence_number_next() {
        let seq = SequenceNumber::ZERO;
        assert_eq!(seq.as_u64(), 0);
        assert_eq!(seq.next().as_u64(), 1);
        assert!(seq.next() > seq);
    }

    #[test]
    fn test_sequence_number_serializes_as_integer() {
        let json = serde_json::to_string(&SequenceNumber::new(7)).unwrap();
        assert_eq!(json, "7");
    }

    #[test]
    fn test_channel_generation_next() {
        let generation = ChannelGeneration::default();
        assert_eq!(generation.next().as_u64(), 1);
    }
}
