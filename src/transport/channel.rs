//! Duplex channel capability.
//!
//! The client never talks to a socket directly. It asks a [`ChannelProvider`]
//! for a [`DuplexChannel`] once, binding the channel to an event sender at
//! creation time, and from then on only requests connects, disconnects and
//! emits. Everything the channel observes comes back as a
//! [`ChannelEvent`](crate::protocol::ChannelEvent) on that sender.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use url::Url;

use crate::error::Result;
use crate::protocol::ChannelEvent;

// ============================================================================
// Types
// ============================================================================

/// Sender a channel reports its events on.
pub type EventSender = mpsc::UnboundedSender<ChannelEvent>;

/// Receiver side of [`EventSender`].
pub type EventReceiver = mpsc::UnboundedReceiver<ChannelEvent>;

// ============================================================================
// DuplexChannel
// ============================================================================

/// A connectable, eventable, bidirectional channel.
///
/// All methods are non-blocking. `connect` and `disconnect` are requests;
/// their outcome is reported through the bound event sender. Implementations
/// must not call back into the client synchronously.
pub trait DuplexChannel: Send + Sync {
    /// Requests a connection. Ignored if already connected or connecting.
    fn connect(&self);

    /// Requests a disconnect.
    fn disconnect(&self);

    /// Sends one event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`](crate::Error::NotConnected) when the
    /// channel is not connected, or a transport error if the frame could
    /// not be handed to the connection.
    fn emit(&self, event: &str, data: Value) -> Result<()>;

    /// Returns `true` if the channel currently reports itself connected.
    fn is_connected(&self) -> bool;
}

// ============================================================================
// ChannelProvider
// ============================================================================

/// Factory for duplex channels.
pub trait ChannelProvider: Send + Sync {
    /// Creates a channel for `target`, bound to `events` for its whole life.
    ///
    /// The returned channel is idle; call [`DuplexChannel::connect`] to start.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the target is not
    /// usable by this provider.
    fn open(&self, target: &Url, events: EventSender) -> Result<Arc<dyn DuplexChannel>>;
}
