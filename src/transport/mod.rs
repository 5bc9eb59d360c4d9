//! Duplex channel transport layer.
//!
//! This module defines the channel capability the client is built on and
//! ships a WebSocket implementation of it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   open(target, events)   ┌──────────────────┐
//! │  RealtimeClient  │─────────────────────────►│ ChannelProvider  │
//! │                  │                          └────────┬─────────┘
//! │  event pump ◄────┼──── ChannelEvent (mpsc) ──┐       │ creates
//! │                  │                           │       ▼
//! │  connect/emit ───┼──────────────────────────►│ DuplexChannel    │
//! └──────────────────┘                           └──────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `channel` | `DuplexChannel` and `ChannelProvider` traits |
//! | `websocket` | `tokio-tungstenite` implementation |

// ============================================================================
// Submodules
// ============================================================================

/// Channel capability traits.
pub mod channel;

/// WebSocket channel implementation.
pub mod websocket;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{ChannelProvider, DuplexChannel, EventReceiver, EventSender};
pub use websocket::{WebSocketChannel, WebSocketProvider};
