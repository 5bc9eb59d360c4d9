//! Realtime Transport - Resilient client for event-based realtime channels.
//!
//! This library keeps a logical connection to a realtime server alive across
//! network drops and hands the application a small, callback-driven API.
//!
//! # Architecture
//!
//! The client follows a single-owner state machine model:
//!
//! - **Channel (transport)**: Opens the socket, reports lifecycle events
//! - **Client (state machine)**: Reacts to those events, owns every timer
//!
//! Key design principles:
//!
//! - Each [`RealtimeClient`] owns: one channel + outbound queue + heartbeat
//! - Frames use `{"event": ..., "data": ...}` JSON text messages
//! - Messages sent while offline are queued with sequence numbers and
//!   flushed in order on connect
//! - Unexpected drops back off and reconnect; caller disconnects do not
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use realtime_transport::{
//!     ClientCallbacks, ClientKind, ClientRegistry, HeadlessEnvironment, Identity, Result,
//!     WebSocketProvider,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let registry = ClientRegistry::new(
//!         Arc::new(WebSocketProvider::new()),
//!         Arc::new(HeadlessEnvironment::new()),
//!     )
//!     .with_default_target("ws://localhost:3000".parse()?);
//!
//!     let chat = registry.get_client(ClientKind::Chat, None, None, None)?;
//!     chat.connect(
//!         ClientCallbacks::new()
//!             .on_connect(|| println!("connected"))
//!             .on_message(|event, data| println!("{event}: {data}")),
//!         Some(Identity::new("alice")),
//!     )?;
//!
//!     chat.emit_with_queue("sendMessage", serde_json::json!({ "text": "hello" }));
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`RealtimeClient`] state machine, queue, heartbeat, authentication |
//! | [`notification`] | Notification dispatch and host [`Environment`] |
//! | [`registry`] | [`ClientRegistry`] keyed client instances |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Frame and channel event types |
//! | [`transport`] | Channel capability and WebSocket implementation |

// ============================================================================
// Modules
// ============================================================================

/// Realtime client.
///
/// - [`RealtimeClient`] - Connection state machine
/// - [`ClientCallbacks`] - Application hooks
/// - [`ClientOptions`] - Timings and notification settings
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Notification handling and host environment.
pub mod notification;

/// Wire frames and channel events.
pub mod protocol;

/// Keyed client registry.
pub mod registry;

/// Channel transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{
    AuthOutcome, ClientCallbacks, ClientKind, ClientOptions, ConnectionState, HeartbeatMonitor,
    Identity, MessageQueue, QueuedMessage, RealtimeClient,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ClientId, SequenceNumber};

// Notification types
pub use notification::{
    Alert, Environment, HeadlessEnvironment, NotificationDispatcher, NotificationRecord,
};

// Protocol types
pub use protocol::{ChannelEvent, DisconnectReason, Frame};

// Registry
pub use registry::ClientRegistry;

// Transport types
pub use transport::{ChannelProvider, DuplexChannel, EventSender, WebSocketProvider};
