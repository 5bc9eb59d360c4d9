//! Realtime client and its building blocks.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | [`RealtimeClient`] state machine |
//! | `state` | [`ConnectionState`] enum |
//! | `queue` | Outbound [`MessageQueue`] with sequence stamping |
//! | `heartbeat` | Periodic liveness ping |
//! | `auth` | [`Identity`] and authentication outcomes |
//! | `callbacks` | [`ClientCallbacks`] hook set |
//! | `options` | [`ClientOptions`] and [`ClientKind`] |

// ============================================================================
// Submodules
// ============================================================================

/// Authentication handshake types.
pub mod auth;

/// Callback hooks.
pub mod callbacks;

/// Client state machine.
pub mod core;

/// Heartbeat monitor.
pub mod heartbeat;

/// Client configuration.
pub mod options;

/// Outbound message queue.
pub mod queue;

/// Connection states.
pub mod state;

pub(crate) mod timer;

// ============================================================================
// Re-exports
// ============================================================================

pub use auth::{AuthOutcome, Identity};
pub use callbacks::ClientCallbacks;
pub use core::RealtimeClient;
pub use heartbeat::HeartbeatMonitor;
pub use options::{ClientKind, ClientOptions};
pub use queue::{MessageQueue, QueuedMessage};
pub use state::ConnectionState;

// ============================================================================
// Helpers
// ============================================================================

/// Wall-clock milliseconds since the Unix epoch.
#[inline]
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
