//! Wire protocol types.
//!
//! This module defines the payload-level framing exchanged with the server
//! and the lifecycle events a channel reports to its client.
//!
//! # Protocol Overview
//!
//! | Event | Direction | Body |
//! |-------|-----------|------|
//! | `authenticate` | Client → Server | `{ username, token }` |
//! | `authenticated` | Server → Client | `{ success, username?, error? }` |
//! | `heartbeat` | Client → Server | `{ timestamp }` |
//! | `heartbeatAck` | Server → Client | any |
//! | application events | both | domain fields + `sequenceNumber` + `enqueuedAtMillis` outbound |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event` | Channel lifecycle events and disconnect reasons |
//! | `frame` | Frame format, well-known event names and payloads |

// ============================================================================
// Submodules
// ============================================================================

/// Channel lifecycle events.
pub mod event;

/// Frame format and well-known payloads.
pub mod frame;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::{ChannelEvent, DisconnectReason};
pub use frame::{AuthRequest, AuthResponse, Frame, HeartbeatPayload, stamp_payload};
