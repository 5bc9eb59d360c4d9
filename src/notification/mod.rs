//! Inbound notification handling.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`NotificationDispatcher`] | System filtering, in-app hook, alert raising, click handling |
//! | [`NotificationRecord`] | Transient description of one notification |
//! | [`Environment`] | Host capabilities: visibility, permission, alerts, persisted token |
//! | [`HeadlessEnvironment`] | `Environment` for hosts without a UI |

// ============================================================================
// Submodules
// ============================================================================

/// Notification dispatcher.
pub mod dispatcher;

/// Host environment capability.
pub mod environment;

/// Notification record.
pub mod record;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use dispatcher::NotificationDispatcher;
pub use environment::{Alert, Environment, HeadlessEnvironment};
pub use record::NotificationRecord;
