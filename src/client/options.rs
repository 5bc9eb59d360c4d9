//! Client configuration.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use realtime_transport::{ClientKind, ClientOptions};
//!
//! let options = ClientOptions::for_kind(ClientKind::Chat)
//!     .with_heartbeat_interval(Duration::from_secs(15))
//!     .with_reconnect_delay(Duration::from_secs(2));
//!
//! assert!(options.validate().is_ok());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default interval between heartbeats.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(30_000);

/// Default time allowed for a connect attempt.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_millis(20_000);

/// Default backoff before reconnecting after a drop.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5_000);

/// Default number of alert keys remembered for deduplication.
pub const DEFAULT_DEDUPE_CAPACITY: usize = 256;

/// Default preview length in characters.
pub const DEFAULT_PREVIEW_LENGTH: usize = 120;

/// Sender whose events are never surfaced as notifications.
pub const SYSTEM_SENDER: &str = "System";

// ============================================================================
// ClientKind
// ============================================================================

/// Flavour of client created by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientKind {
    /// Messaging client. Only `newMessage` surfaces as a notification.
    Chat,
    /// Notification feed. `notification` and `newMessage` surface.
    Notifications,
}

impl ClientKind {
    /// Default registry id for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Notifications => "notifications",
        }
    }

    /// Inbound events routed to the notification dispatcher.
    #[must_use]
    pub fn notification_events(self) -> Vec<String> {
        match self {
            Self::Chat => vec!["newMessage".to_string()],
            Self::Notifications => vec!["notification".to_string(), "newMessage".to_string()],
        }
    }
}

impl fmt::Display for ClientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ClientOptions
// ============================================================================

/// Tunables for one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Interval between heartbeats while connected.
    pub heartbeat_interval: Duration,

    /// Time allowed between a connect request and the connected event.
    pub connection_timeout: Duration,

    /// Delay before reconnecting after an unexpected drop or connect error.
    pub reconnect_delay: Duration,

    /// Senders treated as system identities.
    pub system_senders: Vec<String>,

    /// Inbound events routed to the notification dispatcher.
    pub notification_events: Vec<String>,

    /// Number of recently raised alert keys remembered.
    pub dedupe_capacity: usize,

    /// Maximum preview length in characters.
    pub preview_length: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ClientOptions {
    /// Creates options with default timings and no notification events.
    #[must_use]
    pub fn new() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            system_senders: vec![SYSTEM_SENDER.to_string()],
            notification_events: Vec::new(),
            dedupe_capacity: DEFAULT_DEDUPE_CAPACITY,
            preview_length: DEFAULT_PREVIEW_LENGTH,
        }
    }

    /// Creates default options for a client kind.
    #[must_use]
    pub fn for_kind(kind: ClientKind) -> Self {
        Self {
            notification_events: kind.notification_events(),
            ..Self::new()
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ClientOptions {
    /// Sets the heartbeat interval.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the connection timeout.
    #[inline]
    #[must_use]
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Sets the reconnect backoff.
    #[inline]
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Adds a system sender.
    #[inline]
    #[must_use]
    pub fn with_system_sender(mut self, sender: impl Into<String>) -> Self {
        self.system_senders.push(sender.into());
        self
    }

    /// Adds an event routed to the notification dispatcher.
    #[inline]
    #[must_use]
    pub fn with_notification_event(mut self, event: impl Into<String>) -> Self {
        self.notification_events.push(event.into());
        self
    }

    /// Sets the dedupe history size.
    #[inline]
    #[must_use]
    pub fn with_dedupe_capacity(mut self, capacity: usize) -> Self {
        self.dedupe_capacity = capacity;
        self
    }

    /// Sets the preview length.
    #[inline]
    #[must_use]
    pub fn with_preview_length(mut self, length: usize) -> Self {
        self.preview_length = length;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientOptions {
    /// Checks that every timing and capacity is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_interval.is_zero() {
            return Err(Error::config("heartbeat_interval must be non-zero"));
        }
        if self.connection_timeout.is_zero() {
            return Err(Error::config("connection_timeout must be non-zero"));
        }
        if self.reconnect_delay.is_zero() {
            return Err(Error::config("reconnect_delay must be non-zero"));
        }
        if self.dedupe_capacity == 0 {
            return Err(Error::config("dedupe_capacity must be non-zero"));
        }
        Ok(())
    }

    /// Returns `true` if `event` should go through the dispatcher.
    #[inline]
    #[must_use]
    pub fn is_notification_event(&self, event: &str) -> bool {
        self.notification_events.iter().any(|e| e == event)
    }
}

// ============================================================================
// Tests
// ============================================================================
