//! Application callback hooks.
//!
//! Every failure and every inbound event reaches the application through one
//! of these hooks; nothing is returned from event-handling context. Unset
//! hooks are skipped.
//!
//! Hooks are invoked without any client lock held, so they may call back
//! into the client.
//!
//! # Example
//!
//! ```
//! use realtime_transport::ClientCallbacks;
//!
//! let callbacks = ClientCallbacks::new()
//!     .on_connect(|| println!("online"))
//!     .on_disconnect(|reason| println!("offline: {reason}"))
//!     .on_message(|event, data| println!("{event}: {data}"));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::Error;
use crate::notification::NotificationRecord;
use crate::protocol::DisconnectReason;

use super::queue::QueuedMessage;

// ============================================================================
// Types
// ============================================================================

type Hook0 = Arc<dyn Fn() + Send + Sync>;
type Hook1<T> = Arc<dyn Fn(&T) + Send + Sync>;
type StrHook = Arc<dyn Fn(&str) + Send + Sync>;
type MessageHook = Arc<dyn Fn(&str, &Value) + Send + Sync>;
type LostHook = Arc<dyn Fn(&[QueuedMessage]) + Send + Sync>;

// ============================================================================
// ClientCallbacks
// ============================================================================

/// Set of hooks supplied to `connect`.
#[derive(Clone, Default)]
pub struct ClientCallbacks {
    connect: Option<Hook0>,
    disconnect: Option<Hook1<DisconnectReason>>,
    connect_error: Option<Hook1<Error>>,
    authenticated: Option<StrHook>,
    authentication_failed: Option<Hook1<Value>>,
    message: Option<MessageHook>,
    notification: Option<Hook1<NotificationRecord>>,
    notification_click: Option<Hook1<Value>>,
    message_lost: Option<LostHook>,
}

impl fmt::Debug for ClientCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCallbacks")
            .field("connect", &self.connect.is_some())
            .field("disconnect", &self.disconnect.is_some())
            .field("connect_error", &self.connect_error.is_some())
            .field("authenticated", &self.authenticated.is_some())
            .field("authentication_failed", &self.authentication_failed.is_some())
            .field("message", &self.message.is_some())
            .field("notification", &self.notification.is_some())
            .field("notification_click", &self.notification_click.is_some())
            .field("message_lost", &self.message_lost.is_some())
            .finish()
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ClientCallbacks {
    /// Creates an empty hook set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called on every transition into `Connected`, and again when `connect`
    /// is called while already connected.
    #[must_use]
    pub fn on_connect(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.connect = Some(Arc::new(f));
        self
    }

    /// Called when a live channel drops.
    #[must_use]
    pub fn on_disconnect(mut self, f: impl Fn(&DisconnectReason) + Send + Sync + 'static) -> Self {
        self.disconnect = Some(Arc::new(f));
        self
    }

    /// Called on channel connect errors and on connection timeout.
    #[must_use]
    pub fn on_connect_error(mut self, f: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.connect_error = Some(Arc::new(f));
        self
    }

    /// Called with the server-confirmed username.
    #[must_use]
    pub fn on_authenticated(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.authenticated = Some(Arc::new(f));
        self
    }

    /// Called with the raw `authenticated` body when credentials are rejected.
    #[must_use]
    pub fn on_authentication_failed(mut self, f: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        self.authentication_failed = Some(Arc::new(f));
        self
    }

    /// Called for every inbound domain event.
    #[must_use]
    pub fn on_message(mut self, f: impl Fn(&str, &Value) + Send + Sync + 'static) -> Self {
        self.message = Some(Arc::new(f));
        self
    }

    /// Called for every in-app notification.
    #[must_use]
    pub fn on_notification(
        mut self,
        f: impl Fn(&NotificationRecord) + Send + Sync + 'static,
    ) -> Self {
        self.notification = Some(Arc::new(f));
        self
    }

    /// Called with the original event data when a raised alert is clicked.
    #[must_use]
    pub fn on_notification_click(mut self, f: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        self.notification_click = Some(Arc::new(f));
        self
    }

    /// Called with the entries that could not be sent during a flush.
    #[must_use]
    pub fn on_message_lost(
        mut self,
        f: impl Fn(&[QueuedMessage]) + Send + Sync + 'static,
    ) -> Self {
        self.message_lost = Some(Arc::new(f));
        self
    }
}

// ============================================================================
// Invocation
// ============================================================================

impl ClientCallbacks {
    pub(crate) fn connected(&self) {
        if let Some(f) = &self.connect {
            f();
        }
    }

    pub(crate) fn disconnected(&self, reason: &DisconnectReason) {
        if let Some(f) = &self.disconnect {
            f(reason);
        }
    }

    pub(crate) fn connect_error(&self, error: &Error) {
        if let Some(f) = &self.connect_error {
            f(error);
        }
    }

    pub(crate) fn authenticated(&self, username: &str) {
        if let Some(f) = &self.authenticated {
            f(username);
        }
    }

    pub(crate) fn authentication_failed(&self, data: &Value) {
        if let Some(f) = &self.authentication_failed {
            f(data);
        }
    }

    pub(crate) fn message(&self, event: &str, data: &Value) {
        if let Some(f) = &self.message {
            f(event, data);
        }
    }

    pub(crate) fn notification(&self, record: &NotificationRecord) {
        if let Some(f) = &self.notification {
            f(record);
        }
    }

    pub(crate) fn notification_click(&self, data: &Value) {
        if let Some(f) = &self.notification_click {
            f(data);
        }
    }

    pub(crate) fn message_lost(&self, lost: &[QueuedMessage]) {
        if let Some(f) = &self.message_lost {
            f(lost);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
