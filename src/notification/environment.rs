//! Host environment capability.
//!
//! Visibility, alert permission, alert display and the persisted session
//! token all belong to whatever hosts the client (a desktop shell, a mobile
//! app, a headless service). The client only sees them through
//! [`Environment`].

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

use crate::error::{Error, Result};

// ============================================================================
// Alert
// ============================================================================

/// A platform alert to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    /// Coalescing tag; also the dedupe key.
    pub tag: String,
    /// Alert title (the sender).
    pub title: String,
    /// Alert body (the preview).
    pub body: String,
}

// ============================================================================
// Environment
// ============================================================================

/// Capabilities the host provides to the client.
pub trait Environment: Send + Sync {
    /// Returns `true` if the application is the visible, focused surface.
    fn is_foreground(&self) -> bool;

    /// Returns `true` if the host can display platform alerts at all.
    fn alerts_supported(&self) -> bool;

    /// Returns `true` if the user has granted alert permission.
    fn has_alert_permission(&self) -> bool;

    /// Asks the user for alert permission. Returns the resulting grant.
    fn request_alert_permission(&self) -> bool;

    /// Returns the last session token the host persisted, if any.
    fn persisted_token(&self) -> Option<String>;

    /// Displays an alert.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Alert`] if the host could not display it.
    fn show_alert(&self, alert: &Alert) -> Result<()>;

    /// Removes a displayed alert.
    fn dismiss_alert(&self, tag: &str);

    /// Brings the application to the foreground.
    fn focus_application(&self);
}

// ============================================================================
// HeadlessEnvironment
// ============================================================================

/// Environment for hosts without a UI.
///
/// Always foreground, never shows alerts. Optionally supplies a fixed token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadlessEnvironment {
    token: Option<String>,
}

impl HeadlessEnvironment {
    /// Creates a headless environment with no persisted token.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the token reported by [`Environment::persisted_token`].
    #[inline]
    #[must_use]
    pub fn with_persisted_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

impl Environment for HeadlessEnvironment {
    fn is_foreground(&self) -> bool {
        true
    }

    fn alerts_supported(&self) -> bool {
        false
    }

    fn has_alert_permission(&self) -> bool {
        false
    }

    fn request_alert_permission(&self) -> bool {
        false
    }

    fn persisted_token(&self) -> Option<String> {
        self.token.clone()
    }

    fn show_alert(&self, _alert: &Alert) -> Result<()> {
        Err(Error::alert("alerts are not supported in a headless environment"))
    }

    fn dismiss_alert(&self, _tag: &str) {}

    fn focus_application(&self) {}
}

// ============================================================================
// Tests
// ============================================================================
