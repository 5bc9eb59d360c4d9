//! Authentication handshake.
//!
//! After the channel connects, the client sends one `authenticate` event with
//! the held identity. The server answers with `authenticated`; on success the
//! username it returns replaces the local one. A rejection is reported to the
//! application but leaves the channel open.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, from_value};

use crate::notification::Environment;
use crate::protocol::{AuthRequest, AuthResponse};

// ============================================================================
// Identity
// ============================================================================

/// Credentials held by a client across reconnections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Username, canonicalised by the server after authentication.
    pub username: String,

    /// Explicit token. `None` means "use the persisted token".
    pub token: Option<String>,
}

impl Identity {
    /// Creates an identity without an explicit token.
    #[inline]
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: None,
        }
    }

    /// Sets an explicit token.
    #[inline]
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Builds the request body, falling back to the persisted token.
    #[must_use]
    pub fn to_request(&self, environment: &dyn Environment) -> AuthRequest {
        AuthRequest {
            username: self.username.clone(),
            token: self
                .token
                .clone()
                .or_else(|| environment.persisted_token()),
        }
    }
}

// ============================================================================
// AuthOutcome
// ============================================================================

/// Interpretation of an `authenticated` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Credentials accepted.
    Accepted {
        /// Canonical username, if the server sent one.
        username: Option<String>,
    },
    /// Credentials rejected.
    Rejected {
        /// Reason given by the server.
        reason: String,
    },
}

impl AuthOutcome {
    /// Interprets the body of an `authenticated` event.
    ///
    /// A body that does not parse counts as a rejection.
    #[must_use]
    pub fn from_event(data: &Value) -> Self {
        match from_value::<AuthResponse>(data.clone()) {
            Ok(response) if response.success => Self::Accepted {
                username: response.username,
            },
            Ok(response) => Self::Rejected {
                reason: response
                    .error
                    .unwrap_or_else(|| "authentication rejected".to_string()),
            },
            Err(e) => Self::Rejected {
                reason: format!("malformed authentication response: {e}"),
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
