//! Process-wide client registry.
//!
//! Hands out one [`RealtimeClient`] per identifier so independent parts of
//! an application share a single connection.
//!
//! ```text
//! ┌───────────────────────────────────────┐
//! │            ClientRegistry             │
//! │  ┌─────────────────────────────────┐  │
//! │  │ "chat"          → RealtimeClient│  │
//! │  │ "notifications" → RealtimeClient│  │
//! │  └─────────────────────────────────┘  │
//! └───────────────────────────────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};
use url::Url;

use crate::client::{ClientKind, ClientOptions, RealtimeClient};
use crate::error::{Error, Result};
use crate::identifiers::ClientId;
use crate::notification::Environment;
use crate::transport::ChannelProvider;

// ============================================================================
// ClientRegistry
// ============================================================================

/// Keyed collection of shared clients.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use realtime_transport::{ClientKind, ClientRegistry, HeadlessEnvironment, WebSocketProvider};
///
/// # async fn example() -> realtime_transport::Result<()> {
/// let registry = ClientRegistry::new(
///     Arc::new(WebSocketProvider::new()),
///     Arc::new(HeadlessEnvironment::new()),
/// )
/// .with_default_target("ws://localhost:3000".parse()?);
///
/// let chat = registry.get_client(ClientKind::Chat, None, None, None)?;
/// let again = registry.get_client(ClientKind::Chat, None, None, None)?;
/// assert_eq!(chat.id(), again.id());
/// # Ok(())
/// # }
/// ```
pub struct ClientRegistry {
    provider: Arc<dyn ChannelProvider>,
    environment: Arc<dyn Environment>,
    default_target: Option<Url>,
    clients: Mutex<FxHashMap<ClientId, RealtimeClient>>,
}

impl fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("default_target", &self.default_target.as_ref().map(Url::as_str))
            .field("clients", &self.clients.lock().len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ClientRegistry - Constructor
// ============================================================================

impl ClientRegistry {
    /// Creates an empty registry.
    ///
    /// Every client it creates opens channels through `provider` and reads
    /// host capabilities from `environment`.
    #[must_use]
    pub fn new(provider: Arc<dyn ChannelProvider>, environment: Arc<dyn Environment>) -> Self {
        Self {
            provider,
            environment,
            default_target: None,
            clients: Mutex::new(FxHashMap::default()),
        }
    }

    /// Sets the target used when `get_client` is given none.
    #[must_use]
    pub fn with_default_target(mut self, target: Url) -> Self {
        self.default_target = Some(target);
        self
    }
}

// ============================================================================
// ClientRegistry - Public API
// ============================================================================

impl ClientRegistry {
    /// Returns the client registered under `id`, creating it if absent.
    ///
    /// - `id` defaults to the kind name (`"chat"` / `"notifications"`)
    /// - `target` defaults to the registry's default target
    /// - `options` default to [`ClientOptions::for_kind`]
    ///
    /// `target` and `options` are ignored when the client already exists.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no target is given and no default is set
    /// - Any error from [`RealtimeClient::new`]
    pub fn get_client(
        &self,
        kind: ClientKind,
        id: Option<&str>,
        target: Option<Url>,
        options: Option<ClientOptions>,
    ) -> Result<RealtimeClient> {
        let id = ClientId::new(id.unwrap_or(kind.as_str()));
        let mut clients = self.clients.lock();

        if let Some(client) = clients.get(&id) {
            if client.kind() != kind {
                warn!(client = %id, existing = %client.kind(), requested = %kind, "Client kind mismatch");
            }
            return Ok(client.clone());
        }

        let target = target
            .or_else(|| self.default_target.clone())
            .ok_or_else(|| Error::config(format!("No target for client '{id}'")))?;
        let options = options.unwrap_or_else(|| ClientOptions::for_kind(kind));

        let client = RealtimeClient::new(
            id.clone(),
            kind,
            target,
            options,
            Arc::clone(&self.provider),
            Arc::clone(&self.environment),
        )?;
        clients.insert(id.clone(), client.clone());

        info!(client = %id, %kind, "Client registered");
        Ok(client)
    }

    /// Returns the client registered under `id`, if any.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<RealtimeClient> {
        self.clients.lock().get(&ClientId::new(id)).cloned()
    }

    /// Disconnects and forgets the client under `id`.
    ///
    /// Returns `false` if no such client exists.
    pub fn remove_client(&self, id: &str) -> bool {
        let removed = self.clients.lock().remove(&ClientId::new(id));

        match removed {
            Some(client) => {
                client.disconnect();
                debug!(client = id, "Client removed");
                true
            }
            None => false,
        }
    }

    /// Disconnects every registered client. Clients stay registered.
    pub fn disconnect_all(&self) {
        let clients: Vec<RealtimeClient> = self.clients.lock().values().cloned().collect();
        for client in &clients {
            client.disconnect();
        }
        info!(count = clients.len(), "All clients disconnected");
    }

    /// Returns `true` if a client is registered under `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.clients.lock().contains_key(&ClientId::new(id))
    }

    /// Number of registered clients.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    /// Returns `true` if no client is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.lock().is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
