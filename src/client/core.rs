//! Realtime client state machine.
//!
//! [`RealtimeClient`] owns one logical connection: the channel, the outbound
//! queue, the heartbeat, the held identity and every timer. All of it sits
//! behind a single lock, so each transition is atomic. Callbacks are always
//! invoked after the lock is released.
//!
//! # Lifecycle
//!
//! 1. `connect` - lazily opens the channel (once) and requests a connect
//! 2. Channel reports `Connected` - heartbeat starts, identity is sent, queue flushes
//! 3. Unexpected drop or connect error - backoff, then a new connect attempt
//! 4. `disconnect` - everything cancelled, identity cleared

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use serde_json::{Value, to_value};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{ChannelGeneration, ClientId, SequenceNumber};
use crate::notification::{Environment, NotificationDispatcher, NotificationRecord};
use crate::protocol::frame::{AUTHENTICATE, AUTHENTICATED, HEARTBEAT_ACK};
use crate::protocol::{ChannelEvent, DisconnectReason};
use crate::transport::{ChannelProvider, DuplexChannel, EventReceiver};

use super::auth::{AuthOutcome, Identity};
use super::callbacks::ClientCallbacks;
use super::heartbeat::HeartbeatMonitor;
use super::now_millis;
use super::options::{ClientKind, ClientOptions};
use super::queue::{MessageQueue, QueuedMessage};
use super::state::ConnectionState;
use super::timer::Timer;

// ============================================================================
// ChannelSlot
// ============================================================================

/// The live channel and the task draining its events.
struct ChannelSlot {
    channel: Arc<dyn DuplexChannel>,
    generation: ChannelGeneration,
    pump: JoinHandle<()>,
}

impl Drop for ChannelSlot {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

// ============================================================================
// ClientState
// ============================================================================

/// Everything mutated by transitions.
#[derive(Default)]
struct ClientState {
    connection: ConnectionState,
    channel: Option<ChannelSlot>,
    generation: ChannelGeneration,
    opens: usize,
    queue: MessageQueue,
    identity: Option<Identity>,
    callbacks: ClientCallbacks,
    connect_timeout: Option<Timer>,
    reconnect_timer: Option<Timer>,
    heartbeat: Option<HeartbeatMonitor>,
}

type StateGuard<'a> = MutexGuard<'a, ClientState>;

// ============================================================================
// ClientInner
// ============================================================================

/// Shared state behind [`RealtimeClient`].
pub(crate) struct ClientInner {
    id: ClientId,
    kind: ClientKind,
    target: Url,
    options: ClientOptions,
    provider: Arc<dyn ChannelProvider>,
    environment: Arc<dyn Environment>,
    dispatcher: NotificationDispatcher,
    runtime: Handle,
    state: Mutex<ClientState>,
}

// ============================================================================
// RealtimeClient
// ============================================================================

/// Resilient client for one logical realtime connection.
///
/// Cheap to clone; clones share the same connection.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use realtime_transport::{
///     ClientCallbacks, ClientKind, ClientOptions, HeadlessEnvironment, Identity,
///     RealtimeClient, WebSocketProvider,
/// };
///
/// # async fn example() -> realtime_transport::Result<()> {
/// let client = RealtimeClient::new(
///     "chat",
///     ClientKind::Chat,
///     "ws://localhost:3000".parse()?,
///     ClientOptions::for_kind(ClientKind::Chat),
///     Arc::new(WebSocketProvider::new()),
///     Arc::new(HeadlessEnvironment::new()),
/// )?;
///
/// client.connect(
///     ClientCallbacks::new().on_message(|event, data| println!("{event}: {data}")),
///     Some(Identity::new("alice")),
/// )?;
///
/// let seq = client.emit_with_queue("sendMessage", serde_json::json!({ "text": "hi" }));
/// println!("queued as #{seq}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RealtimeClient {
    pub(crate) inner: Arc<ClientInner>,
}

impl fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("target", &self.inner.target.as_str())
            .field("state", &self.connection_state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// RealtimeClient - Constructor
// ============================================================================

impl RealtimeClient {
    /// Creates an idle client. No channel is opened until `connect`.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `options` fail validation
    /// - [`Error::Config`] if called outside a Tokio runtime
    pub fn new(
        id: impl Into<ClientId>,
        kind: ClientKind,
        target: Url,
        options: ClientOptions,
        provider: Arc<dyn ChannelProvider>,
        environment: Arc<dyn Environment>,
    ) -> Result<Self> {
        options.validate()?;

        let runtime = Handle::try_current()
            .map_err(|_| Error::config("RealtimeClient must be created inside a Tokio runtime"))?;

        let id = id.into();
        let dispatcher = NotificationDispatcher::new(Arc::clone(&environment), &options);

        debug!(client = %id, %kind, %target, "Client created");

        Ok(Self {
            inner: Arc::new(ClientInner {
                id,
                kind,
                target,
                options,
                provider,
                environment,
                dispatcher,
                runtime,
                state: Mutex::new(ClientState::default()),
            }),
        })
    }
}

// ============================================================================
// RealtimeClient - Public API
// ============================================================================

impl RealtimeClient {
    /// Connects, or refreshes an existing connection.
    ///
    /// - `Connected`: invokes `on_connect` again and re-authenticates if an
    ///   identity is supplied. No new channel.
    /// - `Connecting` / `Reconnecting`: logged no-op. `callbacks` and
    ///   `identity` are discarded and the attempt in flight keeps its own.
    /// - `Fallback`: refused until fallback mode is disabled.
    /// - `Disconnected`: opens the channel if needed and requests a connect,
    ///   arming the connection timeout.
    ///
    /// When `Connected` or `Disconnected`, `callbacks` replace any previously
    /// supplied set.
    ///
    /// # Errors
    ///
    /// - [`Error::FallbackActive`] while in fallback mode
    /// - The provider's error if the channel cannot be created
    pub fn connect(&self, callbacks: ClientCallbacks, identity: Option<Identity>) -> Result<()> {
        self.inner.connect(callbacks, identity)
    }

    /// Disconnects and returns to `Disconnected`.
    ///
    /// Cancels every timer, stops the heartbeat, asks the channel to close
    /// and forgets the identity. Queued messages are kept.
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }

    /// Sets the identity and sends it if connected.
    ///
    /// With no `token`, the environment's persisted token is used. When not
    /// connected the identity is held and sent on the next connect.
    ///
    /// # Errors
    ///
    /// Returns the channel error if the request could not be emitted.
    pub fn authenticate(&self, username: impl Into<String>, token: Option<String>) -> Result<()> {
        self.inner.authenticate(Identity {
            username: username.into(),
            token,
        })
    }

    /// Sends an application event now, or queues it until connected.
    ///
    /// Returns the sequence number stamped into the payload either way.
    pub fn emit_with_queue(&self, event: &str, payload: Value) -> SequenceNumber {
        self.inner.emit_with_queue(event, payload)
    }

    /// Returns `true` if connected and the channel agrees.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        let state = self.inner.state.lock();
        state.connection == ConnectionState::Connected
            && state
                .channel
                .as_ref()
                .is_some_and(|slot| slot.channel.is_connected())
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.inner.state.lock().connection
    }

    /// Tears down the channel and stays offline until disabled.
    pub fn enable_fallback_mode(&self) {
        self.inner.enable_fallback_mode();
    }

    /// Leaves fallback mode. The channel is recreated on the next `connect`.
    pub fn disable_fallback_mode(&self) {
        self.inner.disable_fallback_mode();
    }

    /// Returns `true` while in fallback mode.
    #[inline]
    #[must_use]
    pub fn is_fallback_mode(&self) -> bool {
        self.connection_state() == ConnectionState::Fallback
    }

    /// Runs notification handling for `data` with the current callbacks.
    pub fn process_notification(&self, data: &Value) -> Option<NotificationRecord> {
        let callbacks = self.inner.state.lock().callbacks.clone();
        self.inner.dispatcher.process_notification(data, &callbacks)
    }

    /// Reports that the user activated the alert tagged `tag`.
    ///
    /// Returns `false` if no such alert is outstanding.
    pub fn notification_clicked(&self, tag: &str) -> bool {
        let callbacks = self.inner.state.lock().callbacks.clone();
        self.inner.dispatcher.activate_alert(tag, &callbacks)
    }

    /// Asks the host for alert permission if needed. Returns the grant.
    pub fn request_notification_permission(&self) -> bool {
        self.inner.dispatcher.request_permission()
    }
}

// ============================================================================
// RealtimeClient - Accessors
// ============================================================================

impl RealtimeClient {
    /// Registry identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &ClientId {
        &self.inner.id
    }

    /// Client kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ClientKind {
        self.inner.kind
    }

    /// Channel target.
    #[inline]
    #[must_use]
    pub fn target(&self) -> &Url {
        &self.inner.target
    }

    /// Effective options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    /// Notification dispatcher used for inbound notification events.
    #[inline]
    #[must_use]
    pub fn notifications(&self) -> &NotificationDispatcher {
        &self.inner.dispatcher
    }

    /// Identity currently held.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.inner.state.lock().identity.clone()
    }

    /// Number of queued outbound messages.
    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Number of pending timers, counting a running heartbeat.
    #[must_use]
    pub fn active_timers(&self) -> usize {
        let state = self.inner.state.lock();
        usize::from(state.connect_timeout.as_ref().is_some_and(Timer::is_pending))
            + usize::from(state.reconnect_timer.as_ref().is_some_and(Timer::is_pending))
            + usize::from(state.heartbeat.as_ref().is_some_and(HeartbeatMonitor::is_active))
    }

    /// Returns `true` while a heartbeat monitor exists.
    #[must_use]
    pub fn has_heartbeat(&self) -> bool {
        self.inner.state.lock().heartbeat.is_some()
    }

    /// Round trip of the last acknowledged heartbeat.
    #[must_use]
    pub fn last_heartbeat_round_trip(&self) -> Option<Duration> {
        self.inner
            .state
            .lock()
            .heartbeat
            .as_ref()
            .and_then(HeartbeatMonitor::last_round_trip)
    }

    /// Number of channel instances created so far.
    #[must_use]
    pub fn channel_opens(&self) -> usize {
        self.inner.state.lock().opens
    }
}

// ============================================================================
// ClientInner - Caller Operations
// ============================================================================

impl ClientInner {
    fn connect(self: &Arc<Self>, callbacks: ClientCallbacks, identity: Option<Identity>) -> Result<()> {
        let mut state = self.state.lock();

        if state.connection == ConnectionState::Fallback {
            debug!(client = %self.id, "Fallback mode active, connect refused");
            return Err(Error::FallbackActive);
        }

        match state.connection {
            ConnectionState::Connected => {
                state.callbacks = callbacks;
                let refresh_identity = identity.is_some();
                if let Some(identity) = identity {
                    state.identity = Some(identity);
                }
                if refresh_identity && let Err(e) = self.send_authentication(&state) {
                    warn!(client = %self.id, error = %e, "Failed to send authentication");
                }
                let callbacks = state.callbacks.clone();
                drop(state);

                debug!(client = %self.id, "Already connected");
                callbacks.connected();
                Ok(())
            }

            ConnectionState::Connecting | ConnectionState::Reconnecting => {
                debug!(client = %self.id, state = %state.connection, "Connect already in progress");
                Ok(())
            }

            ConnectionState::Disconnected | ConnectionState::Fallback => {
                state.callbacks = callbacks;
                if let Some(identity) = identity {
                    state.identity = Some(identity);
                }
                self.begin_connect(&mut state)
            }
        }
    }

    fn disconnect(&self) {
        let mut state = self.state.lock();
        let previous = state.connection;

        state.connect_timeout = None;
        state.reconnect_timer = None;
        self.transition(&mut state, ConnectionState::Disconnected);

        if let Some(slot) = &state.channel
            && (previous != ConnectionState::Disconnected || slot.channel.is_connected())
        {
            slot.channel.disconnect();
        }

        state.identity = None;
        info!(client = %self.id, from = %previous, "Disconnected by caller");
    }

    fn authenticate(&self, identity: Identity) -> Result<()> {
        let mut state = self.state.lock();
        state.identity = Some(identity);

        if state.connection != ConnectionState::Connected {
            debug!(client = %self.id, "Authentication deferred until connected");
            return Ok(());
        }

        self.send_authentication(&state)
    }

    fn emit_with_queue(&self, event: &str, payload: Value) -> SequenceNumber {
        let mut state = self.state.lock();
        let message = state.queue.stamp(event, payload, now_millis());
        let sequence = message.sequence_number;

        if state.connection == ConnectionState::Connected
            && let Some(slot) = state.channel.as_ref()
            && slot.channel.is_connected()
        {
            match slot.channel.emit(&message.event_name, message.payload.clone()) {
                Ok(()) => {
                    trace!(client = %self.id, event, seq = %sequence, "Message sent");
                    return sequence;
                }
                Err(e) => {
                    debug!(client = %self.id, event, seq = %sequence, error = %e, "Send failed, queueing");
                }
            }
        }

        state.queue.push(message);
        trace!(client = %self.id, event, seq = %sequence, queued = state.queue.len(), "Message queued");
        sequence
    }

    fn enable_fallback_mode(&self) {
        let mut state = self.state.lock();
        if state.connection == ConnectionState::Fallback {
            return;
        }

        state.connect_timeout = None;
        state.reconnect_timer = None;
        state.heartbeat = None;

        if let Some(slot) = state.channel.take() {
            slot.channel.disconnect();
        }

        self.transition(&mut state, ConnectionState::Fallback);
        info!(client = %self.id, "Fallback mode enabled");
    }

    fn disable_fallback_mode(&self) {
        let mut state = self.state.lock();
        if state.connection != ConnectionState::Fallback {
            return;
        }

        self.transition(&mut state, ConnectionState::Disconnected);
        info!(client = %self.id, "Fallback mode disabled");
    }
}

// ============================================================================
// ClientInner - Transitions
// ============================================================================

impl ClientInner {
    /// Sets the state. Leaving `Connected` always drops the heartbeat.
    fn transition(&self, state: &mut ClientState, next: ConnectionState) {
        let previous = state.connection;
        if next != ConnectionState::Connected {
            state.heartbeat = None;
        }
        if previous == next {
            return;
        }

        state.connection = next;
        debug!(client = %self.id, from = %previous, to = %next, "State transition");
    }

    /// Opens the channel if needed, enters `Connecting` and requests a connect.
    fn begin_connect(self: &Arc<Self>, state: &mut ClientState) -> Result<()> {
        let channel = self.ensure_channel(state)?;

        self.transition(state, ConnectionState::Connecting);
        self.arm_connect_timeout(state);
        channel.connect();

        debug!(client = %self.id, target = %self.target, "Connect requested");
        Ok(())
    }

    /// Returns the channel, creating it and its event pump on first use.
    fn ensure_channel(self: &Arc<Self>, state: &mut ClientState) -> Result<Arc<dyn DuplexChannel>> {
        if let Some(slot) = &state.channel {
            return Ok(Arc::clone(&slot.channel));
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let channel = self.provider.open(&self.target, events_tx)?;

        let generation = state.generation.next();
        state.generation = generation;
        state.opens += 1;

        let pump = self.spawn_pump(generation, events_rx);
        state.channel = Some(ChannelSlot {
            channel: Arc::clone(&channel),
            generation,
            pump,
        });

        info!(client = %self.id, generation = generation.as_u64(), "Channel created");
        Ok(channel)
    }

    /// Drains channel events into the state machine.
    fn spawn_pump(self: &Arc<Self>, generation: ChannelGeneration, mut events: EventReceiver) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.runtime.spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                inner.handle_channel_event(generation, event);
            }
        })
    }

    fn arm_connect_timeout(self: &Arc<Self>, state: &mut ClientState) {
        let weak = Arc::downgrade(self);
        state.connect_timeout = Some(Timer::spawn(
            &self.runtime,
            self.options.connection_timeout,
            move |token| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_connect_timeout(token);
                }
            },
        ));
    }

    fn schedule_reconnect(self: &Arc<Self>, state: &mut ClientState) {
        let weak = Arc::downgrade(self);
        state.reconnect_timer = Some(Timer::spawn(
            &self.runtime,
            self.options.reconnect_delay,
            move |token| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_reconnect_timer(token);
                }
            },
        ));

        debug!(
            client = %self.id,
            delay_ms = self.options.reconnect_delay.as_millis() as u64,
            "Reconnect scheduled"
        );
    }

    fn on_connect_timeout(&self, token: u64) {
        let mut state = self.state.lock();
        if state.connect_timeout.as_ref().map(Timer::token) != Some(token) {
            return;
        }
        state.connect_timeout = None;

        if state.connection == ConnectionState::Connected {
            return;
        }

        let callbacks = state.callbacks.clone();
        drop(state);

        let timeout_ms = self.options.connection_timeout.as_millis() as u64;
        warn!(client = %self.id, timeout_ms, "Connection timeout");
        callbacks.connect_error(&Error::connection_timeout(timeout_ms));
    }

    fn on_reconnect_timer(self: &Arc<Self>, token: u64) {
        let mut state = self.state.lock();
        if state.reconnect_timer.as_ref().map(Timer::token) != Some(token) {
            return;
        }
        state.reconnect_timer = None;

        if state.connection != ConnectionState::Reconnecting {
            trace!(client = %self.id, state = %state.connection, "Reconnect no longer needed");
            return;
        }

        info!(client = %self.id, "Reconnecting");
        if let Err(e) = self.begin_connect(&mut state) {
            self.schedule_reconnect(&mut state);
            let callbacks = state.callbacks.clone();
            drop(state);

            warn!(client = %self.id, error = %e, "Reconnect attempt could not start");
            callbacks.connect_error(&e);
        }
    }
}

// ============================================================================
// ClientInner - Channel Events
// ============================================================================

impl ClientInner {
    fn handle_channel_event(self: &Arc<Self>, generation: ChannelGeneration, event: ChannelEvent) {
        let state = self.state.lock();
        if state.channel.as_ref().map(|slot| slot.generation) != Some(generation) {
            trace!(client = %self.id, "Event from retired channel ignored");
            return;
        }

        match event {
            ChannelEvent::Connected => self.on_channel_connected(state),
            ChannelEvent::ConnectError { message } => self.on_channel_connect_error(state, message),
            ChannelEvent::Disconnected { reason } => self.on_channel_disconnected(state, reason),
            ChannelEvent::Message { event, data } => self.on_channel_message(state, event, data),
        }
    }

    fn on_channel_connected(&self, mut state: StateGuard<'_>) {
        match state.connection {
            ConnectionState::Connecting | ConnectionState::Reconnecting => {}
            ConnectionState::Connected => return,
            ConnectionState::Disconnected | ConnectionState::Fallback => {
                debug!(client = %self.id, "Channel connected while idle, closing it");
                if let Some(slot) = &state.channel {
                    slot.channel.disconnect();
                }
                return;
            }
        }

        let Some(channel) = state.channel.as_ref().map(|slot| Arc::clone(&slot.channel)) else {
            return;
        };

        state.connect_timeout = None;
        state.reconnect_timer = None;
        self.transition(&mut state, ConnectionState::Connected);

        state.heartbeat = Some(HeartbeatMonitor::start(
            &self.runtime,
            Arc::clone(&channel),
            self.options.heartbeat_interval,
        ));

        if let Err(e) = self.send_authentication(&state) {
            warn!(client = %self.id, error = %e, "Failed to send authentication");
        }

        let lost = self.flush_queue(&mut state, channel.as_ref());
        let callbacks = state.callbacks.clone();
        drop(state);

        info!(client = %self.id, target = %self.target, "Connected");
        callbacks.connected();
        if !lost.is_empty() {
            callbacks.message_lost(&lost);
        }
    }

    fn on_channel_connect_error(self: &Arc<Self>, mut state: StateGuard<'_>, message: String) {
        match state.connection {
            ConnectionState::Connecting => {
                state.connect_timeout = None;
                self.transition(&mut state, ConnectionState::Reconnecting);
                self.schedule_reconnect(&mut state);
            }
            // The channel is still retrying on its own.
            ConnectionState::Reconnecting => {}
            _ => {
                trace!(client = %self.id, state = %state.connection, "Stale connect error ignored");
                return;
            }
        }

        let callbacks = state.callbacks.clone();
        drop(state);

        let error = Error::connection(message);
        warn!(client = %self.id, error = %error, "Connect error");
        callbacks.connect_error(&error);
    }

    fn on_channel_disconnected(self: &Arc<Self>, mut state: StateGuard<'_>, reason: DisconnectReason) {
        let previous = state.connection;
        if !matches!(previous, ConnectionState::Connected | ConnectionState::Connecting) {
            trace!(client = %self.id, state = %previous, %reason, "Disconnect ignored");
            return;
        }

        // Channels only report ClientRequested for a close this client asked
        // for, and every such close leaves `Connecting`. Seeing one here means
        // it belongs to the session before a new `connect`.
        if previous == ConnectionState::Connecting && reason == DisconnectReason::ClientRequested {
            trace!(client = %self.id, "Stale close from previous session ignored");
            return;
        }

        state.connect_timeout = None;
        if reason.is_intentional() {
            self.transition(&mut state, ConnectionState::Disconnected);
        } else {
            self.transition(&mut state, ConnectionState::Reconnecting);
            self.schedule_reconnect(&mut state);
        }

        let callbacks = state.callbacks.clone();
        drop(state);

        if reason.is_intentional() {
            info!(client = %self.id, %reason, "Channel closed");
        } else {
            warn!(client = %self.id, %reason, "Channel dropped");
        }
        callbacks.disconnected(&reason);
    }

    fn on_channel_message(&self, state: StateGuard<'_>, event: String, data: Value) {
        match event.as_str() {
            AUTHENTICATED => self.on_authenticated(state, data),

            HEARTBEAT_ACK => {
                if let Some(heartbeat) = &state.heartbeat {
                    heartbeat.record_ack(now_millis());
                }
            }

            _ => {
                let callbacks = state.callbacks.clone();
                drop(state);

                trace!(client = %self.id, event = %event, "Message received");
                callbacks.message(&event, &data);

                if self.options.is_notification_event(&event) {
                    self.dispatcher.process_notification(&data, &callbacks);
                }
            }
        }
    }

    fn on_authenticated(&self, mut state: StateGuard<'_>, data: Value) {
        match AuthOutcome::from_event(&data) {
            AuthOutcome::Accepted { username } => {
                let confirmed = match (username, state.identity.as_mut()) {
                    (Some(name), Some(identity)) => {
                        identity.username.clone_from(&name);
                        name
                    }
                    (Some(name), None) => name,
                    (None, Some(identity)) => identity.username.clone(),
                    (None, None) => String::new(),
                };
                let callbacks = state.callbacks.clone();
                drop(state);

                info!(client = %self.id, username = %confirmed, "Authenticated");
                callbacks.authenticated(&confirmed);
            }

            AuthOutcome::Rejected { reason } => {
                let callbacks = state.callbacks.clone();
                drop(state);

                let error = Error::authentication(reason);
                warn!(client = %self.id, error = %error, "Authentication rejected");
                callbacks.authentication_failed(&data);
            }
        }
    }
}

// ============================================================================
// ClientInner - Outbound
// ============================================================================

impl ClientInner {
    /// Emits the held identity, if any.
    fn send_authentication(&self, state: &ClientState) -> Result<()> {
        let Some(identity) = state.identity.as_ref() else {
            return Ok(());
        };
        let slot = state.channel.as_ref().ok_or(Error::NotConnected)?;

        let request = identity.to_request(self.environment.as_ref());
        let has_token = request.token.is_some();
        let username = request.username.clone();

        slot.channel.emit(AUTHENTICATE, to_value(request)?)?;

        debug!(client = %self.id, %username, has_token, "Authentication sent");
        Ok(())
    }

    /// Sends everything queued before this call, in order.
    ///
    /// Returns the entries that were removed but could not be sent.
    fn flush_queue(&self, state: &mut ClientState, channel: &dyn DuplexChannel) -> Vec<QueuedMessage> {
        let pending = state.queue.take_all();
        if pending.is_empty() {
            return Vec::new();
        }

        for (index, message) in pending.iter().enumerate() {
            if let Err(e) = channel.emit(&message.event_name, message.payload.clone()) {
                let lost = pending[index..].to_vec();
                warn!(
                    client = %self.id,
                    sent = index,
                    lost = lost.len(),
                    error = %e,
                    "Flush interrupted, remaining messages dropped"
                );
                return lost;
            }
        }

        debug!(client = %self.id, count = pending.len(), "Queue flushed");
        Vec::new()
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if let Some(slot) = &self.state.get_mut().channel
            && slot.channel.is_connected()
        {
            slot.channel.disconnect();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
