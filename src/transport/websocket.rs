//! WebSocket duplex channel.
//!
//! Carries [`Frame`]s as JSON text messages over `tokio-tungstenite`.
//!
//! # Event Loop
//!
//! `connect` spawns one task per connection that:
//!
//! - Dials the target, retrying up to `max_attempts` times with a fixed delay
//! - Reports each failed attempt as `ConnectError`
//! - Forwards inbound text frames as `Message` events
//! - Writes outbound frames queued by `emit`
//! - Reports the final `Disconnected` reason when the loop ends
//!
//! `disconnect` retires the running loop at once and reports
//! `ClientRequested` itself, so a `connect` issued right after it starts a
//! fresh loop. A retired loop finishes its close quietly.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, to_string};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{ChannelEvent, DisconnectReason, Frame};

use super::channel::{ChannelProvider, DuplexChannel, EventSender};

// ============================================================================
// Constants
// ============================================================================

/// Default number of dial attempts per `connect` request.
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay between dial attempts.
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Internal commands for the event loop.
enum ChannelCommand {
    /// Write a serialized frame.
    Send(String),
    /// Close the connection.
    Close,
}

// ============================================================================
// WebSocketProvider
// ============================================================================

/// Opens [`WebSocketChannel`]s for `ws://` and `wss://` targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebSocketProvider {
    /// Dial attempts per connect request.
    pub max_attempts: u32,

    /// Delay between dial attempts.
    pub retry_delay: Duration,
}

impl Default for WebSocketProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSocketProvider {
    /// Creates a provider with the default retry policy.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Sets the number of dial attempts per connect request.
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the delay between dial attempts.
    #[inline]
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}

impl ChannelProvider for WebSocketProvider {
    fn open(&self, target: &Url, events: EventSender) -> Result<Arc<dyn DuplexChannel>> {
        if !matches!(target.scheme(), "ws" | "wss") {
            return Err(Error::config(format!(
                "WebSocket target must use ws:// or wss://, got: {target}"
            )));
        }

        let runtime = Handle::try_current()
            .map_err(|_| Error::config("WebSocket channel requires a Tokio runtime"))?;

        debug!(%target, "WebSocket channel opened");

        Ok(Arc::new(WebSocketChannel {
            target: target.clone(),
            policy: *self,
            events,
            runtime,
            link: Arc::new(Mutex::new(Link::default())),
        }))
    }
}

// ============================================================================
// Link
// ============================================================================

/// Connection bookkeeping shared between a channel and its event loop.
#[derive(Default)]
struct Link {
    /// Bumped by every `connect` and `disconnect`. A loop whose epoch no
    /// longer matches is stale and reports nothing.
    epoch: u64,
    /// Set from `connect` until the loop ends or is retired.
    active: bool,
    /// Set while the socket is open.
    connected: bool,
    /// Command channel into the current event loop.
    command_tx: Option<mpsc::UnboundedSender<ChannelCommand>>,
    /// Current event loop task.
    task: Option<JoinHandle<()>>,
}

/// One event loop's view of the link.
struct Session {
    link: Arc<Mutex<Link>>,
    events: EventSender,
    epoch: u64,
}

impl Session {
    /// Forwards `event` unless this loop has been retired.
    fn report(&self, event: ChannelEvent) -> bool {
        let link = self.link.lock();
        if link.epoch != self.epoch {
            return false;
        }
        let _ = self.events.send(event);
        true
    }

    /// Marks the socket open and reports `Connected`.
    fn opened(&self) -> bool {
        let mut link = self.link.lock();
        if link.epoch != self.epoch {
            return false;
        }
        link.connected = true;
        let _ = self.events.send(ChannelEvent::Connected);
        true
    }

    /// Releases the link and reports the final reason.
    fn closed(&self, reason: DisconnectReason) {
        let mut link = self.link.lock();
        if link.epoch != self.epoch {
            trace!(%reason, "Retired event loop ended");
            return;
        }
        link.connected = false;
        link.active = false;
        link.command_tx = None;
        let _ = self.events.send(ChannelEvent::disconnected(reason));
    }

    /// Releases the link after the dial attempts ran out.
    fn exhausted(&self) {
        let mut link = self.link.lock();
        if link.epoch == self.epoch {
            link.active = false;
            link.command_tx = None;
        }
    }
}

// ============================================================================
// WebSocketChannel
// ============================================================================

/// WebSocket implementation of [`DuplexChannel`].
pub struct WebSocketChannel {
    /// Dial target.
    target: Url,
    /// Dial retry policy.
    policy: WebSocketProvider,
    /// Bound event sender.
    events: EventSender,
    /// Runtime the event loop is spawned on.
    runtime: Handle,
    /// State shared with the current event loop.
    link: Arc<Mutex<Link>>,
}

impl fmt::Debug for WebSocketChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketChannel")
            .field("target", &self.target.as_str())
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl DuplexChannel for WebSocketChannel {
    fn connect(&self) {
        let mut link = self.link.lock();
        if link.active {
            trace!(target = %self.target, "Connect ignored, event loop already running");
            return;
        }

        link.epoch += 1;
        link.active = true;
        link.connected = false;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        link.command_tx = Some(command_tx);

        let session = Session {
            link: Arc::clone(&self.link),
            events: self.events.clone(),
            epoch: link.epoch,
        };

        link.task = Some(self.runtime.spawn(Self::run(
            self.target.clone(),
            self.policy,
            session,
            command_rx,
        )));
    }

    fn disconnect(&self) {
        let mut link = self.link.lock();

        // Retire the running loop so a following `connect` starts fresh.
        link.epoch += 1;
        link.active = false;
        let was_connected = std::mem::take(&mut link.connected);
        let command_tx = link.command_tx.take();
        let task = link.task.take();

        if was_connected {
            if let Some(tx) = command_tx {
                let _ = tx.send(ChannelCommand::Close);
            }
            let _ = self
                .events
                .send(ChannelEvent::disconnected(DisconnectReason::ClientRequested));
            debug!(target = %self.target, "WebSocket close requested");
            return;
        }

        // Still dialing: stop the attempts outright.
        if let Some(handle) = task {
            handle.abort();
            debug!(target = %self.target, "Pending dial cancelled");
        }
    }

    fn emit(&self, event: &str, data: Value) -> Result<()> {
        let link = self.link.lock();
        if !link.connected {
            return Err(Error::NotConnected);
        }

        let json = to_string(&Frame::new(event, data))?;

        link.command_tx
            .as_ref()
            .ok_or(Error::NotConnected)?
            .send(ChannelCommand::Send(json))
            .map_err(|_| Error::ConnectionClosed)
    }

    #[inline]
    fn is_connected(&self) -> bool {
        self.link.lock().connected
    }
}

impl WebSocketChannel {
    /// Dials, runs the event loop, and reports the outcome.
    async fn run(
        target: Url,
        policy: WebSocketProvider,
        session: Session,
        command_rx: mpsc::UnboundedReceiver<ChannelCommand>,
    ) {
        let Some(mut ws_stream) = Self::establish(&target, policy, &session).await else {
            session.exhausted();
            return;
        };

        if !session.opened() {
            debug!(%target, "Dial finished after disconnect, closing");
            let _ = ws_stream.close(None).await;
            return;
        }
        info!(%target, "WebSocket connected");

        let reason = Self::run_event_loop(ws_stream, command_rx, &session).await;

        debug!(%target, %reason, "WebSocket event loop terminated");
        session.closed(reason);
    }

    /// Dials the target within the retry policy.
    async fn establish(
        target: &Url,
        policy: WebSocketProvider,
        session: &Session,
    ) -> Option<WsStream> {
        for attempt in 1..=policy.max_attempts {
            match dial(target).await {
                Ok(ws_stream) => return Some(ws_stream),
                Err(e) => {
                    warn!(%target, attempt, max = policy.max_attempts, error = %e, "WebSocket dial failed");
                    let reported = session.report(ChannelEvent::connect_error(format!(
                        "attempt {attempt}/{}: {e}",
                        policy.max_attempts
                    )));
                    if !reported {
                        return None;
                    }
                }
            }

            if attempt < policy.max_attempts {
                sleep(policy.retry_delay).await;
            }
        }

        error!(%target, "WebSocket dial attempts exhausted");
        None
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        ws_stream: WsStream,
        mut command_rx: mpsc::UnboundedReceiver<ChannelCommand>,
        session: &Session,
    ) -> DisconnectReason {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            match Frame::decode(&text) {
                                Ok(frame) => {
                                    session.report(frame.into());
                                }
                                Err(e) => warn!(error = %e, "Inbound frame dropped"),
                            }
                        }

                        // Only a normal close is a deliberate server disconnect.
                        Some(Ok(Message::Close(frame))) => {
                            let code = frame.as_ref().map(|f| f.code);
                            debug!(?code, "WebSocket closed by remote");
                            return match code {
                                Some(CloseCode::Normal) => DisconnectReason::ServerRequested,
                                _ => DisconnectReason::TransportClose,
                            };
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            return DisconnectReason::TransportError;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            return DisconnectReason::TransportClose;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                command = command_rx.recv() => {
                    match command {
                        Some(ChannelCommand::Send(json)) => {
                            if let Err(e) = ws_write.send(Message::Text(json.into())).await {
                                warn!(error = %e, "Failed to write frame");
                                return DisconnectReason::TransportError;
                            }
                        }

                        Some(ChannelCommand::Close) | None => {
                            let _ = ws_write.close().await;
                            return DisconnectReason::ClientRequested;
                        }
                    }
                }
            }
        }
    }
}

impl Drop for WebSocketChannel {
    fn drop(&mut self) {
        if let Some(handle) = self.link.lock().task.take() {
            handle.abort();
        }
    }
}

/// Opens one WebSocket connection to `target`.
async fn dial(target: &Url) -> Result<WsStream> {
    let (ws_stream, _) = connect_async(target.as_str()).await?;
    Ok(ws_stream)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;

    #[test]
    fn test_default_policy() {
        let provider = WebSocketProvider::default();
        assert_eq!(provider.max_attempts, 5);
        assert_eq!(provider.retry_delay, Duration::from_millis(1000));
    }

    #[test]
    fn test_max_attempts_is_at_least_one() {
        let provider = WebSocketProvider::new().with_max_attempts(0);
        assert_eq!(provider.max_attempts, 1);
    }

    #[tokio::test]
    async fn test_open_rejects_http_target() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let target = Url::parse("http://localhost:3000").unwrap();
        let result = WebSocketProvider::new().open(&target, tx);
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_emit_before_connect_fails() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let target = Url::parse("ws://127.0.0.1:9").unwrap();
        let channel = WebSocketProvider::new().open(&target, tx).unwrap();
        assert!(!channel.is_connected());
        assert!(matches!(
            channel.emit("sendMessage", Value::Null),
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_round_trip_against_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // Echo server: answers every frame with `echo`, then closes on request.
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            while let Some(Ok(Message::Text(text))) = ws.next().await {
                let frame = Frame::decode(&text).unwrap();
                let reply = to_string(&Frame::new("echo", frame.data)).unwrap();
                ws.send(Message::Text(reply.into())).await.unwrap();
            }
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let target = Url::parse(&format!("ws://127.0.0.1:{port}")).unwrap();
        let channel = WebSocketProvider::new().open(&target, tx).unwrap();

        channel.connect();
        assert_eq!(rx.recv().await, Some(ChannelEvent::Connected));
        assert!(channel.is_connected());

        channel
            .emit("sendMessage", serde_json::json!({ "text": "hi" }))
            .unwrap();
        assert_eq!(
            rx.recv().await,
            Some(ChannelEvent::message(
                "echo",
                serde_json::json!({ "text": "hi" })
            ))
        );

        channel.disconnect();
        assert_eq!(
            rx.recv().await,
            Some(ChannelEvent::disconnected(DisconnectReason::ClientRequested))
        );
        assert!(!channel.is_connected());
    }

    #[tokio::test]
    async fn test_server_going_away_is_not_intentional() {
        use tokio_tungstenite::tungstenite::protocol::CloseFrame;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // First connection goes away, the second one stays open.
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let _ = ws
                .close(Some(CloseFrame {
                    code: CloseCode::Away,
                    reason: "restart".into(),
                }))
                .await;
            while ws.next().await.is_some() {}

            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            while ws.next().await.is_some() {}
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let target = Url::parse(&format!("ws://127.0.0.1:{port}")).unwrap();
        let channel = WebSocketProvider::new().open(&target, tx).unwrap();

        channel.connect();
        assert_eq!(rx.recv().await, Some(ChannelEvent::Connected));
        assert_eq!(
            rx.recv().await,
            Some(ChannelEvent::disconnected(DisconnectReason::TransportClose))
        );
        assert!(!channel.is_connected());

        // The ended loop no longer blocks a new connect.
        channel.connect();
        assert_eq!(rx.recv().await, Some(ChannelEvent::Connected));
        assert!(channel.is_connected());
    }

    #[tokio::test]
    async fn test_connect_right_after_disconnect_opens_new_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // Echo server accepting any number of connections.
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                        return;
                    };
                    while let Some(Ok(Message::Text(text))) = ws.next().await {
                        let frame = Frame::decode(&text).unwrap();
                        let reply = to_string(&Frame::new("echo", frame.data)).unwrap();
                        if ws.send(Message::Text(reply.into())).await.is_err() {
                            return;
                        }
                    }
                });
            }
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let target = Url::parse(&format!("ws://127.0.0.1:{port}")).unwrap();
        let channel = WebSocketProvider::new().open(&target, tx).unwrap();

        channel.connect();
        assert_eq!(rx.recv().await, Some(ChannelEvent::Connected));

        channel.disconnect();
        channel.connect();

        assert_eq!(
            rx.recv().await,
            Some(ChannelEvent::disconnected(DisconnectReason::ClientRequested))
        );
        // The retired loop reports nothing more; the next event is the new socket.
        assert_eq!(rx.recv().await, Some(ChannelEvent::Connected));
        assert!(channel.is_connected());

        channel
            .emit("sendMessage", serde_json::json!({ "text": "again" }))
            .unwrap();
        assert_eq!(
            rx.recv().await,
            Some(ChannelEvent::message(
                "echo",
                serde_json::json!({ "text": "again" })
            ))
        );
    }

    #[tokio::test]
    async fn test_dial_error_is_websocket_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let target = Url::parse(&format!("ws://127.0.0.1:{port}")).unwrap();
        let Err(err) = dial(&target).await else {
            panic!("dial to a closed port succeeded");
        };
        assert!(matches!(err, Error::WebSocket(_)));
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_dial_failure_reports_each_attempt() {
        // Bind then drop to get a port nobody listens on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let target = Url::parse(&format!("ws://127.0.0.1:{port}")).unwrap();
        let provider = WebSocketProvider::new()
            .with_max_attempts(2)
            .with_retry_delay(Duration::from_millis(10));
        let channel = provider.open(&target, tx).unwrap();

        channel.connect();
        for _ in 0..2 {
            assert!(matches!(
                rx.recv().await,
                Some(ChannelEvent::ConnectError { .. })
            ));
        }
        assert!(!channel.is_connected());
    }
}
