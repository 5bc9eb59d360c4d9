//! In-memory channel for unit tests.
//!
//! [`RecordingProvider`] hands out channels that never touch the network.
//! Tests drive the lifecycle by injecting events and inspect everything the
//! client asked the channel to do.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{ChannelEvent, DisconnectReason};

use super::channel::{ChannelProvider, DuplexChannel, EventSender};

/// Everything observed by the recording channels.
#[derive(Default)]
pub(crate) struct Recorded {
    pub opens: usize,
    pub senders: Vec<EventSender>,
    pub emits: Vec<(String, Value)>,
    pub connect_calls: usize,
    pub disconnect_calls: usize,
    pub connected: bool,
    /// Emits start failing once this many have succeeded.
    pub fail_emits_after: Option<usize>,
}

#[derive(Clone, Default)]
pub(crate) struct RecordingProvider {
    shared: Arc<Mutex<Recorded>>,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opens(&self) -> usize {
        self.shared.lock().opens
    }

    pub fn connect_calls(&self) -> usize {
        self.shared.lock().connect_calls
    }

    pub fn disconnect_calls(&self) -> usize {
        self.shared.lock().disconnect_calls
    }

    pub fn emits(&self) -> Vec<(String, Value)> {
        self.shared.lock().emits.clone()
    }

    pub fn emits_named(&self, event: &str) -> Vec<Value> {
        self.shared
            .lock()
            .emits
            .iter()
            .filter(|(name, _)| name == event)
            .map(|(_, data)| data.clone())
            .collect()
    }

    pub fn clear_emits(&self) {
        self.shared.lock().emits.clear();
    }

    pub fn fail_emits_after(&self, count: usize) {
        self.shared.lock().fail_emits_after = Some(count);
    }

    pub fn is_connected(&self) -> bool {
        self.shared.lock().connected
    }

    /// Marks the latest channel connected and reports it.
    pub fn accept(&self) {
        let mut shared = self.shared.lock();
        shared.connected = true;
        Self::send(&shared, ChannelEvent::Connected);
    }

    /// Reports a failed connect attempt.
    pub fn refuse(&self, message: &str) {
        let shared = self.shared.lock();
        Self::send(&shared, ChannelEvent::connect_error(message));
    }

    /// Drops the latest channel with `reason`.
    pub fn drop_connection(&self, reason: DisconnectReason) {
        let mut shared = self.shared.lock();
        shared.connected = false;
        Self::send(&shared, ChannelEvent::disconnected(reason));
    }

    /// Delivers an inbound frame on the latest channel.
    pub fn push(&self, event: &str, data: Value) {
        let shared = self.shared.lock();
        Self::send(&shared, ChannelEvent::message(event, data));
    }

    fn send(shared: &Recorded, event: ChannelEvent) {
        if let Some(sender) = shared.senders.last() {
            let _ = sender.send(event);
        }
    }
}

impl ChannelProvider for RecordingProvider {
    fn open(&self, _target: &Url, events: EventSender) -> Result<Arc<dyn DuplexChannel>> {
        let mut shared = self.shared.lock();
        shared.opens += 1;
        shared.senders.push(events);
        Ok(Arc::new(RecordingChannel {
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct RecordingChannel {
    shared: Arc<Mutex<Recorded>>,
}

impl DuplexChannel for RecordingChannel {
    fn connect(&self) {
        self.shared.lock().connect_calls += 1;
    }

    fn disconnect(&self) {
        let mut shared = self.shared.lock();
        shared.disconnect_calls += 1;
        if shared.connected {
            shared.connected = false;
            RecordingProvider::send(
                &shared,
                ChannelEvent::disconnected(DisconnectReason::ClientRequested),
            );
        }
    }

    fn emit(&self, event: &str, data: Value) -> Result<()> {
        let mut shared = self.shared.lock();
        if !shared.connected {
            return Err(Error::NotConnected);
        }
        if shared
            .fail_emits_after
            .is_some_and(|limit| shared.emits.len() >= limit)
        {
            shared.connected = false;
            return Err(Error::ConnectionClosed);
        }
        shared.emits.push((event.to_string(), data));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.shared.lock().connected
    }
}
