//! Heartbeat monitor.
//!
//! While the client is connected, a repeating task emits `heartbeat` with the
//! current timestamp every interval. The task stops on its own as soon as the
//! channel reports itself disconnected; the client also drops the monitor on
//! every transition away from `Connected`.
//!
//! Acknowledgements are recorded for diagnostics only. Dead connections are
//! detected by the channel's own disconnect event, not by missing acks.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use serde_json::to_value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::{debug, trace};

use crate::protocol::HeartbeatPayload;
use crate::protocol::frame::HEARTBEAT;
use crate::transport::DuplexChannel;

use super::now_millis;

// ============================================================================
// Constants
// ============================================================================

/// Sentinel for "no timestamp recorded".
const UNSET: i64 = -1;

// ============================================================================
// HeartbeatStats
// ============================================================================

/// Timestamps shared between the monitor and its task.
#[derive(Debug)]
struct HeartbeatStats {
    last_sent_at: AtomicI64,
    last_ack_at: AtomicI64,
    round_trip_ms: AtomicI64,
}

impl Default for HeartbeatStats {
    fn default() -> Self {
        Self {
            last_sent_at: AtomicI64::new(UNSET),
            last_ack_at: AtomicI64::new(UNSET),
            round_trip_ms: AtomicI64::new(UNSET),
        }
    }
}

fn load(value: &AtomicI64) -> Option<i64> {
    let raw = value.load(Ordering::Acquire);
    (raw != UNSET).then_some(raw)
}

// ============================================================================
// HeartbeatMonitor
// ============================================================================

/// Periodic liveness ping. Dropping the monitor stops it.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    task: JoinHandle<()>,
    stats: Arc<HeartbeatStats>,
}

impl HeartbeatMonitor {
    /// Starts pinging `channel` every `interval`. The first ping goes out
    /// one interval after start.
    pub(crate) fn start(
        runtime: &Handle,
        channel: Arc<dyn DuplexChannel>,
        interval: Duration,
    ) -> Self {
        let stats = Arc::new(HeartbeatStats::default());
        let task_stats = Arc::clone(&stats);

        let task = runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            loop {
                ticker.tick().await;

                if !channel.is_connected() {
                    debug!("Channel disconnected, heartbeat stopping");
                    break;
                }

                let timestamp = now_millis();
                let payload = match to_value(HeartbeatPayload { timestamp }) {
                    Ok(payload) => payload,
                    Err(e) => {
                        debug!(error = %e, "Failed to encode heartbeat");
                        break;
                    }
                };

                if let Err(e) = channel.emit(HEARTBEAT, payload) {
                    debug!(error = %e, "Heartbeat emit failed, heartbeat stopping");
                    break;
                }

                task_stats.last_sent_at.store(timestamp, Ordering::Release);
                trace!(timestamp, "Heartbeat sent");
            }
        });

        debug!(interval_ms = interval.as_millis() as u64, "Heartbeat started");

        Self { task, stats }
    }

    /// Returns `true` while the ping task is running.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// Milliseconds since the Unix epoch of the last ping sent.
    #[inline]
    #[must_use]
    pub fn last_sent_at_millis(&self) -> Option<i64> {
        load(&self.stats.last_sent_at)
    }

    /// Milliseconds since the Unix epoch of the last acknowledgement.
    #[inline]
    #[must_use]
    pub fn last_ack_at_millis(&self) -> Option<i64> {
        load(&self.stats.last_ack_at)
    }

    /// Time between the last ping and the acknowledgement that followed it.
    #[must_use]
    pub fn last_round_trip(&self) -> Option<Duration> {
        load(&self.stats.round_trip_ms).map(|ms| Duration::from_millis(ms.max(0) as u64))
    }

    /// Records an acknowledgement received at `now`.
    pub(crate) fn record_ack(&self, now: i64) {
        self.stats.last_ack_at.store(now, Ordering::Release);
        if let Some(sent) = self.last_sent_at_millis() {
            let round_trip = now - sent;
            self.stats.round_trip_ms.store(round_trip, Ordering::Release);
            trace!(round_trip_ms = round_trip, "Heartbeat acknowledged");
        }
    }
}

impl Drop for HeartbeatMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ============================================================================
// Tests
// ============================================================================
