//! Notification dispatcher.
//!
//! Decides what an inbound notification event turns into:
//!
//! 1. Events from a system sender are logged and dropped.
//! 2. Every other event becomes an in-app notification, with no deduplication.
//! 3. A platform alert is raised only when the application is in the
//!    background, alerts are supported, permission is granted, and the
//!    dedupe key has not been raised recently.
//! 4. Clicking a raised alert focuses the application, dismisses the alert
//!    and hands the original event data to the click hook.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::client::{ClientCallbacks, ClientOptions};

use super::environment::{Alert, Environment};
use super::record::NotificationRecord;

// ============================================================================
// DedupeHistory
// ============================================================================

/// Bounded FIFO set of recently raised alert keys.
#[derive(Debug)]
struct DedupeHistory {
    order: VecDeque<String>,
    seen: FxHashSet<String>,
    capacity: usize,
}

impl DedupeHistory {
    fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity),
            seen: FxHashSet::default(),
            capacity,
        }
    }

    /// Inserts `key`. Returns `false` if it was already present, and the
    /// evicted key if the history was full.
    fn insert(&mut self, key: &str) -> (bool, Option<String>) {
        if self.seen.contains(key) {
            return (false, None);
        }

        let evicted = if self.order.len() >= self.capacity {
            self.order.pop_front().inspect(|old| {
                self.seen.remove(old);
            })
        } else {
            None
        };

        self.order.push_back(key.to_string());
        self.seen.insert(key.to_string());
        (true, evicted)
    }

    fn remove(&mut self, key: &str) {
        if self.seen.remove(key) {
            self.order.retain(|k| k != key);
        }
    }
}

// ============================================================================
// NotificationDispatcher
// ============================================================================

/// Routes notification events to in-app hooks and platform alerts.
pub struct NotificationDispatcher {
    /// Host capabilities.
    environment: Arc<dyn Environment>,
    /// Senders whose events are log-only.
    system_senders: Vec<String>,
    /// Preview length in characters.
    preview_length: usize,
    /// Recently raised alert keys.
    history: Mutex<DedupeHistory>,
    /// Event data of alerts still on screen, by tag.
    raised: Mutex<FxHashMap<String, Value>>,
}

impl fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("system_senders", &self.system_senders)
            .field("raised", &self.raised.lock().len())
            .finish_non_exhaustive()
    }
}

impl NotificationDispatcher {
    /// Creates a dispatcher configured from client options.
    #[must_use]
    pub fn new(environment: Arc<dyn Environment>, options: &ClientOptions) -> Self {
        Self {
            environment,
            system_senders: options.system_senders.clone(),
            preview_length: options.preview_length,
            history: Mutex::new(DedupeHistory::new(options.dedupe_capacity.max(1))),
            raised: Mutex::new(FxHashMap::default()),
        }
    }

    /// Returns `true` if `sender` is a system identity.
    #[inline]
    #[must_use]
    pub fn is_system_sender(&self, sender: &str) -> bool {
        self.system_senders.iter().any(|s| s == sender)
    }

    /// Handles one notification event.
    ///
    /// Returns the record surfaced to the application, or `None` for system
    /// events.
    pub fn process_notification(
        &self,
        data: &Value,
        callbacks: &ClientCallbacks,
    ) -> Option<NotificationRecord> {
        let mut record = NotificationRecord::from_event(data, self.preview_length);

        if self.is_system_sender(&record.sender) {
            debug!(sender = %record.sender, "System notification suppressed");
            return None;
        }

        record.delivered = self.raise_alert(&record, data);
        callbacks.notification(&record);

        Some(record)
    }

    /// Handles activation of a raised alert.
    ///
    /// Returns `false` if no alert with `tag` is outstanding.
    pub fn activate_alert(&self, tag: &str, callbacks: &ClientCallbacks) -> bool {
        let Some(data) = self.raised.lock().remove(tag) else {
            trace!(tag, "Click on unknown alert ignored");
            return false;
        };

        self.environment.focus_application();
        self.environment.dismiss_alert(tag);
        callbacks.notification_click(&data);

        debug!(tag, "Alert activated");
        true
    }

    /// Requests alert permission when alerts are supported and not granted.
    ///
    /// Returns the resulting grant.
    pub fn request_permission(&self) -> bool {
        if !self.environment.alerts_supported() {
            return false;
        }
        if self.environment.has_alert_permission() {
            return true;
        }
        self.environment.request_alert_permission()
    }

    /// Number of alerts raised and not yet activated or evicted.
    #[inline]
    #[must_use]
    pub fn outstanding_alerts(&self) -> usize {
        self.raised.lock().len()
    }

    /// Raises an alert for `record` if the environment and history allow it.
    fn raise_alert(&self, record: &NotificationRecord, data: &Value) -> bool {
        let env = &self.environment;
        if env.is_foreground() || !env.alerts_supported() || !env.has_alert_permission() {
            return false;
        }

        let key = &record.dedupe_key;
        let (fresh, evicted) = self.history.lock().insert(key);
        if !fresh {
            debug!(key = %key, "Duplicate alert suppressed");
            return false;
        }
        if let Some(old) = evicted {
            self.raised.lock().remove(&old);
        }

        let alert = Alert {
            tag: key.clone(),
            title: record.sender.clone(),
            body: record.preview.clone(),
        };

        match env.show_alert(&alert) {
            Ok(()) => {
                self.raised.lock().insert(key.clone(), data.clone());
                debug!(key = %key, "Alert raised");
                true
            }
            Err(e) => {
                self.history.lock().remove(key);
                warn!(key = %key, error = %e, "Failed to raise alert");
                false
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use crate::notification::testing::RecordingEnvironment;

    fn dispatcher(env: &Arc<RecordingEnvironment>) -> NotificationDispatcher {
        NotificationDispatcher::new(env.clone(), &ClientOptions::new())
    }

    fn counting_callbacks() -> (ClientCallbacks, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let callbacks = ClientCallbacks::new().on_notification(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (callbacks, count)
    }

    #[test]
    fn test_system_sender_is_dropped() {
        let env = Arc::new(RecordingEnvironment::background_with_permission());
        let dispatcher = dispatcher(&env);
        let (callbacks, count) = counting_callbacks();

        let record = dispatcher.process_notification(
            &json!({ "sender": "System", "text": "maintenance" }),
            &callbacks,
        );

        assert!(record.is_none());
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(env.alerts().is_empty());
    }

    #[test]
    fn test_background_raises_tagged_alert() {
        let env = Arc::new(RecordingEnvironment::background_with_permission());
        let dispatcher = dispatcher(&env);
        let (callbacks, count) = counting_callbacks();

        let record = dispatcher
            .process_notification(
                &json!({ "sender": "alice", "messageId": "m1", "timestamp": 1_700_000_000_000i64, "text": "hi" }),
                &callbacks,
            )
            .unwrap();

        assert!(record.delivered);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        let alerts = env.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].tag, "alice-m1");
        assert_eq!(alerts[0].title, "alice");
        assert_eq!(alerts[0].body, "hi");
    }

    #[test]
    fn test_foreground_only_in_app() {
        let env = Arc::new(RecordingEnvironment::background_with_permission());
        env.set_foreground(true);
        let dispatcher = dispatcher(&env);
        let (callbacks, count) = counting_callbacks();

        let record = dispatcher
            .process_notification(&json!({ "sender": "alice", "messageId": "m1" }), &callbacks)
            .unwrap();

        assert!(!record.delivered);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(env.alerts().is_empty());
    }

    #[test]
    fn test_no_permission_no_alert() {
        let env = Arc::new(RecordingEnvironment::background_with_permission());
        env.set_permission(false);
        let dispatcher = dispatcher(&env);

        dispatcher.process_notification(
            &json!({ "sender": "alice", "messageId": "m1" }),
            &ClientCallbacks::new(),
        );
        assert!(env.alerts().is_empty());
    }

    #[test]
    fn test_duplicate_alert_suppressed_but_in_app_repeats() {
        let env = Arc::new(RecordingEnvironment::background_with_permission());
        let dispatcher = dispatcher(&env);
        let (callbacks, count) = counting_callbacks();
        let event = json!({ "sender": "alice", "messageId": "m1" });

        dispatcher.process_notification(&event, &callbacks);
        let second = dispatcher.process_notification(&event, &callbacks).unwrap();

        assert!(!second.delivered);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(env.alerts().len(), 1);
    }

    #[test]
    fn test_history_evicts_oldest() {
        let env = Arc::new(RecordingEnvironment::background_with_permission());
        let options = ClientOptions::new().with_dedupe_capacity(2);
        let dispatcher = NotificationDispatcher::new(env.clone(), &options);
        let callbacks = ClientCallbacks::new();

        for id in ["m1", "m2", "m3", "m1"] {
            dispatcher.process_notification(&json!({ "sender": "a", "messageId": id }), &callbacks);
        }

        let tags: Vec<_> = env.alerts().into_iter().map(|a| a.tag).collect();
        assert_eq!(tags, vec!["a-m1", "a-m2", "a-m3", "a-m1"]);
        assert_eq!(dispatcher.outstanding_alerts(), 2);
    }

    #[test]
    fn test_failed_alert_can_retry() {
        let env = Arc::new(RecordingEnvironment::background_with_permission());
        env.set_fail_alerts(true);
        let dispatcher = dispatcher(&env);
        let event = json!({ "sender": "alice", "messageId": "m1" });

        let first = dispatcher
            .process_notification(&event, &ClientCallbacks::new())
            .unwrap();
        assert!(!first.delivered);

        env.set_fail_alerts(false);
        let second = dispatcher
            .process_notification(&event, &ClientCallbacks::new())
            .unwrap();
        assert!(second.delivered);
    }

    #[test]
    fn test_activate_alert_focuses_dismisses_and_navigates() {
        let env = Arc::new(RecordingEnvironment::background_with_permission());
        let dispatcher = dispatcher(&env);
        let event = json!({ "sender": "alice", "messageId": "m1", "room": "general" });

        let navigated = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&navigated);
        let callbacks = ClientCallbacks::new().on_notification_click(move |data| {
            *sink.lock() = Some(data.clone());
        });

        dispatcher.process_notification(&event, &callbacks);
        assert!(dispatcher.activate_alert("alice-m1", &callbacks));

        assert_eq!(env.focus_count(), 1);
        assert_eq!(env.dismissed(), vec!["alice-m1".to_string()]);
        assert_eq!(navigated.lock().clone(), Some(event));

        // Second click on the same alert does nothing.
        assert!(!dispatcher.activate_alert("alice-m1", &callbacks));
        assert_eq!(env.focus_count(), 1);
    }

    #[test]
    fn test_request_permission() {
        let env = Arc::new(RecordingEnvironment::background_with_permission());
        env.set_permission(false);
        env.set_grant_on_request(true);
        let dispatcher = dispatcher(&env);

        assert!(dispatcher.request_permission());
        assert_eq!(env.permission_requests(), 1);

        // Already granted: no second prompt.
        assert!(dispatcher.request_permission());
        assert_eq!(env.permission_requests(), 1);
    }
}
