//! Outbound message queue.
//!
//! Holds application messages emitted while the client is not connected.
//! The queue also owns the sequence counter, so every outbound message gets
//! its stamp here whether it is sent immediately or buffered.
//!
//! # Delivery
//!
//! Flushing is at-most-once: [`MessageQueue::take_all`] removes every entry
//! before any of them is sent, so a channel drop mid-flush loses the rest.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use serde::Serialize;
use serde_json::Value;

use crate::identifiers::SequenceNumber;
use crate::protocol::stamp_payload;

// ============================================================================
// QueuedMessage
// ============================================================================

/// An outbound application message with its ordering stamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedMessage {
    /// Event name to emit.
    pub event_name: String,

    /// Payload including `sequenceNumber` and `enqueuedAtMillis`.
    pub payload: Value,

    /// Assigned sequence number.
    pub sequence_number: SequenceNumber,

    /// Milliseconds since the Unix epoch when the message was stamped.
    pub enqueued_at_millis: i64,
}

// ============================================================================
// MessageQueue
// ============================================================================

/// FIFO buffer of pending outbound messages.
#[derive(Debug, Default)]
pub struct MessageQueue {
    /// Pending entries in enqueue order.
    entries: VecDeque<QueuedMessage>,
    /// Next sequence number to hand out.
    next_sequence: SequenceNumber,
}

impl MessageQueue {
    /// Creates an empty queue starting at sequence zero.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamps a payload with the next sequence number.
    ///
    /// The counter advances even if the message is never queued.
    pub fn stamp(
        &mut self,
        event_name: impl Into<String>,
        payload: Value,
        now_millis: i64,
    ) -> QueuedMessage {
        let sequence_number = self.next_sequence;
        self.next_sequence = sequence_number.next();

        QueuedMessage {
            event_name: event_name.into(),
            payload: stamp_payload(payload, sequence_number, now_millis),
            sequence_number,
            enqueued_at_millis: now_millis,
        }
    }

    /// Appends a stamped message.
    #[inline]
    pub fn push(&mut self, message: QueuedMessage) {
        self.entries.push_back(message);
    }

    /// Removes and returns every entry in enqueue order.
    ///
    /// Messages pushed afterwards land in the now-empty queue.
    #[must_use]
    pub fn take_all(&mut self) -> Vec<QueuedMessage> {
        self.entries.drain(..).collect()
    }

    /// Returns the number of pending entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is pending.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the sequence number the next `stamp` will assign.
    #[inline]
    #[must_use]
    pub fn next_sequence(&self) -> SequenceNumber {
        self.next_sequence
    }

    /// Iterates pending entries in enqueue order.
    pub fn iter(&self) -> impl Iterator<Item = &QueuedMessage> {
        self.entries.iter()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_first_sequence_is_zero() {
        let mut queue = MessageQueue::new();
        let message = queue.stamp("sendMessage", json!({ "text": "hi" }), 42);
        assert_eq!(message.sequence_number, SequenceNumber::ZERO);
        assert_eq!(message.payload["sequenceNumber"], json!(0));
        assert_eq!(message.payload["enqueuedAtMillis"], json!(42));
        assert_eq!(message.payload["text"], json!("hi"));
    }

    #[test]
    fn test_take_all_preserves_order_and_empties() {
        let mut queue = MessageQueue::new();
        for text in ["a", "b", "c"] {
            let message = queue.stamp("sendMessage", json!({ "text": text }), 0);
            queue.push(message);
        }

        let flushed = queue.take_all();
        let texts: Vec<_> = flushed.iter().map(|m| m.payload["text"].clone()).collect();
        assert_eq!(texts, vec![json!("a"), json!("b"), json!("c")]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_push_after_take_lands_in_fresh_queue() {
        let mut queue = MessageQueue::new();
        let first = queue.stamp("a", Value::Null, 0);
        queue.push(first);

        let snapshot = queue.take_all();
        let second = queue.stamp("b", Value::Null, 0);
        queue.push(second);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(queue.len(), 1);
        assert_eq!(
            queue.iter().next().map(|m| m.sequence_number),
            Some(SequenceNumber::new(1))
        );
    }

    #[test]
    fn test_sequence_survives_flush() {
        let mut queue = MessageQueue::new();
        let message = queue.stamp("a", Value::Null, 0);
        queue.push(message);
        let _ = queue.take_all();
        assert_eq!(queue.next_sequence(), SequenceNumber::new(1));
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut queue = MessageQueue::new();
        let message = queue.stamp("sendMessage", Value::Null, 7);
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["eventName"], json!("sendMessage"));
        assert_eq!(value["sequenceNumber"], json!(0));
        assert_eq!(value["enqueuedAtMillis"], json!(7));
    }

    proptest! {
        #[test]
        fn prop_sequence_strictly_increasing(count in 1usize..200) {
            let mut queue = MessageQueue::new();
            let mut last: Option<SequenceNumber> = None;

            for i in 0..count {
                let before = queue.len();
                let message = queue.stamp("evt", json!({ "i": i }), i as i64);
                if let Some(prev) = last {
                    prop_assert!(message.sequence_number > prev);
                }
                last = Some(message.sequence_number);
                queue.push(message);
                prop_assert_eq!(queue.len(), before + 1);
            }
        }
    }
}
