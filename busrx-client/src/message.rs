//! Broker message representation.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A message as delivered by the broker.
///
/// The body is an opaque byte payload; everything else is broker-assigned
/// metadata. Messages are handed unmodified to user handlers.
#[derive(Debug, Clone)]
pub struct Message {
    /// Unique identifier assigned when the message is created
    pub message_id: Uuid,
    /// Opaque binary payload
    pub body: Bytes,
    /// Broker-assigned position within the entity, set at enqueue time
    pub sequence_number: i64,
    /// When the broker accepted the message
    pub enqueued_at: DateTime<Utc>,
    /// How many times the message has been delivered
    pub delivery_count: u32,
    /// Lock token for peek-lock delivery, absent in receive-and-delete mode
    pub lock_token: Option<Uuid>,
}

impl Message {
    /// Create a new message with the given body.
    ///
    /// Broker metadata (`sequence_number`, `delivery_count`, `lock_token`)
    /// is filled in by the broker when the message is enqueued and delivered.
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            body: body.into(),
            sequence_number: 0,
            enqueued_at: Utc::now(),
            delivery_count: 0,
            lock_token: None,
        }
    }

    /// Get the message body as a byte slice.
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_new() {
        let message = Message::new("hello");
        assert_eq!(message.body(), b"hello");
        assert_eq!(message.sequence_number, 0);
        assert_eq!(message.delivery_count, 0);
        assert!(message.lock_token.is_none());
    }

    #[test]
    fn test_messages_get_distinct_ids() {
        let a = Message::new("a");
        let b = Message::new("b");
        assert_ne!(a.message_id, b.message_id);
    }
}
