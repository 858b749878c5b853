//! Publisher for the in-memory broker.

use async_trait::async_trait;

use crate::connection::SenderClient;
use crate::error::{ClientError, Result};
use crate::message::Message;

use super::MemoryBroker;

/// Sender bound to one queue or topic by name.
///
/// The entity is resolved at send time, so subscriptions added to a topic
/// after the sender was created still receive its messages.
pub(crate) struct MemorySender {
    broker: MemoryBroker,
    entity: String,
}

impl MemorySender {
    pub(crate) fn new(broker: MemoryBroker, entity: String) -> Self {
        Self { broker, entity }
    }
}

#[async_trait]
impl SenderClient for MemorySender {
    async fn send(&self, message: Message) -> Result<()> {
        if let Some(queue) = self.broker.queue_entity(&self.entity) {
            queue.enqueue(message).await;
            return Ok(());
        }
        if let Some(subscriptions) = self.broker.topic_subscription_entities(&self.entity) {
            // Topic fan-out: every subscription gets its own copy with its
            // own sequence numbering.
            for entity in subscriptions {
                entity.enqueue(message.clone()).await;
            }
            return Ok(());
        }
        Err(ClientError::EntityNotFound(self.entity.clone()))
    }
}
