//! In-process broker implementation.
//!
//! `MemoryBroker` implements all four client traits against process-local
//! state: named queues, topics with fan-out subscriptions, push delivery
//! with semaphore-bounded handler concurrency, and fault routing to the
//! registered fault callback. Tests and examples use it in place of a live
//! broker.

mod entity;
mod receiver;
mod sender;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::connection::{BrokerConnection, ReceiverClient, SenderClient};
use crate::error::{ClientError, Result};
use crate::management::{
    ManagementClient, QueueDescription, SubscriptionDescription, TopicDescription,
};
use crate::target::TargetDescriptor;

use entity::Entity;
use receiver::MemoryReceiver;
use sender::MemorySender;

struct QueueEntry {
    #[allow(dead_code)]
    description: QueueDescription,
    entity: Arc<Entity>,
}

struct SubscriptionEntry {
    #[allow(dead_code)]
    description: SubscriptionDescription,
    entity: Arc<Entity>,
}

struct TopicEntry {
    #[allow(dead_code)]
    description: TopicDescription,
    subscriptions: DashMap<String, SubscriptionEntry>,
}

#[derive(Default)]
struct MemoryBrokerInner {
    queues: DashMap<String, QueueEntry>,
    topics: DashMap<String, TopicEntry>,
    receivers_created: AtomicUsize,
    receivers_closed: Arc<AtomicUsize>,
}

/// An in-process broker usable wherever a shared connection is expected.
///
/// Cloning is cheap and every clone addresses the same topology, mirroring
/// how a real broker connection is shared by many clients in one process.
///
/// # Example
///
/// ```rust,ignore
/// use busrx_client::memory::MemoryBroker;
/// use busrx_client::{ManagementClient, QueueDescription};
///
/// let broker = MemoryBroker::new();
/// broker.create_queue(QueueDescription::new("orders")).await?;
/// let sender = broker.create_sender("orders").await?;
/// sender.send(Message::new("hello")).await?;
/// ```
#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<MemoryBrokerInner>,
}

impl MemoryBroker {
    /// Create an empty broker with no queues or topics.
    pub fn new() -> Self {
        Self::default()
    }

    /// How many receivers this broker has handed out.
    pub fn receivers_created(&self) -> usize {
        self.inner.receivers_created.load(Ordering::SeqCst)
    }

    /// How many receivers have completed a close.
    pub fn receivers_closed(&self) -> usize {
        self.inner.receivers_closed.load(Ordering::SeqCst)
    }

    fn resolve_target(&self, target: &TargetDescriptor) -> Result<Arc<Entity>> {
        match target {
            TargetDescriptor::Queue { name, .. } => self
                .inner
                .queues
                .get(name)
                .map(|entry| entry.entity.clone())
                .ok_or_else(|| ClientError::EntityNotFound(name.clone())),
            TargetDescriptor::Subscription {
                topic,
                subscription,
                ..
            } => self
                .inner
                .topics
                .get(topic)
                .and_then(|entry| {
                    entry
                        .subscriptions
                        .get(subscription)
                        .map(|sub| sub.entity.clone())
                })
                .ok_or_else(|| ClientError::EntityNotFound(target.entity_path())),
        }
    }

    pub(crate) fn queue_entity(&self, name: &str) -> Option<Arc<Entity>> {
        self.inner.queues.get(name).map(|entry| entry.entity.clone())
    }

    pub(crate) fn topic_subscription_entities(&self, topic: &str) -> Option<Vec<Arc<Entity>>> {
        self.inner.topics.get(topic).map(|entry| {
            entry
                .subscriptions
                .iter()
                .map(|sub| sub.entity.clone())
                .collect()
        })
    }
}

#[async_trait]
impl BrokerConnection for MemoryBroker {
    async fn create_receiver(&self, target: &TargetDescriptor) -> Result<Box<dyn ReceiverClient>> {
        let entity = self.resolve_target(target)?;
        self.inner.receivers_created.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(entity = %target.entity_path(), "receiver created");
        Ok(Box::new(MemoryReceiver::new(
            entity,
            target.entity_path(),
            target.receive_mode(),
            self.inner.receivers_closed.clone(),
        )))
    }

    async fn create_sender(&self, entity: &str) -> Result<Box<dyn SenderClient>> {
        if !self.inner.queues.contains_key(entity) && !self.inner.topics.contains_key(entity) {
            return Err(ClientError::EntityNotFound(entity.to_string()));
        }
        Ok(Box::new(MemorySender::new(self.clone(), entity.to_string())))
    }
}

#[async_trait]
impl ManagementClient for MemoryBroker {
    async fn queue_exists(&self, name: &str) -> Result<bool> {
        Ok(self.inner.queues.contains_key(name))
    }

    async fn create_queue(&self, description: QueueDescription) -> Result<()> {
        let name = description.name.clone();
        if self.inner.queues.contains_key(&name) {
            return Err(ClientError::EntityExists(name));
        }
        self.inner.queues.insert(
            name.clone(),
            QueueEntry {
                description,
                entity: Arc::new(Entity::new()),
            },
        );
        tracing::debug!(queue = %name, "queue created");
        Ok(())
    }

    async fn topic_exists(&self, name: &str) -> Result<bool> {
        Ok(self.inner.topics.contains_key(name))
    }

    async fn create_topic(&self, description: TopicDescription) -> Result<()> {
        let name = description.name.clone();
        if self.inner.topics.contains_key(&name) {
            return Err(ClientError::EntityExists(name));
        }
        self.inner.topics.insert(
            name.clone(),
            TopicEntry {
                description,
                subscriptions: DashMap::new(),
            },
        );
        tracing::debug!(topic = %name, "topic created");
        Ok(())
    }

    async fn subscription_exists(&self, topic: &str, subscription: &str) -> Result<bool> {
        Ok(self
            .inner
            .topics
            .get(topic)
            .map(|entry| entry.subscriptions.contains_key(subscription))
            .unwrap_or(false))
    }

    async fn create_subscription(&self, description: SubscriptionDescription) -> Result<()> {
        let topic = self
            .inner
            .topics
            .get(&description.topic)
            .ok_or_else(|| ClientError::EntityNotFound(description.topic.clone()))?;
        let name = description.subscription.clone();
        if topic.subscriptions.contains_key(&name) {
            return Err(ClientError::EntityExists(format!(
                "{}/subscriptions/{name}",
                description.topic
            )));
        }
        topic.subscriptions.insert(
            name.clone(),
            SubscriptionEntry {
                description,
                entity: Arc::new(Entity::new()),
            },
        );
        tracing::debug!(subscription = %name, "subscription created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{PushHandler, PushHandlerOptions};
    use crate::message::Message;
    use crate::target::{ReceiveMode, RetryPolicy};
    use futures::FutureExt;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn forwarding_handler(tx: mpsc::UnboundedSender<Message>) -> PushHandler {
        Arc::new(move |message, _token| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(message);
                Ok(())
            }
            .boxed()
        })
    }

    async fn recv_body(rx: &mut mpsc::UnboundedReceiver<Message>) -> String {
        let message = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for message")
            .expect("channel closed");
        String::from_utf8(message.body().to_vec()).expect("body is not UTF-8")
    }

    #[tokio::test]
    async fn test_queue_topology() {
        let broker = MemoryBroker::new();
        assert!(!broker.queue_exists("orders").await.unwrap());

        broker
            .create_queue(QueueDescription::new("orders"))
            .await
            .unwrap();
        assert!(broker.queue_exists("orders").await.unwrap());

        let result = broker.create_queue(QueueDescription::new("orders")).await;
        assert!(matches!(result, Err(ClientError::EntityExists(_))));
    }

    #[tokio::test]
    async fn test_subscription_requires_topic() {
        let broker = MemoryBroker::new();
        let result = broker
            .create_subscription(SubscriptionDescription::new("orders", "audit"))
            .await;
        assert!(matches!(result, Err(ClientError::EntityNotFound(_))));

        broker
            .create_topic(TopicDescription::new("orders"))
            .await
            .unwrap();
        broker
            .create_subscription(SubscriptionDescription::new("orders", "audit"))
            .await
            .unwrap();
        assert!(broker.subscription_exists("orders", "audit").await.unwrap());
    }

    #[tokio::test]
    async fn test_receiver_for_missing_entity_fails() {
        let broker = MemoryBroker::new();
        let target =
            TargetDescriptor::queue("missing", ReceiveMode::PeekLock, RetryPolicy::Default);
        let result = broker.create_receiver(&target).await;
        assert!(matches!(result, Err(ClientError::EntityNotFound(_))));
        assert_eq!(broker.receivers_created(), 0);
    }

    #[tokio::test]
    async fn test_topic_send_fans_out_to_every_subscription() {
        let broker = MemoryBroker::new();
        broker
            .create_topic(TopicDescription::new("orders"))
            .await
            .unwrap();
        broker
            .create_subscription(SubscriptionDescription::new("orders", "billing"))
            .await
            .unwrap();
        broker
            .create_subscription(SubscriptionDescription::new("orders", "audit"))
            .await
            .unwrap();

        let sender = broker.create_sender("orders").await.unwrap();
        sender.send(Message::new("order placed")).await.unwrap();

        for subscription in ["billing", "audit"] {
            let target = TargetDescriptor::subscription(
                "orders",
                subscription,
                ReceiveMode::PeekLock,
                RetryPolicy::Default,
            );
            let receiver = broker.create_receiver(&target).await.unwrap();
            let (tx, mut rx) = mpsc::unbounded_channel();
            receiver
                .register_push_handler(forwarding_handler(tx), PushHandlerOptions::default())
                .unwrap();
            assert_eq!(recv_body(&mut rx).await, "order placed");
            receiver.close().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_queue_message_consumed_once() {
        let broker = MemoryBroker::new();
        broker
            .create_queue(QueueDescription::new("orders"))
            .await
            .unwrap();

        let sender = broker.create_sender("orders").await.unwrap();
        for i in 0..4 {
            sender.send(Message::new(format!("m{i}"))).await.unwrap();
        }

        let target = TargetDescriptor::queue("orders", ReceiveMode::PeekLock, RetryPolicy::Default);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let first = broker.create_receiver(&target).await.unwrap();
        let second = broker.create_receiver(&target).await.unwrap();
        first
            .register_push_handler(forwarding_handler(tx.clone()), PushHandlerOptions::default())
            .unwrap();
        second
            .register_push_handler(forwarding_handler(tx), PushHandlerOptions::default())
            .unwrap();

        let mut bodies = Vec::new();
        for _ in 0..4 {
            bodies.push(recv_body(&mut rx).await);
        }
        bodies.sort();
        assert_eq!(bodies, ["m0", "m1", "m2", "m3"]);

        first.close().await.unwrap();
        second.close().await.unwrap();
        assert_eq!(broker.receivers_created(), 2);
        assert_eq!(broker.receivers_closed(), 2);
    }

    #[tokio::test]
    async fn test_sender_for_missing_entity_fails() {
        let broker = MemoryBroker::new();
        let result = broker.create_sender("missing").await;
        assert!(matches!(result, Err(ClientError::EntityNotFound(_))));
    }
}
