//! Topology provisioning: descriptions and the management trait.
//!
//! Provisioning is an external collaborator of the stream adapter; it exists
//! so that examples and tests can create the entities they consume.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Properties of a queue to create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueDescription {
    /// Queue name
    pub name: String,
    /// Delete the queue after this long without activity
    pub auto_delete_on_idle: Option<Duration>,
    /// Default time-to-live for messages in the queue
    pub default_message_ttl: Option<Duration>,
    /// Maximum delivery attempts before the broker gives up on a message
    pub max_delivery_count: Option<u32>,
}

impl QueueDescription {
    /// Create a description with broker defaults for all optional knobs.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            auto_delete_on_idle: None,
            default_message_ttl: None,
            max_delivery_count: None,
        }
    }
}

/// Properties of a topic to create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicDescription {
    /// Topic name
    pub name: String,
    /// Delete the topic after this long without activity
    pub auto_delete_on_idle: Option<Duration>,
}

impl TopicDescription {
    /// Create a description with broker defaults for all optional knobs.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            auto_delete_on_idle: None,
        }
    }
}

/// Properties of a topic subscription to create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionDescription {
    /// Topic the subscription belongs to
    pub topic: String,
    /// Subscription name
    pub subscription: String,
    /// Delete the subscription after this long without activity
    pub auto_delete_on_idle: Option<Duration>,
    /// Default time-to-live for messages in the subscription
    pub default_message_ttl: Option<Duration>,
    /// Maximum delivery attempts before the broker gives up on a message
    pub max_delivery_count: Option<u32>,
}

impl SubscriptionDescription {
    /// Create a description with broker defaults for all optional knobs.
    pub fn new(topic: impl Into<String>, subscription: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            subscription: subscription.into(),
            auto_delete_on_idle: None,
            default_message_ttl: None,
            max_delivery_count: None,
        }
    }
}

/// Management operations for broker topology.
#[async_trait]
pub trait ManagementClient: Send + Sync {
    /// Check whether a queue exists.
    async fn queue_exists(&self, name: &str) -> Result<bool>;

    /// Create a queue.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::EntityExists` if the queue already exists.
    async fn create_queue(&self, description: QueueDescription) -> Result<()>;

    /// Check whether a topic exists.
    async fn topic_exists(&self, name: &str) -> Result<bool>;

    /// Create a topic.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::EntityExists` if the topic already exists.
    async fn create_topic(&self, description: TopicDescription) -> Result<()>;

    /// Check whether a subscription exists on a topic.
    async fn subscription_exists(&self, topic: &str, subscription: &str) -> Result<bool>;

    /// Create a subscription on an existing topic.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::EntityNotFound` if the topic does not exist, or
    /// `ClientError::EntityExists` if the subscription already exists.
    async fn create_subscription(&self, description: SubscriptionDescription) -> Result<()>;
}
