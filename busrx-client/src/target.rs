//! Target descriptors identifying what a receiver binds to.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How a receiver settles messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiveMode {
    /// Messages are locked during handling and settled afterwards
    PeekLock,
    /// Messages are removed from the entity as soon as they are delivered
    ReceiveAndDelete,
}

/// Retry behavior a broker client should apply to its own operations.
///
/// The adapter forwards this value opaquely; honoring it is entirely the
/// broker client's responsibility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The broker client's built-in default policy
    #[default]
    Default,
    /// No retries
    NoRetry,
    /// Exponential backoff with the given bounds
    Exponential {
        /// Maximum number of attempts
        max_attempts: u32,
        /// Delay before the first retry
        base_delay: Duration,
        /// Upper bound on the delay between retries
        max_delay: Duration,
    },
}

/// Identifies which queue or topic subscription a receiver binds to,
/// together with its receive mode and retry policy.
///
/// Immutable once resolved; a builder that is told a new target before
/// subscription replaces the previous one wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TargetDescriptor {
    /// A queue receiver target
    Queue {
        /// Queue name
        name: String,
        /// Settlement mode for delivered messages
        receive_mode: ReceiveMode,
        /// Retry policy forwarded to the broker client
        retry_policy: RetryPolicy,
    },
    /// A topic subscription receiver target
    Subscription {
        /// Topic name
        topic: String,
        /// Subscription name within the topic
        subscription: String,
        /// Settlement mode for delivered messages
        receive_mode: ReceiveMode,
        /// Retry policy forwarded to the broker client
        retry_policy: RetryPolicy,
    },
}

impl TargetDescriptor {
    /// Create a queue target.
    pub fn queue(
        name: impl Into<String>,
        receive_mode: ReceiveMode,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self::Queue {
            name: name.into(),
            receive_mode,
            retry_policy,
        }
    }

    /// Create a topic subscription target.
    pub fn subscription(
        topic: impl Into<String>,
        subscription: impl Into<String>,
        receive_mode: ReceiveMode,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self::Subscription {
            topic: topic.into(),
            subscription: subscription.into(),
            receive_mode,
            retry_policy,
        }
    }

    /// The broker entity path this target addresses.
    ///
    /// Queues resolve to their name; subscriptions resolve to
    /// `{topic}/subscriptions/{subscription}`.
    pub fn entity_path(&self) -> String {
        match self {
            Self::Queue { name, .. } => name.clone(),
            Self::Subscription {
                topic,
                subscription,
                ..
            } => format!("{topic}/subscriptions/{subscription}"),
        }
    }

    /// The settlement mode for this target.
    pub fn receive_mode(&self) -> ReceiveMode {
        match self {
            Self::Queue { receive_mode, .. } => *receive_mode,
            Self::Subscription { receive_mode, .. } => *receive_mode,
        }
    }

    /// The retry policy for this target.
    pub fn retry_policy(&self) -> &RetryPolicy {
        match self {
            Self::Queue { retry_policy, .. } => retry_policy,
            Self::Subscription { retry_policy, .. } => retry_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_entity_path() {
        let target = TargetDescriptor::queue("orders", ReceiveMode::PeekLock, RetryPolicy::Default);
        assert_eq!(target.entity_path(), "orders");
        assert_eq!(target.receive_mode(), ReceiveMode::PeekLock);
    }

    #[test]
    fn test_subscription_entity_path() {
        let target = TargetDescriptor::subscription(
            "orders",
            "audit",
            ReceiveMode::ReceiveAndDelete,
            RetryPolicy::NoRetry,
        );
        assert_eq!(target.entity_path(), "orders/subscriptions/audit");
        assert_eq!(target.receive_mode(), ReceiveMode::ReceiveAndDelete);
        assert_eq!(*target.retry_policy(), RetryPolicy::NoRetry);
    }
}
