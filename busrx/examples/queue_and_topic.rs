//! End-to-end walkthrough against the in-process broker.
//!
//! Provisions a queue and a topic with one subscription, publishes a few
//! UTF-8 messages to each, and consumes them through two independent
//! message streams.
//!
//! Run with: `cargo run --example queue_and_topic`

use std::sync::Arc;

use busrx::{process_messages, HandlerError, ReceiveMode, RetryPolicy};
use busrx_client::memory::MemoryBroker;
use busrx_client::{
    BrokerConnection, ManagementClient, Message, QueueDescription, SenderClient,
    SubscriptionDescription, TopicDescription,
};
use futures::StreamExt;

const QUEUE: &str = "sample-queue";
const TOPIC: &str = "sample-topic";
const SUBSCRIPTION: &str = "sample-subscription";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let broker = MemoryBroker::new();
    provision(&broker).await?;

    // Publish three messages to the queue and three to the topic.
    let queue_sender = broker.create_sender(QUEUE).await?;
    let topic_sender = broker.create_sender(TOPIC).await?;
    for index in 0..3 {
        queue_sender
            .send(Message::new(format!("Message {index}").into_bytes()))
            .await?;
        topic_sender
            .send(Message::new(format!("Message {index}").into_bytes()))
            .await?;
    }

    // Queue consumption: the registration is cold until subscribe.
    let connection = Arc::new(broker.clone());
    let mut queue_stream = process_messages(connection.clone(), |message, _token| async move {
        String::from_utf8(message.body().to_vec()).map_err(HandlerError::from)
    })
    .from_queue(QUEUE, ReceiveMode::PeekLock, RetryPolicy::Default)
    .with_options(|options| options.max_concurrent_calls = Some(2))
    .subscribe()
    .await?;

    for _ in 0..3 {
        if let Some(text) = queue_stream.next().await {
            tracing::info!(text = %text?, "received from queue");
        }
    }
    queue_stream.dispose().await?;

    // Topic consumption through a subscription, with a delegated error
    // handler so a bad message never ends the stream.
    let mut topic_stream = process_messages(connection, |message, _token| async move {
        String::from_utf8(message.body().to_vec()).map_err(HandlerError::from)
    })
    .from_subscription(TOPIC, SUBSCRIPTION, ReceiveMode::PeekLock, RetryPolicy::Default)
    .with_error_handler(|context| async move {
        tracing::warn!(entity = %context.entity_path, error = %context.error, "handler fault");
        Ok(())
    })
    .subscribe()
    .await?;

    for _ in 0..3 {
        if let Some(text) = topic_stream.next().await {
            tracing::info!(text = %text?, "received from subscription");
        }
    }
    topic_stream.dispose().await?;

    Ok(())
}

async fn provision(broker: &MemoryBroker) -> Result<(), Box<dyn std::error::Error>> {
    if !broker.queue_exists(QUEUE).await? {
        broker.create_queue(QueueDescription::new(QUEUE)).await?;
    }
    if !broker.topic_exists(TOPIC).await? {
        broker.create_topic(TopicDescription::new(TOPIC)).await?;
    }
    if !broker.subscription_exists(TOPIC, SUBSCRIPTION).await? {
        broker
            .create_subscription(SubscriptionDescription::new(TOPIC, SUBSCRIPTION))
            .await?;
    }
    Ok(())
}
