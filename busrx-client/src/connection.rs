//! Broker connection and client traits.
//!
//! These traits are the seam between the stream adapter and a concrete
//! broker implementation. A single connection may back many receivers and
//! senders; each receiver is owned by exactly one consumer.

use async_trait::async_trait;

use crate::error::Result;
use crate::handler::{PushHandler, PushHandlerOptions};
use crate::message::Message;
use crate::target::TargetDescriptor;

/// A shared broker connection capable of constructing per-target clients.
///
/// Implementations must be cheap to share (`Arc<dyn BrokerConnection>`);
/// creating a receiver or sender is the point where broker-side resources
/// are actually acquired.
#[async_trait]
pub trait BrokerConnection: Send + Sync {
    /// Create a fresh receiver bound to the given target.
    ///
    /// Every call produces an independent receiver with its own delivery
    /// state; receivers are never shared between consumers.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::EntityNotFound` if the target does not exist.
    async fn create_receiver(&self, target: &TargetDescriptor) -> Result<Box<dyn ReceiverClient>>;

    /// Create a sender for the given queue or topic.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::EntityNotFound` if the entity does not exist.
    async fn create_sender(&self, entity: &str) -> Result<Box<dyn SenderClient>>;
}

/// A receiver capable of push-based message delivery.
///
/// The expected lifecycle is: one `register_push_handler` call, followed by
/// exactly one `close` call. Implementations may tolerate repeated closes,
/// but callers must not rely on it.
#[async_trait]
pub trait ReceiverClient: Send + Sync {
    /// Register the push callback and start delivering messages.
    ///
    /// The receiver invokes `handler` once per delivered message, with at
    /// most `options.max_concurrent_calls` invocations in flight. A handler
    /// `Err` is routed to `options.fault_handler`; delivery continues.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::HandlerAlreadyRegistered` if a handler was
    /// already registered, or `ClientError::ReceiverClosed` if the receiver
    /// has been closed.
    fn register_push_handler(&self, handler: PushHandler, options: PushHandlerOptions)
        -> Result<()>;

    /// Stop delivery and release the receiver.
    ///
    /// No push handler invocation starts after `close` begins; invocations
    /// already in flight are awaited, not aborted.
    async fn close(&self) -> Result<()>;
}

/// A sender capable of publishing messages to a queue or topic.
#[async_trait]
pub trait SenderClient: Send + Sync {
    /// Publish a message to the entity this sender is bound to.
    async fn send(&self, message: Message) -> Result<()>;
}
