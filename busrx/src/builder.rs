//! Fluent registration of message handlers.
//!
//! `process_messages` and `process_message_stream` start a registration;
//! `from_queue` / `from_subscription` resolve the target; error handling and
//! tuning options are optional; `subscribe` activates an independent stream.
//! Everything before `subscribe` is pure configuration with no broker
//! activity.

use std::future::Future;
use std::sync::Arc;

use busrx_client::{
    BrokerConnection, FaultContext, HandlerError, Message, ReceiveMode, RetryPolicy,
    TargetDescriptor,
};
use futures::{FutureExt, Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::factory::ReceiverFactory;
use crate::handler::{ErrorHandler, MessageHandler};
use crate::options::ReducedOptions;
use crate::stream::{self, MessageStream};

/// Register a handler that maps each message to a single typed result.
///
/// For handlers with no interesting result, use `T = ()`.
///
/// # Example
///
/// ```rust,ignore
/// let registration = process_messages(connection, |message, _token| async move {
///     Ok::<String, HandlerError>(String::from_utf8(message.body().to_vec())?)
/// });
/// let stream = registration
///     .from_queue("orders", ReceiveMode::PeekLock, RetryPolicy::Default)
///     .subscribe()
///     .await?;
/// ```
pub fn process_messages<H, Fut, T, E>(
    connection: Arc<dyn BrokerConnection>,
    handler: H,
) -> HandlerRegistration<T>
where
    H: Fn(Message, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Into<HandlerError> + 'static,
{
    let handler: MessageHandler<T> = Arc::new(move |message, token| {
        let result = handler(message, token);
        futures::stream::once(async move { result.await.map_err(Into::into) }).boxed()
    });
    HandlerRegistration {
        connection,
        handler,
    }
}

/// Register a handler that maps each message to a lazy sequence of typed
/// results. The sequence may be empty; its order is preserved in delivery.
pub fn process_message_stream<H, S, T, E>(
    connection: Arc<dyn BrokerConnection>,
    handler: H,
) -> HandlerRegistration<T>
where
    H: Fn(Message, CancellationToken) -> S + Send + Sync + 'static,
    S: Stream<Item = std::result::Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Into<HandlerError> + 'static,
{
    let handler: MessageHandler<T> = Arc::new(move |message, token| {
        handler(message, token)
            .map(|item| item.map_err(Into::into))
            .boxed()
    });
    HandlerRegistration {
        connection,
        handler,
    }
}

/// A registration with its handler bound but no target yet.
///
/// Only target-resolving calls are available at this stage; error handling,
/// options, and subscription become available once a target is set.
pub struct HandlerRegistration<T> {
    connection: Arc<dyn BrokerConnection>,
    handler: MessageHandler<T>,
}

impl<T: Send + 'static> HandlerRegistration<T> {
    /// Bind the registration to a queue.
    pub fn from_queue(
        self,
        name: impl Into<String>,
        receive_mode: ReceiveMode,
        retry_policy: RetryPolicy,
    ) -> ReceiverRegistration<T> {
        self.with_target(TargetDescriptor::queue(name, receive_mode, retry_policy))
    }

    /// Bind the registration to a topic subscription.
    pub fn from_subscription(
        self,
        topic: impl Into<String>,
        subscription: impl Into<String>,
        receive_mode: ReceiveMode,
        retry_policy: RetryPolicy,
    ) -> ReceiverRegistration<T> {
        self.with_target(TargetDescriptor::subscription(
            topic,
            subscription,
            receive_mode,
            retry_policy,
        ))
    }

    fn with_target(self, target: TargetDescriptor) -> ReceiverRegistration<T> {
        ReceiverRegistration {
            connection: self.connection.clone(),
            handler: self.handler,
            factory: ReceiverFactory::new(self.connection, target),
            error_handler: None,
            options: ReducedOptions::default(),
        }
    }
}

/// A fully-targeted registration: the cold source.
///
/// Each `subscribe` call is an independent activation with its own receiver
/// and lifecycle. Setting a new target, error handler, or options replaces
/// the previous value; last write wins.
pub struct ReceiverRegistration<T> {
    connection: Arc<dyn BrokerConnection>,
    handler: MessageHandler<T>,
    factory: ReceiverFactory,
    error_handler: Option<ErrorHandler>,
    options: ReducedOptions,
}

impl<T: Send + 'static> ReceiverRegistration<T> {
    /// Replace the target with a queue. The previously set target is
    /// discarded wholesale.
    pub fn from_queue(
        mut self,
        name: impl Into<String>,
        receive_mode: ReceiveMode,
        retry_policy: RetryPolicy,
    ) -> Self {
        self.factory = ReceiverFactory::new(
            self.connection.clone(),
            TargetDescriptor::queue(name, receive_mode, retry_policy),
        );
        self
    }

    /// Replace the target with a topic subscription. The previously set
    /// target is discarded wholesale.
    pub fn from_subscription(
        mut self,
        topic: impl Into<String>,
        subscription: impl Into<String>,
        receive_mode: ReceiveMode,
        retry_policy: RetryPolicy,
    ) -> Self {
        self.factory = ReceiverFactory::new(
            self.connection.clone(),
            TargetDescriptor::subscription(topic, subscription, receive_mode, retry_policy),
        );
        self
    }

    /// Delegate handler faults to `handler` instead of ending the stream.
    ///
    /// With an error handler configured, faults never reach the stream as a
    /// terminal error and delivery continues. A failure inside the error
    /// handler itself is logged in the broker's fault-dispatch context and
    /// not re-routed.
    pub fn with_error_handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(FaultContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), HandlerError>> + Send + 'static,
    {
        self.error_handler = Some(Arc::new(move |context| handler(context).boxed()));
        self
    }

    /// Adjust tuning options. Only fields the closure sets become overrides;
    /// everything else keeps the receiver client's defaults.
    pub fn with_options(mut self, configure: impl FnOnce(&mut ReducedOptions)) -> Self {
        configure(&mut self.options);
        self
    }

    /// The target the next subscription will bind to.
    pub fn target(&self) -> &TargetDescriptor {
        self.factory.target()
    }

    /// Activate an independent subscription.
    ///
    /// Merges options onto client defaults, constructs one fresh receiver,
    /// and registers the push handler. May be called any number of times;
    /// every call owns its own receiver.
    ///
    /// # Errors
    ///
    /// * `StreamError::Configuration` if the tuning options are invalid
    /// * `StreamError::Client` if receiver construction or registration failed
    pub async fn subscribe(&self) -> Result<MessageStream<T>> {
        stream::activate(
            &self.factory,
            self.handler.clone(),
            self.error_handler.clone(),
            &self.options,
        )
        .await
    }
}
