//! # busrx
//!
//! Cold, per-subscription message streams over push-based broker
//! consumption.
//!
//! A message broker delivers by invoking a registered callback forever;
//! busrx inverts that into a lazily-activated stream: nothing touches the
//! broker until `subscribe()`, every subscription owns its own receiver, and
//! disposal deterministically releases it. Handler faults are either
//! delegated to a configured error handler (the stream stays alive) or
//! surfaced as the stream's single terminal error.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use busrx::{process_messages, ReceiveMode, RetryPolicy};
//! use futures::StreamExt;
//!
//! let registration = process_messages(connection, |message, _token| async move {
//!     Ok::<String, busrx::HandlerError>(String::from_utf8(message.body().to_vec())?)
//! })
//! .from_subscription("orders", "audit", ReceiveMode::PeekLock, RetryPolicy::Default)
//! .with_options(|options| options.max_concurrent_calls = Some(4));
//!
//! // Cold: the receiver is constructed here, once per subscribe call.
//! let mut stream = registration.subscribe().await?;
//! while let Some(text) = stream.next().await {
//!     println!("{}", text?);
//! }
//! ```
//!
//! ## Ordering
//!
//! Results produced by one message's handler are delivered in the order the
//! handler produced them. Across messages, order is unspecified whenever
//! `max_concurrent_calls > 1`. Delivery to the consumer is always
//! serialized: notifications from concurrent handler invocations funnel
//! through a single channel drained by the stream.

mod builder;
mod error;
mod factory;
mod handler;
mod options;
mod stream;

pub use builder::{
    process_message_stream, process_messages, HandlerRegistration, ReceiverRegistration,
};
pub use error::{Result, StreamError};
pub use factory::ReceiverFactory;
pub use handler::ErrorHandler;
pub use options::ReducedOptions;
pub use stream::MessageStream;

// Re-export the client vocabulary the public API speaks in.
pub use busrx_client::{
    BrokerConnection, FaultAction, FaultContext, HandlerError, Message, ReceiveMode, RetryPolicy,
    TargetDescriptor,
};

/// Prelude module for convenient imports.
///
/// ```rust
/// use busrx::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        process_message_stream, process_messages, BrokerConnection, FaultContext, HandlerError,
        Message, MessageStream, ReceiveMode, ReducedOptions, Result, RetryPolicy, StreamError,
        TargetDescriptor,
    };
}
