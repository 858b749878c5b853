//! # busrx-client
//!
//! Broker client abstractions for the busrx stream adapter.
//!
//! This crate defines the seam between the adapter and a concrete message
//! broker: a shared connection that hands out per-target receivers and
//! senders, a push-delivery receiver contract, topology management, and the
//! message representation. It also ships an in-process broker
//! ([`memory::MemoryBroker`]) that implements the full contract for tests
//! and examples.

mod connection;
mod error;
mod handler;
mod management;
pub mod memory;
mod message;
mod target;

pub use connection::{BrokerConnection, ReceiverClient, SenderClient};
pub use error::{ClientError, Result};
pub use handler::{
    FaultAction, FaultContext, FaultHandler, HandlerError, PushHandler, PushHandlerOptions,
};
pub use management::{
    ManagementClient, QueueDescription, SubscriptionDescription, TopicDescription,
};
pub use message::Message;
pub use target::{ReceiveMode, RetryPolicy, TargetDescriptor};
