//! Deferred receiver construction.

use std::sync::Arc;

use busrx_client::{BrokerConnection, ReceiverClient, TargetDescriptor};

use crate::error::Result;

/// Deferred constructor for receiver clients.
///
/// Creating a factory performs no broker activity; a fresh receiver is
/// constructed only when [`create`](ReceiverFactory::create) is invoked,
/// once per stream subscription. Receivers are never memoized or shared.
pub struct ReceiverFactory {
    connection: Arc<dyn BrokerConnection>,
    target: TargetDescriptor,
}

impl ReceiverFactory {
    /// Bind a factory to a shared connection and a resolved target.
    pub fn new(connection: Arc<dyn BrokerConnection>, target: TargetDescriptor) -> Self {
        Self { connection, target }
    }

    /// Construct a fresh receiver for this factory's target.
    pub async fn create(&self) -> Result<Box<dyn ReceiverClient>> {
        let receiver = self.connection.create_receiver(&self.target).await?;
        tracing::debug!(entity = %self.target.entity_path(), "receiver constructed");
        Ok(receiver)
    }

    /// The target this factory binds receivers to.
    pub fn target(&self) -> &TargetDescriptor {
        &self.target
    }
}
