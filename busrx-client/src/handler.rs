//! Push handler plumbing: the callback types a receiver accepts and the
//! options that shape how it invokes them.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::message::Message;

/// Boxed error type carried by handler faults.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// The async callback a receiver invokes once per delivered message.
///
/// The token is cancelled when the receiver is shutting down; handlers are
/// expected to observe it cooperatively. A returned `Err` is routed to the
/// fault callback registered in [`PushHandlerOptions`].
pub type PushHandler =
    Arc<dyn Fn(Message, CancellationToken) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

/// The fault callback a receiver invokes when a push handler fails.
pub type FaultHandler = Arc<dyn Fn(FaultContext) -> BoxFuture<'static, ()> + Send + Sync>;

/// Which receiver operation raised a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultAction {
    /// The user-supplied push handler failed
    UserCallback,
    /// The receive operation itself failed
    Receive,
    /// Closing the receiver failed
    Close,
}

/// Context handed to the fault callback: the fault itself plus where it
/// originated.
#[derive(Clone)]
pub struct FaultContext {
    /// The fault that was raised
    pub error: Arc<dyn std::error::Error + Send + Sync>,
    /// Entity path of the receiver the fault originated from
    pub entity_path: String,
    /// The operation that raised the fault
    pub action: FaultAction,
}

impl std::fmt::Debug for FaultContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultContext")
            .field("error", &self.error.to_string())
            .field("entity_path", &self.entity_path)
            .field("action", &self.action)
            .finish()
    }
}

/// Options consumed by a receiver when a push handler is registered.
#[derive(Clone)]
pub struct PushHandlerOptions {
    /// Maximum number of concurrent push handler invocations.
    /// Default: 1
    pub max_concurrent_calls: u32,

    /// Upper bound on automatic message-lock renewal while a handler runs.
    /// Default: 5 minutes
    pub max_auto_renew_duration: Duration,

    /// The single fault-callback slot. Invoked with the fault and its
    /// originating context whenever a push handler fails.
    pub fault_handler: Option<FaultHandler>,
}

impl Default for PushHandlerOptions {
    fn default() -> Self {
        Self {
            max_concurrent_calls: 1,
            max_auto_renew_duration: Duration::from_secs(300),
            fault_handler: None,
        }
    }
}

impl std::fmt::Debug for PushHandlerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushHandlerOptions")
            .field("max_concurrent_calls", &self.max_concurrent_calls)
            .field("max_auto_renew_duration", &self.max_auto_renew_duration)
            .field("fault_handler", &self.fault_handler.is_some())
            .finish()
    }
}
