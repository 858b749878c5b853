//! Handler function shapes accepted by the builder.

use std::sync::Arc;

use busrx_client::{FaultContext, HandlerError, Message};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

/// The normalized handler shape: every message maps to a lazy, possibly
/// empty, possibly multi-valued sequence of typed results.
///
/// The builder's entry points wrap future-returning and stream-returning
/// user handlers into this shape.
pub(crate) type MessageHandler<T> = Arc<
    dyn Fn(Message, CancellationToken) -> BoxStream<'static, Result<T, HandlerError>>
        + Send
        + Sync,
>;

/// User-supplied error delegate.
///
/// Receives every handler fault together with its originating context. May
/// itself fail; such a failure propagates into the broker client's
/// fault-dispatch context, where it is logged and not re-routed.
pub type ErrorHandler =
    Arc<dyn Fn(FaultContext) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;
