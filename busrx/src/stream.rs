//! The stream adapter: cold, subscribe-activated message streams.
//!
//! Each activation constructs one receiver, registers one push handler, and
//! funnels every notification through a single channel so delivery to the
//! consumer is serialized no matter how many handler invocations run
//! concurrently.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use busrx_client::{
    FaultContext, FaultHandler, HandlerError, PushHandler, PushHandlerOptions, ReceiverClient,
};
use futures::{FutureExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, StreamError};
use crate::factory::ReceiverFactory;
use crate::handler::{ErrorHandler, MessageHandler};
use crate::options::ReducedOptions;

enum Notification<T> {
    Next(T),
    Fault(StreamError),
}

/// One activation of a registration: a stream of handler results backed by
/// exactly one receiver.
///
/// Yields `Ok` for every result a handler produces and, when no error
/// handler is configured, a single terminal `Err` for the first handler
/// fault; nothing is yielded after that. The receiver is *not* closed by a
/// terminal fault; disposal stays the subscriber's responsibility, so a
/// caller can inspect the error and resubscribe cheaply.
///
/// Call [`dispose`](MessageStream::dispose) to release the receiver.
/// Dropping without disposing cancels in-flight handlers cooperatively and
/// closes the receiver best-effort on the current runtime.
pub struct MessageStream<T> {
    rx: mpsc::UnboundedReceiver<Notification<T>>,
    receiver: Option<Box<dyn ReceiverClient>>,
    cancel: CancellationToken,
    terminated: bool,
}

impl<T> MessageStream<T> {
    /// Close this subscription's receiver and stop all delivery.
    ///
    /// Cancels the subscription's token (handlers observe it cooperatively;
    /// in-flight invocations are awaited by the receiver, not aborted) and
    /// closes the receiver exactly once. After `dispose` returns, no further
    /// notification can be observed.
    ///
    /// # Errors
    ///
    /// Propagates `StreamError::Client` if the receiver close fails.
    pub async fn dispose(mut self) -> Result<()> {
        self.cancel.cancel();
        if let Some(receiver) = self.receiver.take() {
            receiver.close().await?;
        }
        self.rx.close();
        Ok(())
    }
}

impl<T> Stream for MessageStream<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.terminated {
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(Notification::Next(value))) => Poll::Ready(Some(Ok(value))),
            Poll::Ready(Some(Notification::Fault(error))) => {
                this.terminated = true;
                Poll::Ready(Some(Err(error)))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Drop for MessageStream<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(receiver) = self.receiver.take() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(error) = receiver.close().await {
                        tracing::warn!(error = %error, "receiver close failed on drop");
                    }
                });
            } else {
                tracing::warn!("message stream dropped outside a runtime; receiver not closed");
            }
        }
    }
}

/// Activate one subscription: merge options, construct a receiver, register
/// the push handler, and hand back the stream that owns them.
pub(crate) async fn activate<T: Send + 'static>(
    factory: &ReceiverFactory,
    handler: MessageHandler<T>,
    error_handler: Option<ErrorHandler>,
    options: &ReducedOptions,
) -> Result<MessageStream<T>> {
    let mut merged = options.merge_onto(PushHandlerOptions::default())?;
    let receiver = factory.create().await?;

    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let terminated = Arc::new(AtomicBool::new(false));

    merged.fault_handler = Some(fault_handler(error_handler, tx.clone(), terminated.clone()));
    receiver.register_push_handler(
        push_handler(handler, tx, terminated, cancel.clone()),
        merged,
    )?;

    Ok(MessageStream {
        rx,
        receiver: Some(receiver),
        cancel,
        terminated: false,
    })
}

/// Per-message pump: run the user handler, forward each result in the order
/// it is produced, and observe cancellation between results.
fn push_handler<T: Send + 'static>(
    handler: MessageHandler<T>,
    tx: mpsc::UnboundedSender<Notification<T>>,
    terminated: Arc<AtomicBool>,
    cancel: CancellationToken,
) -> PushHandler {
    Arc::new(move |message, receiver_token| {
        let handler = handler.clone();
        let tx = tx.clone();
        let terminated = terminated.clone();
        let token = cancel.child_token();
        async move {
            let mut results = handler(message, token.clone());
            while let Some(item) = results.next().await {
                let value = item?;
                if !terminated.load(Ordering::SeqCst) {
                    let _ = tx.send(Notification::Next(value));
                }
                if token.is_cancelled() || receiver_token.is_cancelled() {
                    return Err(Box::new(StreamError::Cancelled) as HandlerError);
                }
            }
            Ok(())
        }
        .boxed()
    })
}

/// The two-branch fault policy.
///
/// With an error handler configured, every fault is forwarded to it and the
/// stream stays active; a failure *inside* the error handler is logged in
/// the fault-dispatch context and dropped. Without one, the first fault is
/// delivered as the stream's single terminal error and later results are
/// suppressed.
fn fault_handler<T: Send + 'static>(
    error_handler: Option<ErrorHandler>,
    tx: mpsc::UnboundedSender<Notification<T>>,
    terminated: Arc<AtomicBool>,
) -> FaultHandler {
    match error_handler {
        Some(user) => Arc::new(move |context: FaultContext| {
            let user = user.clone();
            async move {
                let entity_path = context.entity_path.clone();
                if let Err(error) = user(context).await {
                    tracing::error!(
                        entity = %entity_path,
                        error = %error,
                        "error handler failed"
                    );
                }
            }
            .boxed()
        }),
        None => Arc::new(move |context: FaultContext| {
            let tx = tx.clone();
            let terminated = terminated.clone();
            async move {
                if !terminated.swap(true, Ordering::SeqCst) {
                    let _ = tx.send(Notification::Fault(StreamError::Handler(context.error)));
                }
            }
            .boxed()
        }),
    }
}
