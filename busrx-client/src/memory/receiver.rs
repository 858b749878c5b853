//! Push-delivery receiver for the in-memory broker.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::connection::ReceiverClient;
use crate::error::{ClientError, Result};
use crate::handler::{FaultAction, FaultContext, PushHandler, PushHandlerOptions};
use crate::target::ReceiveMode;

use super::entity::Entity;

/// A receiver bound to one in-memory entity.
///
/// Dispatches messages to the registered push handler from a background
/// task, bounded by `max_concurrent_calls`. Closing cancels the dispatch
/// task, waits for in-flight handler invocations, and detaches from the
/// entity.
pub(crate) struct MemoryReceiver {
    entity: Arc<Entity>,
    entity_path: String,
    receive_mode: ReceiveMode,
    cancel: CancellationToken,
    dispatch: Mutex<Option<JoinHandle<()>>>,
    registered: AtomicBool,
    closed: AtomicBool,
    closes: Arc<AtomicUsize>,
}

impl MemoryReceiver {
    pub(crate) fn new(
        entity: Arc<Entity>,
        entity_path: String,
        receive_mode: ReceiveMode,
        closes: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            entity,
            entity_path,
            receive_mode,
            cancel: CancellationToken::new(),
            dispatch: Mutex::new(None),
            registered: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            closes,
        }
    }
}

#[async_trait]
impl ReceiverClient for MemoryReceiver {
    fn register_push_handler(
        &self,
        handler: PushHandler,
        options: PushHandlerOptions,
    ) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::ReceiverClosed(self.entity_path.clone()));
        }
        if self.registered.swap(true, Ordering::SeqCst) {
            return Err(ClientError::HandlerAlreadyRegistered(
                self.entity_path.clone(),
            ));
        }

        let entity = self.entity.clone();
        let entity_path = self.entity_path.clone();
        let receive_mode = self.receive_mode;
        let cancel = self.cancel.clone();

        let task = tokio::spawn(async move {
            let semaphore = Arc::new(Semaphore::new(options.max_concurrent_calls as usize));
            let mut in_flight = JoinSet::new();

            loop {
                while in_flight.try_join_next().is_some() {}

                // Take a concurrency slot before pulling a message so nothing
                // is dequeued that cannot be handled right away.
                let permit = tokio::select! {
                    permit = semaphore.clone().acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    },
                    _ = cancel.cancelled() => break,
                };

                let Some(mut message) = entity.dequeue(&cancel).await else {
                    break;
                };
                message.delivery_count += 1;
                if receive_mode == ReceiveMode::PeekLock {
                    message.lock_token = Some(Uuid::new_v4());
                }

                let handler = handler.clone();
                let fault_handler = options.fault_handler.clone();
                let token = cancel.child_token();
                let entity_path = entity_path.clone();

                in_flight.spawn(async move {
                    let _permit = permit;
                    if let Err(error) = handler(message, token).await {
                        tracing::debug!(
                            entity = %entity_path,
                            error = %error,
                            "push handler fault"
                        );
                        if let Some(fault_handler) = fault_handler {
                            fault_handler(FaultContext {
                                error: Arc::from(error),
                                entity_path,
                                action: FaultAction::UserCallback,
                            })
                            .await;
                        }
                    }
                });
            }

            // In-flight invocations are awaited, never aborted.
            while in_flight.join_next().await.is_some() {}
        });

        match self.dispatch.lock() {
            Ok(mut slot) => {
                *slot = Some(task);
                Ok(())
            }
            Err(_) => {
                task.abort();
                Err(ClientError::Connection(
                    "receiver dispatch state corrupted".to_string(),
                ))
            }
        }
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.cancel.cancel();

        let task = match self.dispatch.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        if let Some(task) = task {
            task.await.map_err(|e| {
                ClientError::Connection(format!("receiver dispatch task failed: {e}"))
            })?;
        }

        self.entity.wake_all();
        self.closes.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(entity = %self.entity_path, "receiver closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerError;
    use crate::message::Message;
    use futures::FutureExt;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn test_receiver(entity: Arc<Entity>) -> MemoryReceiver {
        MemoryReceiver::new(
            entity,
            "test-queue".to_string(),
            ReceiveMode::PeekLock,
            Arc::new(AtomicUsize::new(0)),
        )
    }

    fn forwarding_handler(tx: mpsc::UnboundedSender<Message>) -> PushHandler {
        Arc::new(move |message, _token| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(message);
                Ok(())
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn test_delivers_enqueued_messages() {
        let entity = Arc::new(Entity::new());
        let receiver = test_receiver(entity.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();

        receiver
            .register_push_handler(forwarding_handler(tx), PushHandlerOptions::default())
            .unwrap();

        entity.enqueue(Message::new("one")).await;
        entity.enqueue(Message::new("two")).await;

        let first = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let second = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first.body(), b"one");
        assert_eq!(second.body(), b"two");
        assert_eq!(first.delivery_count, 1);
        assert!(first.lock_token.is_some());

        receiver.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_second_registration_rejected() {
        let entity = Arc::new(Entity::new());
        let receiver = test_receiver(entity);
        let (tx, _rx) = mpsc::unbounded_channel();

        receiver
            .register_push_handler(forwarding_handler(tx.clone()), PushHandlerOptions::default())
            .unwrap();
        let result =
            receiver.register_push_handler(forwarding_handler(tx), PushHandlerOptions::default());
        assert!(matches!(
            result,
            Err(ClientError::HandlerAlreadyRegistered(_))
        ));

        receiver.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_registration_after_close_rejected() {
        let entity = Arc::new(Entity::new());
        let receiver = test_receiver(entity);
        receiver.close().await.unwrap();

        let (tx, _rx) = mpsc::unbounded_channel();
        let result =
            receiver.register_push_handler(forwarding_handler(tx), PushHandlerOptions::default());
        assert!(matches!(result, Err(ClientError::ReceiverClosed(_))));
    }

    #[tokio::test]
    async fn test_handler_fault_routed_to_fault_callback() {
        let entity = Arc::new(Entity::new());
        let receiver = test_receiver(entity.clone());
        let (fault_tx, mut fault_rx) = mpsc::unbounded_channel();

        let handler: PushHandler = Arc::new(|_message, _token| {
            async { Err(HandlerError::from("boom")) }.boxed()
        });
        let fault_handler = Arc::new(move |context: FaultContext| {
            let fault_tx = fault_tx.clone();
            async move {
                let _ = fault_tx.send(context);
            }
            .boxed()
        });

        receiver
            .register_push_handler(
                handler,
                PushHandlerOptions {
                    fault_handler: Some(fault_handler),
                    ..PushHandlerOptions::default()
                },
            )
            .unwrap();

        entity.enqueue(Message::new("doomed")).await;

        let context = tokio::time::timeout(Duration::from_secs(1), fault_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(context.error.to_string(), "boom");
        assert_eq!(context.entity_path, "test-queue");
        assert_eq!(context.action, FaultAction::UserCallback);

        receiver.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let entity = Arc::new(Entity::new());
        let receiver = test_receiver(entity.clone());

        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();

        let handler: PushHandler = {
            let active = active.clone();
            let peak = peak.clone();
            Arc::new(move |_message, _token| {
                let active = active.clone();
                let peak = peak.clone();
                let done_tx = done_tx.clone();
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    let _ = done_tx.send(());
                    Ok(())
                }
                .boxed()
            })
        };

        receiver
            .register_push_handler(
                handler,
                PushHandlerOptions {
                    max_concurrent_calls: 2,
                    ..PushHandlerOptions::default()
                },
            )
            .unwrap();

        for i in 0..6 {
            entity.enqueue(Message::new(format!("m{i}"))).await;
        }
        for _ in 0..6 {
            tokio::time::timeout(Duration::from_secs(2), done_rx.recv())
                .await
                .unwrap()
                .unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        receiver.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_waits_for_in_flight_handler() {
        let entity = Arc::new(Entity::new());
        let receiver = test_receiver(entity.clone());

        let finished = Arc::new(AtomicBool::new(false));
        let handler: PushHandler = {
            let finished = finished.clone();
            Arc::new(move |_message, _token| {
                let finished = finished.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    finished.store(true, Ordering::SeqCst);
                    Ok(())
                }
                .boxed()
            })
        };

        receiver
            .register_push_handler(handler, PushHandlerOptions::default())
            .unwrap();
        entity.enqueue(Message::new("slow")).await;

        // Give the dispatch task time to start the invocation.
        tokio::time::sleep(Duration::from_millis(10)).await;
        receiver.close().await.unwrap();
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let entity = Arc::new(Entity::new());
        let closes = Arc::new(AtomicUsize::new(0));
        let receiver = MemoryReceiver::new(
            entity,
            "test-queue".to_string(),
            ReceiveMode::PeekLock,
            closes.clone(),
        );

        receiver.close().await.unwrap();
        receiver.close().await.unwrap();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
