//! In-memory message entity shared by queues and topic subscriptions.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};

use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;

use crate::message::Message;

/// A single in-memory message log with competing-consumer semantics.
///
/// Queues hold one entity; topics hold one entity per subscription. Multiple
/// receivers on the same entity compete for messages: each message is
/// delivered to exactly one of them.
pub(crate) struct Entity {
    messages: Mutex<VecDeque<Message>>,
    notify: Notify,
    sequence: AtomicI64,
}

impl Entity {
    pub(crate) fn new() -> Self {
        Self {
            messages: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            sequence: AtomicI64::new(0),
        }
    }

    /// Append a message, stamping its broker-assigned sequence number.
    pub(crate) async fn enqueue(&self, mut message: Message) {
        message.sequence_number = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.messages.lock().await.push_back(message);
        self.notify.notify_one();
    }

    /// Remove and return the next message, waiting until one arrives.
    ///
    /// Returns `None` once `cancel` fires.
    pub(crate) async fn dequeue(&self, cancel: &CancellationToken) -> Option<Message> {
        loop {
            let notified = self.notify.notified();
            if let Some(message) = self.messages.lock().await.pop_front() {
                return Some(message);
            }
            tokio::select! {
                _ = notified => {}
                _ = cancel.cancelled() => return None,
            }
        }
    }

    /// Wake every waiting consumer so it re-checks the queue.
    ///
    /// Called when a receiver detaches, so messages it was notified about
    /// are picked up by the remaining consumers.
    pub(crate) fn wake_all(&self) {
        self.notify.notify_waiters();
    }
}
