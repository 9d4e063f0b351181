//! Per-player notification streams
//!
//! The coordinator holds the writing half ([`NotificationOutbox`]) of every
//! pending player's stream and is its only writer. Dropping the outbox
//! closes the stream once buffered notifications have been read.

use crate::types::Notification;
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, Mutex};

type SharedReceiver = Arc<Mutex<mpsc::UnboundedReceiver<Notification>>>;

/// Create a connected outbox/stream pair
pub fn notification_channel() -> (NotificationOutbox, NotificationStream) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let inner = Arc::new(Mutex::new(receiver));
    let outbox = NotificationOutbox {
        sender,
        stream: Arc::downgrade(&inner),
    };
    (outbox, NotificationStream { inner })
}

/// Reading half handed to the caller of `submit_join`
///
/// Clones share one underlying stream; each notification is observed once.
#[derive(Debug, Clone)]
pub struct NotificationStream {
    inner: SharedReceiver,
}

impl NotificationStream {
    /// Wait for the next notification; `None` once the stream is closed
    pub async fn recv(&self) -> Option<Notification> {
        self.inner.lock().await.recv().await
    }

    /// Take a buffered notification without waiting
    pub fn try_recv(&self) -> Option<Notification> {
        let mut receiver = self.inner.try_lock().ok()?;
        receiver.try_recv().ok()
    }

    /// Read until the stream closes
    pub async fn collect(&self) -> Vec<Notification> {
        let mut receiver = self.inner.lock().await;
        let mut notifications = Vec::new();
        while let Some(notification) = receiver.recv().await {
            notifications.push(notification);
        }
        notifications
    }

    /// Whether both handles read from the same stream
    pub fn same_stream(&self, other: &NotificationStream) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Writing half owned by the coordinator
#[derive(Debug)]
pub struct NotificationOutbox {
    sender: mpsc::UnboundedSender<Notification>,
    stream: Weak<Mutex<mpsc::UnboundedReceiver<Notification>>>,
}

impl NotificationOutbox {
    /// Buffer a notification; `false` if nobody holds the stream any more
    pub fn deliver(&self, notification: Notification) -> bool {
        self.sender.send(notification).is_ok()
    }

    /// The stream this outbox writes to, if any holder is still alive
    pub fn attached_stream(&self) -> Option<NotificationStream> {
        self.stream
            .upgrade()
            .map(|inner| NotificationStream { inner })
    }
}
