//! Non-blocking hand-off of notifications to the background worker.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::warn;

use super::{NotificationError, NotificationSink, WebhookPayload};
use crate::tasks::spawn_notification_worker;

/// One pending delivery.
#[derive(Debug, Clone)]
pub struct Notification {
    pub endpoint: String,
    pub payload: WebhookPayload,
}

/// Sending half of the notification queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<Notification>,
}

impl NotificationDispatcher {
    /// Creates a dispatcher and the receiving end for a worker.
    pub fn channel(capacity: NonZeroUsize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity.get());
        (Self { tx }, rx)
    }

    /// Creates a dispatcher with a running worker that delivers through `sink`.
    pub fn spawn(
        sink: Arc<dyn NotificationSink>,
        capacity: NonZeroUsize,
        delivery_timeout: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (dispatcher, rx) = Self::channel(capacity);
        let handle = spawn_notification_worker(rx, sink, delivery_timeout);
        (dispatcher, handle)
    }

    /// Queues a notification without waiting.
    ///
    /// A full or closed queue drops the notification; the error is logged
    /// here and returned for callers that care.
    pub fn dispatch(
        &self,
        endpoint: impl Into<String>,
        payload: WebhookPayload,
    ) -> Result<(), NotificationError> {
        let notification = Notification {
            endpoint: endpoint.into(),
            payload,
        };

        self.tx.try_send(notification).map_err(|err| {
            let (reason, notification) = match err {
                TrySendError::Full(n) => (NotificationError::QueueFull, n),
                TrySendError::Closed(n) => (NotificationError::Closed, n),
            };
            warn!(
                request_id = %notification.payload.request_id,
                endpoint = %notification.endpoint,
                error = %reason,
                "dropping webhook notification"
            );
            reason
        })
    }
}
