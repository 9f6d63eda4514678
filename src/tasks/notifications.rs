//! Notification Worker Task
//!
//! Background task that drains the notification queue and delivers each
//! webhook in its own task, bounded by a timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::notify::{Notification, NotificationError, NotificationSink};

/// Spawns the worker that delivers queued notifications.
///
/// Deliveries run concurrently so one slow endpoint does not hold up the
/// rest. Each gets exactly one attempt. The worker exits once every
/// dispatcher has been dropped and the queue is drained.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
pub fn spawn_notification_worker(
    mut rx: mpsc::Receiver<Notification>,
    sink: Arc<dyn NotificationSink>,
    delivery_timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting notification worker with {}s delivery timeout",
            delivery_timeout.as_secs()
        );

        while let Some(notification) = rx.recv().await {
            let sink = Arc::clone(&sink);
            tokio::spawn(async move {
                deliver_once(sink.as_ref(), &notification, delivery_timeout).await;
            });
        }

        info!("Notification worker stopped");
    })
}

async fn deliver_once(
    sink: &dyn NotificationSink,
    notification: &Notification,
    delivery_timeout: Duration,
) {
    let result = match timeout(
        delivery_timeout,
        sink.deliver(&notification.endpoint, &notification.payload),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(NotificationError::Timeout),
    };

    match result {
        Ok(()) => info!(
            request_id = %notification.payload.request_id,
            "Webhook sent successfully to {}", notification.endpoint
        ),
        Err(err) => warn!(
            request_id = %notification.payload.request_id,
            endpoint = %notification.endpoint,
            error = %err,
            "Webhook delivery failed"
        ),
    }
}
