//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of the server.
//!
//! # Tasks
//! - Notification worker: delivers queued webhook notifications
//!
//! Cache expiry is lazy, so there is no sweep task.

mod notifications;

pub use notifications::spawn_notification_worker;
