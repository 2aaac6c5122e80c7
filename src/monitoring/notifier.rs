//! Notification sink abstraction

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::monitoring::notification::Notification;
use crate::utils::AppError;

/// Accepts a formatted notification
///
/// The processor decides whether and what to send; implementations own transport.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification. `Ok` means the sink accepted it.
    async fn send(&self, notification: &Notification, now: DateTime<Utc>) -> Result<(), AppError>;

    /// Tell the channel that a run could not check the feed
    async fn send_monitor_error(&self, error: &str, now: DateTime<Utc>) -> Result<(), AppError>;
}
