//! NotificationSink port

use crate::domain::value_objects::Notification;
use async_trait::async_trait;

/// Port for outbound status reporting.
///
/// Delivery is fire-and-forget: implementations retry a bounded number of
/// times, log permanent failures, and never surface an error to the caller.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, notification: &Notification);
}
