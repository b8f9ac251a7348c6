pub mod outbox;
pub mod webhook;

use async_trait::async_trait;

use crate::models::NotificationEvent;

/// Outbound boundary for notifications. Delivery and read-tracking happen
/// behind it; callers only learn whether the append succeeded.
#[async_trait]
pub trait NotificationDelivery: Send + Sync {
    async fn enqueue(&self, event: &NotificationEvent) -> anyhow::Result<()>;
}
