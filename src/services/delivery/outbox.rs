use std::sync::{Arc, Mutex};

use anyhow::Context;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::broadcast;

use super::NotificationDelivery;
use crate::db::queries;
use crate::models::{self, Notification, NotificationEvent};

/// Appends events to the `notifications` table and fans them out to live
/// subscribers.
pub struct SqliteOutbox {
    db: Arc<Mutex<Connection>>,
    live_tx: broadcast::Sender<Notification>,
}

impl SqliteOutbox {
    pub fn new(db: Arc<Mutex<Connection>>, live_tx: broadcast::Sender<Notification>) -> Self {
        Self { db, live_tx }
    }
}

#[async_trait]
impl NotificationDelivery for SqliteOutbox {
    async fn enqueue(&self, event: &NotificationEvent) -> anyhow::Result<()> {
        let created_at = models::now();
        let id = {
            let db = self
                .db
                .lock()
                .map_err(|_| anyhow::anyhow!("database lock poisoned"))?;
            queries::insert_notification(&db, event, created_at)
                .context("failed to append notification to outbox")?
        };

        let stored = Notification {
            id,
            recipient_id: event.recipient_id.clone(),
            kind: event.kind,
            title: event.title.clone(),
            message: event.message.clone(),
            booking_id: event.booking_id.clone(),
            created_at,
        };
        // No subscribers is fine
        let _ = self.live_tx.send(stored);

        Ok(())
    }
}
