use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::models::Notification;
use crate::services::aggregate::{RatingsAggregate, SqliteRatingsAggregate};
use crate::services::delivery::outbox::SqliteOutbox;
use crate::services::delivery::webhook::WebhookDelivery;
use crate::services::delivery::NotificationDelivery;
use crate::services::directory::{AccountDirectory, SqliteDirectory};

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub directory: Box<dyn AccountDirectory>,
    pub delivery: Box<dyn NotificationDelivery>,
    pub ratings: Box<dyn RatingsAggregate>,
    pub notifications_tx: broadcast::Sender<Notification>,
}

impl AppState {
    /// Wires the database-backed collaborators. Notifications go to the
    /// webhook when one is configured, otherwise to the local outbox table.
    pub fn new(conn: Connection, config: AppConfig) -> Self {
        let db = Arc::new(Mutex::new(conn));
        let (notifications_tx, _) = broadcast::channel(config.notification_channel_capacity);

        let delivery: Box<dyn NotificationDelivery> = match &config.notify_webhook_url {
            Some(url) => {
                tracing::info!(url = %url, "delivering notifications via webhook");
                Box::new(WebhookDelivery::new(
                    url.clone(),
                    config.notify_webhook_secret.clone(),
                ))
            }
            None => Box::new(SqliteOutbox::new(db.clone(), notifications_tx.clone())),
        };

        Self {
            directory: Box::new(SqliteDirectory::new(db.clone())),
            ratings: Box::new(SqliteRatingsAggregate::new(db.clone())),
            delivery,
            notifications_tx,
            config,
            db,
        }
    }
}
