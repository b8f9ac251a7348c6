use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;

use crate::db::queries;

/// Dealer-level rating summary owned outside the booking core.
#[async_trait]
pub trait RatingsAggregate: Send + Sync {
    async fn record_for_dealer(&self, dealer_id: &str, score: u8) -> anyhow::Result<()>;
}

pub struct SqliteRatingsAggregate {
    db: Arc<Mutex<Connection>>,
}

impl SqliteRatingsAggregate {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RatingsAggregate for SqliteRatingsAggregate {
    async fn record_for_dealer(&self, dealer_id: &str, score: u8) -> anyhow::Result<()> {
        let db = self
            .db
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))?;
        queries::add_dealer_score(&db, dealer_id, score)?;
        Ok(())
    }
}
