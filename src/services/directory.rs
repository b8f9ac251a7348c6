use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::UserProfile;

/// Read-only view of the account directory. Ids stay opaque to the booking
/// core; the directory only labels recipients and backs actor checks.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn resolve_user(&self, id: &str) -> anyhow::Result<Option<UserProfile>>;
}

pub struct SqliteDirectory {
    db: Arc<Mutex<Connection>>,
}

impl SqliteDirectory {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountDirectory for SqliteDirectory {
    async fn resolve_user(&self, id: &str) -> anyhow::Result<Option<UserProfile>> {
        let db = self
            .db
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))?;
        Ok(queries::get_user(&db, id)?)
    }
}

/// Display name for `id`, falling back to the id itself.
pub async fn display_name(directory: &dyn AccountDirectory, id: &str) -> String {
    match directory.resolve_user(id).await {
        Ok(Some(user)) if !user.display_name.trim().is_empty() => user.display_name,
        Ok(_) => id.to_string(),
        Err(e) => {
            tracing::warn!(user_id = id, error = %e, "account directory lookup failed");
            id.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::Role;

    fn directory() -> SqliteDirectory {
        let conn = db::init_db(":memory:").unwrap();
        queries::save_user(
            &conn,
            &UserProfile {
                id: "dealer-d".to_string(),
                role: Role::Dealer,
                display_name: "Green Valley Traders".to_string(),
                contact_info: Some("+254700000000".to_string()),
            },
        )
        .unwrap();
        SqliteDirectory::new(Arc::new(Mutex::new(conn)))
    }

    #[tokio::test]
    async fn test_resolve_known_user() {
        let directory = directory();
        let user = directory.resolve_user("dealer-d").await.unwrap().unwrap();
        assert_eq!(user.role, Role::Dealer);
        assert_eq!(user.contact_info.as_deref(), Some("+254700000000"));
        assert!(directory.resolve_user("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_display_name_falls_back_to_id() {
        let directory = directory();
        assert_eq!(display_name(&directory, "dealer-d").await, "Green Valley Traders");
        assert_eq!(display_name(&directory, "farmer-x").await, "farmer-x");
    }
}
