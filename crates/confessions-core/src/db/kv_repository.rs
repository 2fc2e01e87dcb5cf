//! Device-local key/value repository

use std::sync::Arc;

use super::Database;
use crate::error::Result;

/// Trait for device-local key/value storage (async)
#[allow(async_fn_in_trait)]
pub trait KeyValueStore {
    /// Read a value, `None` when the key was never written
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace a value
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

impl<T: KeyValueStore> KeyValueStore for &T {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value).await
    }
}

/// libSQL implementation of `KeyValueStore` over the `settings` table
#[derive(Clone)]
pub struct LibSqlKeyValueStore {
    db: Arc<Database>,
}

impl LibSqlKeyValueStore {
    /// Create a new repository over the given database
    pub const fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl KeyValueStore for LibSqlKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .db
            .connection()
            .query("SELECT value FROM settings WHERE key = ?", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            let value: String = row.get(0)?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .connection()
            .execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }
}
