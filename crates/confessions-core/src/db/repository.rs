//! Local confession store backed by libSQL

use std::sync::Arc;

use libsql::{Row, Value};

use super::Database;
use crate::error::{Error, Result};
use crate::models::{Confession, ConfessionId, Identity, LikeRecord};
use crate::store::ConfessionStore;
use crate::util::unix_millis_now;

/// libSQL implementation of `ConfessionStore`
#[derive(Clone)]
pub struct LibSqlConfessionStore {
    db: Arc<Database>,
}

impl LibSqlConfessionStore {
    /// Create a new store over the given database
    pub const fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Parse a confession from a database row
    fn parse_confession(row: &Row) -> Result<Confession> {
        let like_count: i64 = row.get(3)?;
        Ok(Confession {
            id: ConfessionId::new(row.get(0)?),
            text: row.get(1)?,
            created_at: row.get(2)?,
            like_count: u32::try_from(like_count.max(0)).unwrap_or(u32::MAX),
        })
    }
}

fn owner_param(identity: &Identity) -> Value {
    match identity {
        Identity::Generated(token) => Value::Text(token.clone()),
        Identity::Platform(fid) => Value::Integer(*fid),
    }
}

fn map_constraint_error(error: libsql::Error, confession_id: ConfessionId) -> Error {
    let message = error.to_string();
    if message.contains("UNIQUE constraint failed") {
        Error::Conflict(message)
    } else if message.contains("FOREIGN KEY constraint failed") {
        Error::NotFound(confession_id.to_string())
    } else {
        Error::LibSql(error)
    }
}

impl ConfessionStore for LibSqlConfessionStore {
    async fn insert_confession(&self, text: &str) -> Result<Confession> {
        let mut rows = self
            .db
            .connection()
            .query(
                "INSERT INTO confessions (text, is_anonymous, created_at, likes_count)
                 VALUES (?1, 1, ?2, 0)
                 RETURNING id, text, created_at, likes_count",
                libsql::params![text, unix_millis_now()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Self::parse_confession(&row),
            None => Err(Error::Database(
                "confession insert returned no row".to_string(),
            )),
        }
    }

    async fn list_confessions(&self, limit: usize) -> Result<Vec<Confession>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut rows = self
            .db
            .connection()
            .query(
                "SELECT id, text, created_at, likes_count
                 FROM confessions
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?1",
                libsql::params![limit],
            )
            .await?;

        let mut confessions = Vec::new();
        while let Some(row) = rows.next().await? {
            confessions.push(Self::parse_confession(&row)?);
        }
        Ok(confessions)
    }

    async fn insert_like(&self, like: &LikeRecord) -> Result<()> {
        let (column, owner) = match (&like.anonymous_user_id, like.fid) {
            (Some(token), None) => ("anonymous_user_id", Value::Text(token.clone())),
            (None, Some(fid)) => ("fid", Value::Integer(fid)),
            _ => {
                return Err(Error::InvalidInput(
                    "like record must carry exactly one identity".to_string(),
                ))
            }
        };

        self.db
            .connection()
            .execute(
                &format!(
                    "INSERT INTO likes (confession_id, {column}, created_at) VALUES (?1, ?2, ?3)"
                ),
                libsql::params![like.confession_id.get(), owner, unix_millis_now()],
            )
            .await
            .map_err(|error| map_constraint_error(error, like.confession_id))?;
        Ok(())
    }

    async fn delete_like(&self, confession_id: ConfessionId, identity: &Identity) -> Result<()> {
        let removed = self
            .db
            .connection()
            .execute(
                &format!(
                    "DELETE FROM likes WHERE confession_id = ?1 AND {} = ?2",
                    identity.owner_column()
                ),
                libsql::params![confession_id.get(), owner_param(identity)],
            )
            .await?;

        if removed == 0 {
            tracing::debug!("No like to remove for confession {}", confession_id);
        }
        Ok(())
    }

    async fn list_liked(&self, identity: &Identity) -> Result<Vec<ConfessionId>> {
        let mut rows = self
            .db
            .connection()
            .query(
                &format!(
                    "SELECT confession_id FROM likes WHERE {} = ?1 ORDER BY confession_id DESC",
                    identity.owner_column()
                ),
                libsql::params![owner_param(identity)],
            )
            .await?;

        let mut liked = Vec::new();
        while let Some(row) = rows.next().await? {
            liked.push(ConfessionId::new(row.get(0)?));
        }
        Ok(liked)
    }
}
