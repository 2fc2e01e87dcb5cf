//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        migrate_v1(conn).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Migration to version 1: confessions, likes and local settings
async fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    let statements = [
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        "CREATE TABLE IF NOT EXISTS confessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            text TEXT NOT NULL,
            is_anonymous INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            likes_count INTEGER NOT NULL DEFAULT 0 CHECK (likes_count >= 0)
        )",
        "CREATE INDEX IF NOT EXISTS idx_confessions_created ON confessions(created_at DESC)",
        // Exactly one identity column per like
        "CREATE TABLE IF NOT EXISTS likes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            confession_id INTEGER NOT NULL REFERENCES confessions(id) ON DELETE CASCADE,
            anonymous_user_id TEXT,
            fid INTEGER,
            created_at INTEGER NOT NULL,
            CHECK ((anonymous_user_id IS NULL) <> (fid IS NULL))
        )",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_likes_anonymous
            ON likes(confession_id, anonymous_user_id) WHERE anonymous_user_id IS NOT NULL",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_likes_fid
            ON likes(confession_id, fid) WHERE fid IS NOT NULL",
        // Like counts are owned by the store
        "CREATE TRIGGER IF NOT EXISTS likes_ai AFTER INSERT ON likes BEGIN
            UPDATE confessions SET likes_count = likes_count + 1 WHERE id = NEW.confession_id;
        END",
        "CREATE TRIGGER IF NOT EXISTS likes_ad AFTER DELETE ON likes BEGIN
            UPDATE confessions SET likes_count = MAX(likes_count - 1, 0) WHERE id = OLD.confession_id;
        END",
        // Settings table (device-local key/value)
        "CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        "INSERT INTO schema_version (version) VALUES (1)",
    ];

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}
