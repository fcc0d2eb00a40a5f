use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::StoreError;

// ============================================================================
// Database
// ============================================================================

/// Handle to the aggregation store. Cheap to clone (pooled connections).
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database connection and run migrations.
    ///
    /// The scheduler's workers share this pool; SQLite serializes conflicting
    /// writes itself, so the application layer does no locking.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // busy_timeout=5000: wait up to 5s for locks to release before
        // returning SQLITE_BUSY, covering contention between concurrent
        // worker upserts. Set via pragma so every pooled connection
        // inherits it.
        let options = SqliteConnectOptions::from_str(&url)?.pragma("busy_timeout", "5000");

        // In-memory databases are per-connection in SQLite, so tests that
        // open ":memory:" must not fan out across pool connections.
        let max_connections = if path == ":memory:" { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate()
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        Ok(db)
    }

    /// Run schema migrations atomically within a transaction.
    ///
    /// All statements use `IF NOT EXISTS`, so re-running against an existing
    /// database is a no-op. If any step fails the transaction rolls back and
    /// the database keeps its previous consistent state.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        // Per-connection setting, must run outside the transaction
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&self.pool)
            .await?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                name TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feeds (
                id INTEGER PRIMARY KEY,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                name TEXT NOT NULL,
                url TEXT UNIQUE NOT NULL,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                last_fetched_at INTEGER
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feed_follows (
                id INTEGER PRIMARY KEY,
                created_at INTEGER NOT NULL,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                feed_id INTEGER NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
                UNIQUE(user_id, feed_id)
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // The (feed_id, url) unique constraint is the dedup boundary for the
        // ingestion sink: a conflicting insert is a success no-op.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                title TEXT NOT NULL,
                url TEXT NOT NULL,
                description TEXT,
                published_at INTEGER,
                feed_id INTEGER NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
                UNIQUE(feed_id, url)
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Staleness-ordered selection scans this index each tick
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_feeds_last_fetched ON feeds(last_fetched_at)",
        )
        .execute(&mut *tx)
        .await?;

        // Covers the per-user post listing (join over follows, newest first)
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_posts_feed_published ON posts(feed_id, published_at DESC)",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_feed_follows_user ON feed_follows(user_id)",
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
