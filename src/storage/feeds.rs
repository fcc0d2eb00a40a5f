use super::schema::Database;
use super::types::{Feed, FeedFollow, StoreError};
use chrono::Utc;

impl Database {
    /// Register a feed for a user.
    ///
    /// The URL is validated and canonical; it is immutable once created
    /// (there is no update path). Registering also follows the feed for its
    /// owner, matching the user-facing CRUD behavior.
    pub async fn create_feed(&self, name: &str, url: &str, user_id: i64) -> Result<Feed, StoreError> {
        let parsed = url::Url::parse(url).map_err(|e| StoreError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(StoreError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let now = Utc::now().timestamp();
        let feed = sqlx::query_as::<_, Feed>(
            r#"
            INSERT INTO feeds (created_at, updated_at, name, url, user_id, last_fetched_at)
            VALUES (?, ?, ?, ?, ?, NULL)
            RETURNING id, created_at, updated_at, name, url, user_id, last_fetched_at
        "#,
        )
        .bind(now)
        .bind(now)
        .bind(name)
        .bind(url)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        self.follow_feed(user_id, feed.id).await?;

        Ok(feed)
    }

    /// Select up to `limit` feeds, stalest first.
    ///
    /// Feeds that have never been fetched (NULL `last_fetched_at`) sort
    /// before everything else; ties break on id for a stable order. This is
    /// the scheduler's entire selection policy: failed feeds keep their old
    /// timestamp and reappear at the front of the next tick.
    pub async fn feeds_to_refresh(&self, limit: i64) -> Result<Vec<Feed>, StoreError> {
        let feeds = sqlx::query_as::<_, Feed>(
            r#"
            SELECT id, created_at, updated_at, name, url, user_id, last_fetched_at
            FROM feeds
            ORDER BY last_fetched_at ASC NULLS FIRST, id ASC
            LIMIT ?
        "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(feeds)
    }

    /// Stamp a feed's last successful fetch time.
    ///
    /// Called once per feed after its candidates have been persisted, and
    /// only on a successful fetch+parse — a failed feed keeps its old
    /// timestamp so staleness ordering retries it ahead of fresher feeds.
    pub async fn mark_fetched(&self, feed_id: i64, fetched_at: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE feeds SET last_fetched_at = ?, updated_at = ? WHERE id = ?")
            .bind(fetched_at)
            .bind(fetched_at)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Follow a feed. Idempotent: following twice returns the existing row.
    pub async fn follow_feed(&self, user_id: i64, feed_id: i64) -> Result<FeedFollow, StoreError> {
        let now = Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO feed_follows (created_at, user_id, feed_id)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id, feed_id) DO NOTHING
        "#,
        )
        .bind(now)
        .bind(user_id)
        .bind(feed_id)
        .execute(&self.pool)
        .await?;

        let follow = sqlx::query_as::<_, FeedFollow>(
            r#"
            SELECT id, created_at, user_id, feed_id
            FROM feed_follows
            WHERE user_id = ? AND feed_id = ?
        "#,
        )
        .bind(user_id)
        .bind(feed_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(follow)
    }

    /// Drop a user's subscription to a feed
    pub async fn unfollow_feed(&self, user_id: i64, feed_id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM feed_follows WHERE user_id = ? AND feed_id = ?")
            .bind(user_id)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Look up a feed by id
    pub async fn feed(&self, feed_id: i64) -> Result<Option<Feed>, StoreError> {
        let feed = sqlx::query_as::<_, Feed>(
            r#"
            SELECT id, created_at, updated_at, name, url, user_id, last_fetched_at
            FROM feeds
            WHERE id = ?
        "#,
        )
        .bind(feed_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(feed)
    }
}
