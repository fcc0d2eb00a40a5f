use super::schema::Database;
use super::types::{CandidatePost, Post, StoreError};
use chrono::Utc;

impl Database {
    /// Persist candidates for a feed, returning the number of posts created.
    ///
    /// Each insert is keyed on `(feed_id, url)`; a pre-existing match is a
    /// success no-op, so partial success (some inserted, some already known)
    /// is the normal steady state. Insertion order is irrelevant.
    pub async fn persist_new(
        &self,
        feed_id: i64,
        candidates: &[CandidatePost],
    ) -> Result<usize, StoreError> {
        let now = Utc::now().timestamp();
        let mut created = 0;

        for candidate in candidates {
            let result = sqlx::query(
                r#"
                INSERT INTO posts (created_at, updated_at, title, url, description, published_at, feed_id)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(feed_id, url) DO NOTHING
            "#,
            )
            .bind(now)
            .bind(now)
            .bind(&candidate.title)
            .bind(&candidate.url)
            .bind(&candidate.description)
            .bind(candidate.published_at)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() > 0 {
                created += 1;
            }
        }

        Ok(created)
    }

    /// List a user's stream: posts from every feed the user follows,
    /// deduplicated by construction, newest published first. Posts without
    /// a published date sort last (by creation time).
    pub async fn posts_for_user(&self, user_id: i64, limit: i64) -> Result<Vec<Post>, StoreError> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT p.id, p.created_at, p.updated_at, p.title, p.url,
                   p.description, p.published_at, p.feed_id
            FROM posts p
            JOIN feed_follows ff ON ff.feed_id = p.feed_id
            WHERE ff.user_id = ?
            ORDER BY p.published_at DESC NULLS LAST, p.created_at DESC, p.id DESC
            LIMIT ?
        "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    /// List all posts for a single feed, newest published first
    pub async fn posts_for_feed(&self, feed_id: i64) -> Result<Vec<Post>, StoreError> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, created_at, updated_at, title, url,
                   description, published_at, feed_id
            FROM posts
            WHERE feed_id = ?
            ORDER BY published_at DESC NULLS LAST, created_at DESC, id DESC
        "#,
        )
        .bind(feed_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }
}
