use super::schema::Database;
use super::types::{StoreError, User};
use chrono::Utc;

impl Database {
    /// Create a user. Email must be unique across tenants.
    pub async fn create_user(&self, name: &str, email: &str) -> Result<User, StoreError> {
        let now = Utc::now().timestamp();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (created_at, updated_at, name, email)
            VALUES (?, ?, ?, ?)
            RETURNING id, created_at, updated_at, name, email
        "#,
        )
        .bind(now)
        .bind(now)
        .bind(name)
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        Ok(user)
    }

    /// Look up a user by id
    pub async fn user(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, created_at, updated_at, name, email FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
