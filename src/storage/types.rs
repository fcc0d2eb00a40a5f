use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Store-level errors.
///
/// `Unavailable` is the transient infrastructure fault: the scheduler skips
/// the whole tick on a failed feed selection and aborts only the affected
/// task on a failed write. `Conflict` and `InvalidUrl` are permanent user
/// errors on the creation paths, never retried.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying store could not be reached or the query failed
    #[error("store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    /// A unique constraint rejected the write (e.g. duplicate feed URL)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Schema migration failed at open
    #[error("store migration failed: {0}")]
    Migration(String),

    /// Feed URL rejected at creation time
    #[error("invalid feed url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl StoreError {
    /// Classify a sqlx error: unique-constraint violations are permanent
    /// conflicts, everything else is treated as the store being unavailable
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return StoreError::Conflict(db_err.to_string());
            }
        }
        StoreError::Unavailable(err)
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A registered user. Owns feeds and follows feeds other users registered.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub name: String,
    pub email: String,
}

/// A subscribed content source.
///
/// `url` is immutable once created — there is no update path. The scheduler
/// is the only writer of `last_fetched_at`; `None` means the feed has never
/// been fetched and sorts as maximally stale.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Feed {
    pub id: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub name: String,
    pub url: String,
    pub user_id: i64,
    pub last_fetched_at: Option<i64>,
}

/// A user's subscription to a feed
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedFollow {
    pub id: i64,
    pub created_at: i64,
    pub user_id: i64,
    pub feed_id: i64,
}

/// A durable post. Created exactly once per distinct link URL per feed
/// (enforced by the `(feed_id, url)` unique constraint), never mutated.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<i64>,
    pub feed_id: i64,
}

/// A transient item parsed from a feed document, before dedup.
///
/// The link URL is required — parser output never contains a candidate
/// without one. Absent descriptions and unparsable dates are `None`, never
/// empty strings or synthetic timestamps.
#[derive(Debug, Clone)]
pub struct CandidatePost {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<i64>,
}
