//! The continuous feed-ingestion subsystem.
//!
//! A long-lived scheduler loop selects the stalest feeds on a fixed
//! interval and runs one fetch-parse-persist task per feed on a
//! bounded-concurrency worker pool, isolating per-feed failures so one
//! broken source never stalls ingestion of the rest:
//!
//! - [`parser`] - RSS/Atom decoding into candidate posts via `feed-rs`
//! - [`fetcher`] - single-shot HTTP retrieval and the per-feed task body
//! - [`pool`] - bounded-concurrency batch runner with panic isolation
//! - [`scheduler`] - the tick loop, lifecycle handle, and outcome logging
//!
//! The subsystem reaches persistence only through the [`FeedSource`] and
//! [`PostSink`] seams, so tests can inject fake stores.

use crate::storage::{CandidatePost, Database, Feed, StoreError};
use async_trait::async_trait;

mod fetcher;
mod parser;
mod pool;
mod scheduler;

pub use fetcher::{fetch, refresh_feed, FetchError, FetchOutcome};
pub use parser::{parse_feed, ParsedFeed};
pub use pool::run_batch;
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerHandle};

// ============================================================================
// Store Seams
// ============================================================================

/// Read side of the scheduler's store dependency: the feed roster ordered
/// by staleness. No side effects.
#[async_trait]
pub trait FeedSource: Send + Sync + 'static {
    /// Up to `limit` feeds, `last_fetched_at` ascending, never-fetched first
    async fn feeds_to_refresh(&self, limit: i64) -> Result<Vec<Feed>, StoreError>;
}

/// Write side of the scheduler's store dependency: dedup-persisting posts
/// and stamping per-feed fetch freshness.
#[async_trait]
pub trait PostSink: Send + Sync + 'static {
    /// Insert candidates keyed on `(feed_id, url)`; conflicts are no-ops.
    /// Returns the number of posts actually created.
    async fn persist_new(
        &self,
        feed_id: i64,
        candidates: &[CandidatePost],
    ) -> Result<usize, StoreError>;

    /// Record a successful fetch at `fetched_at` (unix seconds)
    async fn mark_fetched(&self, feed_id: i64, fetched_at: i64) -> Result<(), StoreError>;
}

#[async_trait]
impl FeedSource for Database {
    async fn feeds_to_refresh(&self, limit: i64) -> Result<Vec<Feed>, StoreError> {
        Database::feeds_to_refresh(self, limit).await
    }
}

#[async_trait]
impl PostSink for Database {
    async fn persist_new(
        &self,
        feed_id: i64,
        candidates: &[CandidatePost],
    ) -> Result<usize, StoreError> {
        Database::persist_new(self, feed_id, candidates).await
    }

    async fn mark_fetched(&self, feed_id: i64, fetched_at: i64) -> Result<(), StoreError> {
        Database::mark_fetched(self, feed_id, fetched_at).await
    }
}
