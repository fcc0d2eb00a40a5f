use crate::ingest::parser::{parse_feed, ParsedFeed};
use crate::ingest::PostSink;
use crate::storage::{Feed, StoreError};
use chrono::Utc;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Failure of a single feed's ingestion task.
///
/// Every variant is per-feed: it is caught at the task boundary, logged, and
/// absorbed — the feed keeps its stale timestamp and is retried on a later
/// tick. Nothing here is fatal to the scheduler.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the configured fetch timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// HTTP response with non-2xx status code
    #[error("http error: status {0}")]
    HttpStatus(u16),
    /// Response body exceeded the 10MB size limit
    #[error("response too large")]
    ResponseTooLarge,
    /// Document could not be parsed as RSS or Atom
    #[error("parse error: {0}")]
    Parse(String),
    /// The store failed while persisting posts or stamping freshness
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The task panicked; converted to a value by the worker pool
    #[error("task panicked: {0}")]
    Panicked(String),
}

/// Outcome of one feed's fetch-parse-persist task.
///
/// Consumed for logging only; the durable effects are the post rows and the
/// feed's `last_fetched_at` stamp.
#[derive(Debug)]
pub struct FetchOutcome {
    pub feed_id: i64,
    pub feed_url: String,
    /// Count of posts created, or the error that stopped the task
    pub result: Result<usize, FetchError>,
}

/// Fetch a feed document and decode it into candidate posts.
///
/// One GET, one bounded timeout, no retry and no caching — the call is
/// stateless and idempotent, and repeating it on a later tick *is* the
/// retry mechanism.
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<ParsedFeed, FetchError> {
    // The timeout bounds the whole exchange, headers and body both — a
    // server that returns 200 and then trickles its body cannot hold a
    // worker past it.
    let bytes = tokio::time::timeout(timeout, async {
        let response = client.get(url).send().await.map_err(FetchError::Network)?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, MAX_FEED_SIZE).await
    })
    .await
    .map_err(|_| FetchError::Timeout(timeout))??;

    parse_feed(&bytes).map_err(|e| FetchError::Parse(e.to_string()))
}

/// Run one feed end-to-end: fetch, parse, persist, stamp freshness.
///
/// `mark_fetched` runs only after a successful fetch+parse+persist; on any
/// failure the timestamp is left untouched so staleness ordering retries the
/// feed ahead of fresher ones next tick.
pub async fn refresh_feed<S: PostSink>(
    store: &S,
    client: &reqwest::Client,
    feed: &Feed,
    timeout: Duration,
) -> Result<usize, FetchError> {
    let parsed = fetch(client, &feed.url, timeout).await?;

    if parsed.dropped > 0 {
        tracing::warn!(
            feed_id = feed.id,
            url = %feed.url,
            dropped = parsed.dropped,
            "Items without a link dropped"
        );
    }

    let created = store.persist_new(feed.id, &parsed.posts).await?;
    store.mark_fetched(feed.id, Utc::now().timestamp()).await?;

    Ok(created)
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: trust Content-Length when present
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
