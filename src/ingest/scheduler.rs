use crate::ingest::fetcher::{refresh_feed, FetchError, FetchOutcome};
use crate::ingest::{pool, FeedSource, PostSink};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Scheduler tuning. Defaults match the production deployment: ten workers
/// on a one-minute tick with a ten-second fetch timeout.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Worker pool size; also the batch size selected per tick
    pub concurrency: usize,
    /// Time between ticks (the first tick fires immediately)
    pub interval: Duration,
    /// Per-request fetch timeout
    pub fetch_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            interval: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

/// The continuous ingestion loop.
///
/// Alternates between two states: idle (waiting on the interval timer) and
/// collecting (a batch in flight). Per tick it selects the `concurrency`
/// globally-stalest feeds, runs one task per feed on the worker pool, and
/// blocks until the batch drains — a new batch never starts while one is in
/// flight, so slow fetches delay ticks instead of stacking them.
///
/// Dependencies are injected (store, HTTP client, config) so tests can run
/// ticks against fakes and paused time.
pub struct Scheduler<S> {
    store: S,
    client: reqwest::Client,
    config: SchedulerConfig,
}

impl<S> Scheduler<S>
where
    S: FeedSource + PostSink + Clone,
{
    pub fn new(store: S, client: reqwest::Client, config: SchedulerConfig) -> Self {
        Self {
            store,
            client,
            config,
        }
    }

    /// Start the loop as a joinable background task.
    ///
    /// The returned handle is the lifecycle contract:
    /// [`SchedulerHandle::shutdown`] stops the loop gracefully and joins it.
    /// Dropping the handle also stops the loop at its next idle point, but
    /// without the join.
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        SchedulerHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            concurrency = self.config.concurrency,
            interval_secs = self.config.interval.as_secs(),
            "Scheduler started"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        // A batch that outlasts the interval delays the next tick rather
        // than bursting to catch up
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }

            // The batch is never cancelled mid-flight; shutdown is observed
            // again once it drains
            self.run_tick().await;

            if *shutdown.borrow() {
                break;
            }
        }

        tracing::info!("Scheduler stopped");
    }

    /// Execute one tick: select stalest feeds, run the batch, log outcomes.
    ///
    /// A failed feed selection skips the tick entirely (no partial batch);
    /// the next tick retries. Individual task failures are absorbed into
    /// their outcomes.
    pub async fn run_tick(&self) -> Vec<FetchOutcome> {
        let feeds = match self.store.feeds_to_refresh(self.config.concurrency as i64).await {
            Ok(feeds) => feeds,
            Err(e) => {
                tracing::warn!(error = %e, "Feed selection failed, skipping tick");
                return Vec::new();
            }
        };

        if feeds.is_empty() {
            tracing::debug!("No feeds registered, nothing to ingest");
            return Vec::new();
        }

        let batch_size = feeds.len();
        let tasks: Vec<_> = feeds
            .into_iter()
            .map(|feed| {
                let store = self.store.clone();
                let client = self.client.clone();
                let timeout = self.config.fetch_timeout;
                let key = (feed.id, feed.url.clone());
                let task = async move { refresh_feed(&store, &client, &feed, timeout).await };
                (key, task)
            })
            .collect();

        let results = pool::run_batch(tasks, self.config.concurrency).await;

        let outcomes: Vec<FetchOutcome> = results
            .into_iter()
            .map(|((feed_id, feed_url), result)| {
                let result = match result {
                    Ok(task_result) => task_result,
                    Err(join_err) => Err(FetchError::Panicked(join_err.to_string())),
                };
                FetchOutcome {
                    feed_id,
                    feed_url,
                    result,
                }
            })
            .collect();

        let mut created_total = 0;
        let mut failed = 0;
        for outcome in &outcomes {
            match &outcome.result {
                Ok(created) => {
                    created_total += created;
                    tracing::info!(
                        feed_id = outcome.feed_id,
                        url = %outcome.feed_url,
                        created = created,
                        "Feed refreshed"
                    );
                }
                Err(e) => {
                    failed += 1;
                    tracing::warn!(
                        feed_id = outcome.feed_id,
                        url = %outcome.feed_url,
                        error = %e,
                        "Feed refresh failed"
                    );
                }
            }
        }

        tracing::info!(
            batch = batch_size,
            created = created_total,
            failed = failed,
            "Tick complete"
        );

        outcomes
    }
}

/// Joinable handle to a running scheduler.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop gracefully: take no more ticks, drain the in-flight batch if
    /// there is one, then join the loop task.
    pub async fn shutdown(self) {
        // Receiver dropped means the loop already exited; join either way
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Scheduler task failed to join cleanly");
        }
    }
}
