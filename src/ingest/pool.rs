use futures::stream::{self, StreamExt};
use std::future::Future;
use tokio::task::JoinError;

/// Run a batch of keyed tasks with bounded concurrency, returning every
/// outcome paired with its key.
///
/// At most `concurrency` tasks execute simultaneously. Each task runs in its
/// own spawned tokio task, so a panic is caught as a `JoinError` and returned
/// as a value — it never terminates a sibling task or the caller. Completion
/// order across workers is unordered.
pub async fn run_batch<K, F, T>(
    tasks: Vec<(K, F)>,
    concurrency: usize,
) -> Vec<(K, Result<T, JoinError>)>
where
    K: Send + 'static,
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    stream::iter(tasks)
        .map(|(key, task)| async move { (key, tokio::spawn(task).await) })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await
}
