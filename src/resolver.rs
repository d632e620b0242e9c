//! Concurrent runtime resolution
//!
//! Brings the film cache up to date with the diary: every diary entry not
//! yet cached is resolved against the film source with bounded
//! concurrency, and the results are folded into the cache by the single
//! coordinating task. A failed entry stays out of the cache and is
//! retried on the next run.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::warn;

use crate::cache::FilmCache;
use crate::data::letterboxd::{LetterboxdClient, LetterboxdError};
use crate::data::FilmRecord;
use crate::diary::Diary;

/// Maximum number of in-flight page fetches
pub const DEFAULT_CONCURRENCY: usize = 8;

/// A source of film runtimes, keyed by diary entry URI.
///
/// The production implementation is [`LetterboxdClient`]; tests substitute
/// a scripted source.
#[async_trait]
pub trait FilmSource {
    /// Resolves the runtime in minutes for a single diary entry URI
    async fn runtime_minutes(&self, entry_url: &str) -> Result<u32, LetterboxdError>;
}

#[async_trait]
impl FilmSource for LetterboxdClient {
    async fn runtime_minutes(&self, entry_url: &str) -> Result<u32, LetterboxdError> {
        LetterboxdClient::runtime_minutes(self, entry_url).await
    }
}

/// Progress sink for the resolution run.
/// Frontends implement this to surface status to users.
pub trait Progress {
    /// Called at the start with the number of entries to resolve.
    fn begin(&mut self, _pending: usize) {}

    /// Free-form status line for human eyes.
    fn log(&mut self, _msg: &str) {}

    /// Called each time one entry completes, success or failure.
    /// `completed` only ever increases and ends at `pending`.
    fn item_done(&mut self, _completed: usize, _pending: usize) {}

    /// Called at the end, successful or not.
    fn finish(&mut self) {}
}

/// A no-op progress sink.
#[allow(dead_code)]
pub struct NullProgress;
impl Progress for NullProgress {}

/// Counts reported after a resolution run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of entries in the diary
    pub diary_total: usize,
    /// Entries that already had a cache record before the run
    #[allow(dead_code)]
    pub already_cached: usize,
    /// Entries newly resolved and written to the cache this run
    pub resolved: usize,
    /// Entries that failed to resolve and stay uncached
    pub failed: usize,
}

/// Resolves every uncached diary entry and folds the results into `cache`.
///
/// At most `concurrency` fetches are in flight at once; completion order
/// is whatever the network produces. Workers only return results: the
/// cache map is touched by this task alone, so no locking is needed. Each
/// failure is logged with its entry URI and skipped.
///
/// # Arguments
/// * `source` - Where runtimes come from (the Letterboxd client in production)
/// * `diary` - The full diary mapping; cached entries are filtered out
/// * `cache` - Mutated in place; one record per successfully resolved entry
/// * `concurrency` - Upper bound on in-flight fetches (at least 1)
/// * `progress` - Receives begin/item/finish callbacks as entries complete
///
/// # Returns
/// Counts for the run: diary size, already cached, resolved, failed.
pub async fn resolve_missing<S>(
    source: &S,
    diary: &Diary,
    cache: &mut FilmCache,
    concurrency: usize,
    progress: &mut dyn Progress,
) -> RunSummary
where
    S: FilmSource + Sync,
{
    let pending: Vec<(String, String)> = diary
        .iter()
        .filter(|(uri, _)| !cache.contains(uri))
        .map(|(uri, date)| (uri.clone(), date.clone()))
        .collect();

    let diary_total = diary.len();
    let already_cached = diary_total - pending.len();
    let total_pending = pending.len();
    progress.begin(total_pending);

    let mut outcomes = stream::iter(pending.into_iter().map(|(uri, date)| async move {
        let outcome = source.runtime_minutes(&uri).await;
        (uri, date, outcome)
    }))
    .buffer_unordered(concurrency.max(1));

    let mut completed = 0;
    let mut resolved = 0;
    while let Some((uri, date, outcome)) = outcomes.next().await {
        completed += 1;
        match outcome {
            Ok(length) => {
                cache.insert(uri, FilmRecord { length, date });
                resolved += 1;
            }
            Err(err) => {
                warn!(entry = %uri, %err, "failed to resolve runtime, will retry next run");
            }
        }
        progress.item_done(completed, total_pending);
    }
    progress.finish();

    RunSummary {
        diary_total,
        already_cached,
        resolved,
        failed: total_pending - resolved,
    }
}
