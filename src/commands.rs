//! Top-level command implementations
//!
//! Wires the diary loader, resolver, cache, and reporting together for
//! the CLI entry point. The pipeline itself is generic over the film
//! source so it can run against a scripted source in tests.

use std::path::PathBuf;

use thiserror::Error;

use crate::cache::{CacheError, FilmCache};
use crate::cli::{movies_word, ConsoleProgress, StatsArgs, SyncArgs};
use crate::data::LetterboxdClient;
use crate::diary::{Diary, DiaryError};
use crate::resolver::{self, FilmSource, Progress, RunSummary};
use crate::stats::{self, StatsError, WatchSeries};

/// Errors that abort a command
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Diary(#[from] DiaryError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Stats(#[from] StatsError),

    /// No --cache flag and no determinable user cache directory
    #[error("Could not determine a cache location; pass --cache")]
    NoCachePath,
}

/// Resolves the cache file location: explicit flag or XDG default
fn cache_path(explicit: Option<PathBuf>) -> Result<PathBuf, CommandError> {
    match explicit {
        Some(path) => Ok(path),
        None => FilmCache::default_path().ok_or(CommandError::NoCachePath),
    }
}

/// Runs the sync command against letterboxd.com and prints the summary
pub async fn sync(args: SyncArgs) -> Result<(), CommandError> {
    let client = LetterboxdClient::new();
    let mut progress = ConsoleProgress;
    let summary = sync_with_source(
        &client,
        &args.diary,
        cache_path(args.cache)?,
        args.concurrency,
        &mut progress,
    )
    .await?;

    if summary.failed > 0 {
        println!(
            "{} {} could not be resolved and will be retried next run.",
            summary.failed,
            movies_word(summary.failed)
        );
    }
    println!(
        "{} new {} found.",
        summary.resolved,
        movies_word(summary.resolved)
    );
    println!(
        "{} {} in the diary.",
        summary.diary_total,
        movies_word(summary.diary_total)
    );
    Ok(())
}

/// Sync pipeline over any film source.
///
/// Loads the diary (fatal if missing), loads the cache (missing or
/// corrupt starts empty), resolves the complement, and persists the
/// cache. Once the cache is loaded every exit path persists what was
/// accumulated, so a late failure keeps the run's work.
pub async fn sync_with_source<S>(
    source: &S,
    diary_path: &std::path::Path,
    cache_path: PathBuf,
    concurrency: usize,
    progress: &mut dyn Progress,
) -> Result<RunSummary, CommandError>
where
    S: FilmSource + Sync,
{
    let diary = Diary::load(diary_path)?;
    let mut cache = FilmCache::load(cache_path);

    if cache.is_empty() {
        progress.log("No cached data found.");
    } else {
        progress.log(&format!(
            "Found cached data, {} {} in the cache.",
            cache.len(),
            movies_word(cache.len())
        ));
    }

    let summary =
        resolver::resolve_missing(source, &diary, &mut cache, concurrency, progress).await;
    cache.save()?;
    Ok(summary)
}

/// Runs the stats command: prints a summary and writes the TSV reports
pub fn stats(args: StatsArgs) -> Result<(), CommandError> {
    let cache = FilmCache::load(cache_path(args.cache)?);
    if cache.is_empty() {
        println!("No cached data found. Run `reeltime sync` first.");
        return Ok(());
    }
    println!("Found cached data. Building reports.");

    let series = WatchSeries::from_cache(&cache);
    let yearly_paths = stats::export_yearly(&series, &args.out_dir)?;
    let monthly_path = stats::export_monthly(&series, &args.out_dir)?;

    println!(
        "{} {} watched, {} minutes total.",
        series.len(),
        movies_word(series.len()),
        series.total_minutes()
    );
    if let Some(mean) = series.mean_runtime() {
        println!("Average runtime: {mean:.1} minutes.");
    }
    for path in yearly_paths {
        println!("Wrote {}", path.display());
    }
    println!("Wrote {}", monthly_path.display());
    Ok(())
}
