//! Command-line interface for reeltime
//!
//! This module defines the clap argument surface and the console progress
//! sink the sync command prints through.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::resolver::{Progress, DEFAULT_CONCURRENCY};

/// Reeltime - Letterboxd diary runtimes and viewing stats
#[derive(Parser, Debug)]
#[command(name = "reeltime")]
#[command(about = "Fetch film runtimes for a Letterboxd diary export and report viewing habits")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch runtimes for diary entries missing from the cache
    Sync(SyncArgs),
    /// Report viewing stats from the cache
    Stats(StatsArgs),
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Path to the Letterboxd diary export
    #[arg(long, default_value = "diary.csv")]
    pub diary: PathBuf,

    /// Path to the cache file (defaults to the user cache directory)
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Maximum number of concurrent page fetches
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Path to the cache file (defaults to the user cache directory)
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Directory the TSV reports are written to
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,
}

/// Progress sink that prints running counts to stdout
#[derive(Debug, Default)]
pub struct ConsoleProgress;

impl Progress for ConsoleProgress {
    fn begin(&mut self, pending: usize) {
        if pending > 0 {
            println!("Querying letterboxd.com for movie lengths.");
        }
    }

    fn log(&mut self, msg: &str) {
        println!("{msg}");
    }

    fn item_done(&mut self, completed: usize, pending: usize) {
        println!("Received {completed}/{pending} {}", movies_word(pending));
    }
}

/// Picks "movie"/"movies" to match a count
pub fn movies_word(count: usize) -> &'static str {
    if count == 1 {
        "movie"
    } else {
        "movies"
    }
}
