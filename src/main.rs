//! Reeltime - Letterboxd diary runtimes and viewing stats
//!
//! Fetches the runtime of every film in a Letterboxd diary export,
//! caches the results on disk, and reports viewing-habit series from
//! the cache.

mod cache;
mod cli;
mod commands;
mod data;
mod diary;
mod resolver;
mod stats;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

/// Installs the log subscriber; `RUST_LOG` overrides the default filter
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reeltime=info")),
        )
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Sync(args) => commands::sync(args).await,
        Command::Stats(args) => commands::stats(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
