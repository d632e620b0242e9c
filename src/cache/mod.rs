//! Persisted film cache
//!
//! This module provides the on-disk cache of resolved film runtimes. The
//! cache is the system's only durable state: it is loaded once at the
//! start of a run, mutated in memory by the resolver, and written back
//! atomically at the end. A missing or corrupt cache file starts a run
//! from empty rather than failing it.

mod store;

pub use store::{CacheError, FilmCache};
