//! Core data models for reeltime
//!
//! This module contains the record types shared between the resolver,
//! the cache, and the reporting code, plus the Letterboxd client.

pub mod letterboxd;

#[allow(unused_imports)]
pub use letterboxd::{LetterboxdClient, LetterboxdError};

use serde::{Deserialize, Serialize};

/// A resolved film: its runtime plus the diary date it was watched on
///
/// Created once when the resolver succeeds for a diary entry and never
/// updated afterwards; re-runs skip entries that already have a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilmRecord {
    /// Runtime in whole minutes
    pub length: u32,
    /// Watched date copied from the diary entry (`YYYY-MM-DD`)
    pub date: String,
}
