//! Film cache storage: JSON file with an update timestamp envelope

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::data::FilmRecord;

/// On-disk envelope for the cache file
///
/// Generic over the map type so saving can borrow the in-memory map while
/// loading owns it.
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile<T> {
    /// When the cache was last written
    updated_at: DateTime<Utc>,
    /// Resolved films keyed by diary entry URI
    films: T,
}

/// Errors that can occur when persisting the cache
///
/// Loading never errors: absent and corrupt files both start an empty
/// cache. Failing to write the cache back is fatal because it would lose
/// the run's work.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Writing the cache file or its parent directory failed
    #[error("Failed to write cache file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The cache could not be serialized
    #[error("Failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// In-memory film cache bound to an on-disk location
///
/// Records are inserted at most once per URI and never updated, so the
/// cache only grows across runs.
#[derive(Debug, Clone)]
pub struct FilmCache {
    /// Where the cache is persisted
    path: PathBuf,
    /// Resolved films keyed by diary entry URI
    films: HashMap<String, FilmRecord>,
}

impl FilmCache {
    /// Default cache file location under the XDG cache directory
    ///
    /// Uses `~/.cache/reeltime/films.json` on Linux, or the equivalent
    /// path on other platforms. Returns `None` if the cache directory
    /// cannot be determined (e.g., no home directory).
    pub fn default_path() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "reeltime")?;
        Some(project_dirs.cache_dir().join("films.json"))
    }

    /// Loads the cache from `path`.
    ///
    /// A missing file starts an empty cache. An unreadable or corrupt file
    /// is logged and also starts empty, so a bad cache file never blocks a
    /// run; the next successful save replaces it.
    pub fn load(path: PathBuf) -> Self {
        let films = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<CacheFile<HashMap<String, FilmRecord>>>(
                &content,
            ) {
                Ok(file) => file.films,
                Err(err) => {
                    warn!(path = %path.display(), %err, "cache file is corrupt, starting empty");
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no cache file found, starting empty");
                HashMap::new()
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "cache file is unreadable, starting empty");
                HashMap::new()
            }
        };
        Self { path, films }
    }

    /// Writes the cache back to its on-disk location.
    ///
    /// The file goes to a temporary sibling first and is renamed into
    /// place, so a failed write never truncates the previous cache.
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err(CacheError)` if serialization, directory creation, or the
    ///   write itself fails
    pub fn save(&self) -> Result<(), CacheError> {
        let envelope = CacheFile {
            updated_at: Utc::now(),
            films: &self.films,
        };
        let json = serde_json::to_string_pretty(&envelope)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| self.write_error(source))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| self.write_error(source))?;
        fs::rename(&tmp, &self.path).map_err(|source| self.write_error(source))?;
        Ok(())
    }

    fn write_error(&self, source: std::io::Error) -> CacheError {
        CacheError::Write {
            path: self.path.display().to_string(),
            source,
        }
    }

    /// True if a record exists for this diary entry URI
    pub fn contains(&self, uri: &str) -> bool {
        self.films.contains_key(uri)
    }

    /// Returns the record for a diary entry URI, if present
    #[allow(dead_code)]
    pub fn get(&self, uri: &str) -> Option<&FilmRecord> {
        self.films.get(uri)
    }

    /// Inserts a record for a URI unless one already exists.
    ///
    /// Existing records win: a cached film is never re-resolved or
    /// overwritten.
    pub fn insert(&mut self, uri: String, record: FilmRecord) {
        self.films.entry(uri).or_insert(record);
    }

    /// All cached records keyed by diary entry URI
    pub fn records(&self) -> &HashMap<String, FilmRecord> {
        &self.films
    }

    /// Number of cached records
    pub fn len(&self) -> usize {
        self.films.len()
    }

    /// True if nothing is cached yet
    pub fn is_empty(&self) -> bool {
        self.films.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(length: u32, date: &str) -> FilmRecord {
        FilmRecord {
            length,
            date: date.to_string(),
        }
    }

    fn temp_cache() -> (FilmCache, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = FilmCache::load(temp_dir.path().join("films.json"));
        (cache, temp_dir)
    }

    #[test]
    fn test_load_missing_file_starts_empty() {
        let (cache, _temp_dir) = temp_cache();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let (mut cache, temp_dir) = temp_cache();
        cache.insert("https://boxd.it/aaaa".to_string(), record(101, "2022-01-01"));
        cache.insert("https://boxd.it/bbbb".to_string(), record(155, "2022-01-02"));
        cache.save().expect("Save should succeed");

        let reloaded = FilmCache::load(temp_dir.path().join("films.json"));
        assert_eq!(reloaded.len(), 2);
        assert_eq!(
            reloaded.get("https://boxd.it/aaaa"),
            Some(&record(101, "2022-01-01"))
        );
        assert_eq!(
            reloaded.get("https://boxd.it/bbbb"),
            Some(&record(155, "2022-01-02"))
        );
    }

    #[test]
    fn test_load_corrupt_file_starts_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("films.json");
        fs::write(&path, "not json at all {").expect("Failed to write corrupt file");

        let cache = FilmCache::load(path);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_replaced_on_save() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("films.json");
        fs::write(&path, "garbage").expect("Failed to write corrupt file");

        let mut cache = FilmCache::load(path.clone());
        cache.insert("https://boxd.it/aaaa".to_string(), record(90, "2022-02-02"));
        cache.save().expect("Save should succeed");

        let reloaded = FilmCache::load(path);
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("nested").join("dir").join("films.json");

        let mut cache = FilmCache::load(path.clone());
        cache.insert("https://boxd.it/aaaa".to_string(), record(101, "2022-01-01"));
        cache.save().expect("Save should succeed");

        assert!(path.exists(), "Cache file should exist");
    }

    #[test]
    fn test_save_leaves_no_temp_file_behind() {
        let (mut cache, temp_dir) = temp_cache();
        cache.insert("https://boxd.it/aaaa".to_string(), record(101, "2022-01-01"));
        cache.save().expect("Save should succeed");

        assert!(!temp_dir.path().join("films.json.tmp").exists());
        assert!(temp_dir.path().join("films.json").exists());
    }

    #[test]
    fn test_insert_does_not_overwrite_existing_record() {
        let (mut cache, _temp_dir) = temp_cache();
        cache.insert("https://boxd.it/aaaa".to_string(), record(101, "2022-01-01"));
        cache.insert("https://boxd.it/aaaa".to_string(), record(999, "2030-01-01"));

        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get("https://boxd.it/aaaa"),
            Some(&record(101, "2022-01-01"))
        );
    }

    #[test]
    fn test_saved_file_carries_updated_at_envelope() {
        let (mut cache, temp_dir) = temp_cache();
        cache.insert("https://boxd.it/aaaa".to_string(), record(101, "2022-01-01"));
        cache.save().expect("Save should succeed");

        let content = fs::read_to_string(temp_dir.path().join("films.json"))
            .expect("Should read cache file");
        assert!(content.contains("\"updated_at\""));
        assert!(content.contains("\"films\""));
    }

    #[test]
    fn test_default_path_mentions_project_name() {
        if let Some(path) = FilmCache::default_path() {
            assert!(path.to_string_lossy().contains("reeltime"));
        }
        // Passes if default_path() is None (e.g., no home directory in CI)
    }
}
