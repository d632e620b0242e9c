//! Viewing-habit reporting over the film cache
//!
//! Turns the cached records into date-sorted series: runtime per watch
//! with an expanding average, per-year slices, and monthly watch-time
//! totals. Yearly series are exported as TSV files that plot directly.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use thiserror::Error;
use tracing::warn;

use crate::cache::FilmCache;

/// Date format used by the diary export and the cache
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors that can occur when writing reports
#[derive(Debug, Error)]
pub enum StatsError {
    /// A report file could not be written
    #[error("Failed to write report {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One watched film in date order
#[derive(Debug, Clone, PartialEq)]
pub struct WatchPoint {
    /// Watched date
    pub date: NaiveDate,
    /// Runtime in minutes
    pub length: u32,
    /// Mean runtime of every watch up to and including this one
    pub average: f64,
}

/// Date-sorted viewing series derived from the cache
#[derive(Debug, Clone, Default)]
pub struct WatchSeries {
    points: Vec<WatchPoint>,
}

impl WatchSeries {
    /// Builds the series from cached records.
    ///
    /// Records whose date does not parse as `YYYY-MM-DD` are logged and
    /// skipped; a handful of bad dates should not block the report.
    pub fn from_cache(cache: &FilmCache) -> Self {
        let mut dated: Vec<(NaiveDate, u32)> = Vec::with_capacity(cache.len());
        for (uri, record) in cache.records() {
            match NaiveDate::parse_from_str(&record.date, DATE_FORMAT) {
                Ok(date) => dated.push((date, record.length)),
                Err(err) => {
                    warn!(entry = %uri, date = %record.date, %err, "skipping record with unparsable date");
                }
            }
        }
        Self::from_dated(dated)
    }

    /// Sorts the pairs and computes the expanding average
    fn from_dated(mut dated: Vec<(NaiveDate, u32)>) -> Self {
        dated.sort_unstable();

        let mut points = Vec::with_capacity(dated.len());
        let mut total: u64 = 0;
        for (index, (date, length)) in dated.into_iter().enumerate() {
            total += u64::from(length);
            points.push(WatchPoint {
                date,
                length,
                average: total as f64 / (index + 1) as f64,
            });
        }
        Self { points }
    }

    /// The points in date order
    #[allow(dead_code)]
    pub fn points(&self) -> &[WatchPoint] {
        &self.points
    }

    /// Number of watches in the series
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the series has no watches
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Distinct years in the series, ascending
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.points.iter().map(|p| p.date.year()).collect();
        years.dedup();
        years
    }

    /// Series restricted to one year, with the average restarted within
    /// the year
    pub fn year(&self, year: i32) -> WatchSeries {
        let dated = self
            .points
            .iter()
            .filter(|p| p.date.year() == year)
            .map(|p| (p.date, p.length))
            .collect();
        Self::from_dated(dated)
    }

    /// Total minutes watched per calendar month, ascending by month
    pub fn monthly_totals(&self) -> Vec<MonthTotal> {
        let mut totals: BTreeMap<(i32, u32), u64> = BTreeMap::new();
        for point in &self.points {
            *totals
                .entry((point.date.year(), point.date.month()))
                .or_insert(0) += u64::from(point.length);
        }
        totals
            .into_iter()
            .map(|((year, month), minutes)| MonthTotal {
                year,
                month,
                minutes,
            })
            .collect()
    }

    /// Total minutes across the whole series
    pub fn total_minutes(&self) -> u64 {
        self.points.iter().map(|p| u64::from(p.length)).sum()
    }

    /// Mean runtime across the whole series
    pub fn mean_runtime(&self) -> Option<f64> {
        self.points.last().map(|p| p.average)
    }

    /// Renders the series as TSV with `date`, `length`, `average` columns
    pub fn to_tsv(&self) -> String {
        let mut out = String::from("date\tlength\taverage\n");
        for point in &self.points {
            let _ = writeln!(
                out,
                "{}\t{}\t{:.1}",
                point.date, point.length, point.average
            );
        }
        out
    }
}

/// Total watch time for one calendar month
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthTotal {
    pub year: i32,
    pub month: u32,
    pub minutes: u64,
}

/// Writes one `{year}_avg.txt` TSV per year in the series.
///
/// Returns the written paths in year order.
pub fn export_yearly(series: &WatchSeries, out_dir: &Path) -> Result<Vec<PathBuf>, StatsError> {
    ensure_out_dir(out_dir)?;

    let mut paths = Vec::new();
    for year in series.years() {
        let path = out_dir.join(format!("{year}_avg.txt"));
        write_report(&path, &series.year(year).to_tsv())?;
        paths.push(path);
    }
    Ok(paths)
}

/// Writes the monthly watch-time table as `total_by_month.txt`
pub fn export_monthly(series: &WatchSeries, out_dir: &Path) -> Result<PathBuf, StatsError> {
    ensure_out_dir(out_dir)?;

    let mut out = String::from("month\tminutes\n");
    for total in series.monthly_totals() {
        let _ = writeln!(out, "{:04}-{:02}\t{}", total.year, total.month, total.minutes);
    }

    let path = out_dir.join("total_by_month.txt");
    write_report(&path, &out)?;
    Ok(path)
}

fn ensure_out_dir(out_dir: &Path) -> Result<(), StatsError> {
    fs::create_dir_all(out_dir).map_err(|source| StatsError::Write {
        path: out_dir.display().to_string(),
        source,
    })
}

fn write_report(path: &Path, content: &str) -> Result<(), StatsError> {
    fs::write(path, content).map_err(|source| StatsError::Write {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FilmRecord;
    use tempfile::TempDir;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).expect("Failed to parse test date")
    }

    fn cache_with(records: &[(&str, u32, &str)]) -> FilmCache {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut cache = FilmCache::load(temp_dir.path().join("films.json"));
        for (uri, length, watched) in records {
            cache.insert(
                uri.to_string(),
                FilmRecord {
                    length: *length,
                    date: watched.to_string(),
                },
            );
        }
        cache
    }

    #[test]
    fn test_series_is_sorted_by_date() {
        let cache = cache_with(&[
            ("C", 120, "2022-03-01"),
            ("A", 90, "2022-01-01"),
            ("B", 100, "2022-02-01"),
        ]);
        let series = WatchSeries::from_cache(&cache);

        let dates: Vec<NaiveDate> = series.points().iter().map(|p| p.date).collect();
        assert_eq!(
            dates,
            vec![date("2022-01-01"), date("2022-02-01"), date("2022-03-01")]
        );
    }

    #[test]
    fn test_expanding_average() {
        let cache = cache_with(&[
            ("A", 90, "2022-01-01"),
            ("B", 110, "2022-01-02"),
            ("C", 130, "2022-01-03"),
        ]);
        let series = WatchSeries::from_cache(&cache);

        let averages: Vec<f64> = series.points().iter().map(|p| p.average).collect();
        assert_eq!(averages, vec![90.0, 100.0, 110.0]);
    }

    #[test]
    fn test_unparsable_dates_are_skipped() {
        let cache = cache_with(&[
            ("A", 90, "2022-01-01"),
            ("B", 110, "not a date"),
        ]);
        let series = WatchSeries::from_cache(&cache);

        assert_eq!(series.len(), 1);
        assert_eq!(series.points()[0].length, 90);
    }

    #[test]
    fn test_years_are_distinct_and_ascending() {
        let cache = cache_with(&[
            ("A", 90, "2021-06-01"),
            ("B", 100, "2021-07-01"),
            ("C", 110, "2023-01-01"),
        ]);
        let series = WatchSeries::from_cache(&cache);

        assert_eq!(series.years(), vec![2021, 2023]);
    }

    #[test]
    fn test_year_slice_restarts_average() {
        let cache = cache_with(&[
            ("A", 200, "2021-06-01"),
            ("B", 90, "2022-01-01"),
            ("C", 110, "2022-02-01"),
        ]);
        let series = WatchSeries::from_cache(&cache);
        let year = series.year(2022);

        assert_eq!(year.len(), 2);
        let averages: Vec<f64> = year.points().iter().map(|p| p.average).collect();
        // The 2021 watch does not leak into the 2022 average
        assert_eq!(averages, vec![90.0, 100.0]);
    }

    #[test]
    fn test_monthly_totals_group_and_sum() {
        let cache = cache_with(&[
            ("A", 90, "2022-01-05"),
            ("B", 110, "2022-01-20"),
            ("C", 130, "2022-02-01"),
        ]);
        let series = WatchSeries::from_cache(&cache);

        assert_eq!(
            series.monthly_totals(),
            vec![
                MonthTotal {
                    year: 2022,
                    month: 1,
                    minutes: 200
                },
                MonthTotal {
                    year: 2022,
                    month: 2,
                    minutes: 130
                },
            ]
        );
    }

    #[test]
    fn test_total_and_mean() {
        let cache = cache_with(&[("A", 90, "2022-01-01"), ("B", 110, "2022-01-02")]);
        let series = WatchSeries::from_cache(&cache);

        assert_eq!(series.total_minutes(), 200);
        assert_eq!(series.mean_runtime(), Some(100.0));
    }

    #[test]
    fn test_empty_series() {
        let cache = cache_with(&[]);
        let series = WatchSeries::from_cache(&cache);

        assert!(series.is_empty());
        assert_eq!(series.mean_runtime(), None);
        assert_eq!(series.total_minutes(), 0);
        assert!(series.years().is_empty());
    }

    #[test]
    fn test_tsv_format() {
        let cache = cache_with(&[("A", 90, "2022-01-01"), ("B", 110, "2022-01-02")]);
        let series = WatchSeries::from_cache(&cache);

        let tsv = series.to_tsv();
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines[0], "date\tlength\taverage");
        assert_eq!(lines[1], "2022-01-01\t90\t90.0");
        assert_eq!(lines[2], "2022-01-02\t110\t100.0");
    }

    #[test]
    fn test_export_yearly_writes_one_file_per_year() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = cache_with(&[("A", 90, "2021-06-01"), ("B", 110, "2022-01-01")]);
        let series = WatchSeries::from_cache(&cache);

        let paths = export_yearly(&series, temp_dir.path()).expect("Export should succeed");

        assert_eq!(paths.len(), 2);
        assert!(temp_dir.path().join("2021_avg.txt").exists());
        assert!(temp_dir.path().join("2022_avg.txt").exists());

        let content = fs::read_to_string(temp_dir.path().join("2021_avg.txt"))
            .expect("Should read yearly report");
        assert!(content.starts_with("date\tlength\taverage\n"));
        assert!(content.contains("2021-06-01\t90\t90.0"));
    }

    #[test]
    fn test_export_monthly_writes_table() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = cache_with(&[("A", 90, "2022-01-05"), ("B", 110, "2022-01-20")]);
        let series = WatchSeries::from_cache(&cache);

        let path = export_monthly(&series, temp_dir.path()).expect("Export should succeed");

        let content = fs::read_to_string(path).expect("Should read monthly report");
        assert_eq!(content, "month\tminutes\n2022-01\t200\n");
    }

    #[test]
    fn test_export_creates_out_dir() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let out_dir = temp_dir.path().join("reports");
        let cache = cache_with(&[("A", 90, "2022-01-05")]);
        let series = WatchSeries::from_cache(&cache);

        export_yearly(&series, &out_dir).expect("Export should succeed");

        assert!(out_dir.join("2022_avg.txt").exists());
    }
}
