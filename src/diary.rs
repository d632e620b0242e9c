//! Letterboxd diary export loader
//!
//! Parses the `diary.csv` file exported from letterboxd.com into a mapping
//! from diary entry URI to watched date. Only two of the export's columns
//! are used; everything else (ratings, rewatch flags, tags) is ignored.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use thiserror::Error;

/// Column index of the diary entry URI in the export
const URI_COLUMN: usize = 3;

/// Column index of the watched date in the export
const DATE_COLUMN: usize = 7;

/// Value of the URI column on the header record
const HEADER_URI: &str = "Letterboxd URI";

/// Errors that can occur when loading a diary export
#[derive(Debug, Error)]
pub enum DiaryError {
    /// The diary file is absent or unreadable
    #[error("Failed to read diary file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A record did not have enough columns to carry a URI and a date
    #[error("Malformed diary record on line {line}: expected at least {expected} columns, found {found}")]
    MalformedRecord {
        line: usize,
        expected: usize,
        found: usize,
    },
}

/// A parsed diary export: entry URI -> watched date (`YYYY-MM-DD`)
///
/// Immutable once loaded. Duplicate URIs keep the last record, matching
/// how the export lists rewatch rows.
#[derive(Debug, Clone, Default)]
pub struct Diary {
    entries: HashMap<String, String>,
}

impl Diary {
    /// Loads and parses a diary export from disk.
    ///
    /// A missing or unreadable file is fatal: without the diary there is
    /// no work set to compute.
    pub fn load(path: &Path) -> Result<Self, DiaryError> {
        let content = fs::read_to_string(path).map_err(|source| DiaryError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parses diary CSV content.
    ///
    /// The header record is recognised by its URI column reading
    /// `Letterboxd URI` and skipped.
    pub fn parse(content: &str) -> Result<Self, DiaryError> {
        let mut entries = HashMap::new();

        for (line, fields) in parse_csv(content) {
            if fields.get(URI_COLUMN).map(String::as_str) == Some(HEADER_URI) {
                continue;
            }
            if fields.len() <= DATE_COLUMN {
                return Err(DiaryError::MalformedRecord {
                    line,
                    expected: DATE_COLUMN + 1,
                    found: fields.len(),
                });
            }
            entries.insert(fields[URI_COLUMN].clone(), fields[DATE_COLUMN].clone());
        }

        Ok(Self { entries })
    }

    /// Builds a diary from already-parsed entries.
    ///
    /// Used by tests that exercise the resolver without a CSV file.
    #[cfg(test)]
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Returns the watched date for an entry URI, if present
    #[allow(dead_code)]
    pub fn get(&self, uri: &str) -> Option<&str> {
        self.entries.get(uri).map(String::as_str)
    }

    /// Iterates over `(uri, date)` pairs in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.entries.iter()
    }

    /// Number of entries in the diary
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the diary has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Splits CSV content into `(starting line, fields)` records.
///
/// The export quotes fields containing commas or quotes and doubles
/// embedded quotes, so a plain line split is not enough. Quoted fields may
/// span lines; the reported line number is where the record starts.
fn parse_csv(content: &str) -> Vec<(usize, Vec<String>)> {
    let mut records = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;

    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                // A doubled quote is an escaped quote inside the field
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            '"' => field.push('"'),
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            '\r' if !in_quotes => {}
            '\n' => {
                line += 1;
                if in_quotes {
                    field.push('\n');
                } else {
                    fields.push(std::mem::take(&mut field));
                    flush_record(&mut records, record_line, &mut fields);
                    record_line = line;
                }
            }
            _ => field.push(c),
        }
    }

    // Final record when the file does not end with a newline
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        flush_record(&mut records, record_line, &mut fields);
    }

    records
}

/// Pushes a completed record unless it is an empty line
fn flush_record(records: &mut Vec<(usize, Vec<String>)>, line: usize, fields: &mut Vec<String>) {
    if fields.len() == 1 && fields[0].is_empty() {
        fields.clear();
    } else {
        records.push((line, std::mem::take(fields)));
    }
}
