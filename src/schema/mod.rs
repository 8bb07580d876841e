//! Raw string tables and column resolution.
//!
//! [`RawTable`] is a CSV file held as strings. [`ColumnResolver`] maps an
//! ordered list of acceptable header names onto one of its columns;
//! [`CandidateResolver`] is the default implementation.

pub mod columns;

use std::io::Read;
use std::path::Path;

use crate::error::{PipelineError, Result};

/// A delimiter-separated table with every cell kept as a string.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Label used in logs, diagnostics and error messages.
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Reads a CSV file whose first record is the header row.
    pub fn from_path(name: &str, path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(name, file).map_err(|e| e.with_path(path))
    }

    pub fn from_reader<R: Read>(name: &str, reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in rdr.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }

        Ok(Self {
            name: name.to_string(),
            headers,
            rows,
        })
    }

    /// Reads a CSV file without interpreting any record as a header. Used
    /// for layouts whose header position must be found by content.
    pub fn headerless_from_path(name: &str, path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::headerless_from_reader(name, file).map_err(|e| e.with_path(path))
    }

    pub fn headerless_from_reader<R: Read>(name: &str, reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        for record in rdr.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }

        Ok(Self {
            name: name.to_string(),
            headers: Vec::new(),
            rows,
        })
    }

    /// Promotes row `index` to the header row and keeps only the rows after it.
    pub fn with_header_row(mut self, index: usize) -> Self {
        let mut rest = self.rows.split_off(index.min(self.rows.len()));
        if !rest.is_empty() {
            self.headers = rest
                .remove(0)
                .into_iter()
                .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
                .collect();
        }
        self.rows = rest;
        self
    }

    /// Returns the cell at (`row`, `col`), or `""` for short rows.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A column resolved against a list of candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub index: usize,
    pub header: String,
}

/// Finds columns by name.
pub trait ColumnResolver {
    /// Returns the first candidate present in `table`, or `None`.
    fn find(&self, table: &RawTable, candidates: &[&str]) -> Option<ResolvedColumn>;

    /// Like [`ColumnResolver::find`], but a missing column is a fatal
    /// [`PipelineError::SchemaResolution`].
    fn require(
        &self,
        table: &RawTable,
        candidates: &[&str],
        description: &str,
    ) -> Result<ResolvedColumn> {
        self.find(table, candidates)
            .ok_or_else(|| PipelineError::SchemaResolution {
                table: table.name.clone(),
                description: description.to_string(),
                candidates: candidates.iter().map(|c| c.to_string()).collect(),
                available: table.headers.clone(),
            })
    }
}

/// Matches candidates in three passes: exact, case-insensitive, then with
/// surrounding whitespace ignored. Within a pass, candidate order wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct CandidateResolver;

impl ColumnResolver for CandidateResolver {
    fn find(&self, table: &RawTable, candidates: &[&str]) -> Option<ResolvedColumn> {
        let hit = |index: usize| ResolvedColumn {
            index,
            header: table.headers[index].clone(),
        };

        for candidate in candidates {
            if let Some(i) = table.headers.iter().position(|h| h == candidate) {
                return Some(hit(i));
            }
        }

        for candidate in candidates {
            if let Some(i) = table
                .headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(candidate))
            {
                return Some(hit(i));
            }
        }

        for candidate in candidates {
            let candidate = candidate.trim();
            if let Some(i) = table
                .headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(candidate))
            {
                return Some(hit(i));
            }
        }

        None
    }
}
