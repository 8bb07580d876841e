use std::path::{Path, PathBuf};

use thiserror::Error;

/// Fatal pipeline failures. Recoverable cell- and row-level problems are not
/// errors; they are tallied in [`crate::report::Diagnostics`].
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(
        "could not find required column ({description}) in {table}. Tried: {candidates:?}. Available columns: {available:?}"
    )]
    SchemaResolution {
        table: String,
        description: String,
        candidates: Vec<String>,
        available: Vec<String>,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error{}: {source}", in_path(.path))]
    Csv {
        path: Option<PathBuf>,
        #[source]
        source: csv::Error,
    },

    #[error("population table error: {0}")]
    Population(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("week grid is empty: no {weekday} between {start} and {end}")]
    EmptyGrid {
        weekday: chrono::Weekday,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
}

impl PipelineError {
    /// Attaches a file path to CSV errors raised while reading from a reader.
    pub fn with_path(self, path: &Path) -> Self {
        match self {
            PipelineError::Csv { path: None, source } => PipelineError::Csv {
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        }
    }
}

impl From<csv::Error> for PipelineError {
    fn from(source: csv::Error) -> Self {
        PipelineError::Csv { path: None, source }
    }
}

fn in_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" in {}", p.display()))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, PipelineError>;
