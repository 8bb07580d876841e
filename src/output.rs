//! Output tables and their persistence.
//!
//! Every table is serialized to a hidden staging file inside the output
//! directory first. Only when all of them were written are they renamed to
//! their final names, so a failed run leaves previously published files
//! untouched and publishes nothing new.

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{PipelineError, Result};
use crate::types::{EventMarker, NationalWeekFact, StateWeekFact};

/// A row type with a fixed CSV header.
pub trait CsvTable: Serialize {
    /// File name without extension.
    const FILE_STEM: &'static str;
    const HEADER: &'static [&'static str];
}

impl CsvTable for StateWeekFact {
    const FILE_STEM: &'static str = "state_week_fact";
    const HEADER: &'static [&'static str] = &[
        "state_fips",
        "state_usps",
        "week_end_date",
        "vacc_pct_full_18p",
        "vacc_pct_any_18p",
        "booster_pct_18p",
        "weekly_cases",
        "weekly_deaths",
        "cases_per_100k",
        "deaths_per_100k",
        "cumulative_cases",
        "cumulative_deaths",
        "cumulative_cases_per_100k",
        "cumulative_deaths_per_100k",
        "hesitancy_pct",
        "population",
    ];
}

impl CsvTable for NationalWeekFact {
    const FILE_STEM: &'static str = "national_week_timeseries";
    const HEADER: &'static [&'static str] = &[
        "week_end_date",
        "vacc_pct_full_18p",
        "vacc_pct_any_18p",
        "booster_pct_18p",
        "weekly_cases",
        "weekly_deaths",
        "cases_per_100k",
        "deaths_per_100k",
        "cumulative_cases",
        "cumulative_deaths",
        "cumulative_cases_per_100k",
        "cumulative_deaths_per_100k",
        "hesitancy_pct",
        "population",
    ];
}

impl CsvTable for EventMarker {
    const FILE_STEM: &'static str = "vaccine_event_markers_clean";
    const HEADER: &'static [&'static str] = &["date", "event", "source", "official_source_url"];
}

/// The three tables a run produces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputTables {
    /// Ordered by state postal code, then week.
    pub state_weeks: Vec<StateWeekFact>,
    /// Ordered by week.
    pub national: Vec<NationalWeekFact>,
    /// Input order.
    pub events: Vec<EventMarker>,
}

/// Final file name of a table.
pub fn file_name<T: CsvTable>(gzip: bool) -> String {
    if gzip {
        format!("{}.csv.gz", T::FILE_STEM)
    } else {
        format!("{}.csv", T::FILE_STEM)
    }
}

/// Serializes `rows` as CSV with `T::HEADER`, written even when `rows` is
/// empty. Returns the inner writer.
pub fn write_table<T: CsvTable, W: Write>(writer: W, rows: &[T]) -> Result<W> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    writer.write_record(T::HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| PipelineError::from(csv::Error::from(e.into_error())))
}

fn write_file<T: CsvTable>(path: &Path, rows: &[T], gzip: bool) -> Result<()> {
    let io_err = |source: std::io::Error| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = BufWriter::new(File::create(path).map_err(io_err)?);
    if gzip {
        // The gzip header carries no timestamp, so reruns stay byte-identical.
        let encoder = GzEncoder::new(file, Compression::default());
        let encoder = write_table(encoder, rows).map_err(|e| e.with_path(path))?;
        encoder.finish().map_err(io_err)?.flush().map_err(io_err)?;
    } else {
        write_table(file, rows)
            .map_err(|e| e.with_path(path))?
            .flush()
            .map_err(io_err)?;
    }
    debug!(path = %path.display(), rows = rows.len(), "Wrote staging file");
    Ok(())
}

/// A file written under a staging name, awaiting publication.
struct Staged {
    staging: PathBuf,
    target: PathBuf,
}

fn stage<T: CsvTable>(
    dir: &Path,
    rows: &[T],
    gzip: bool,
    staged: &mut Vec<Staged>,
) -> Result<()> {
    let name = file_name::<T>(gzip);
    let entry = Staged {
        staging: dir.join(format!(".{name}.tmp")),
        target: dir.join(name),
    };
    let result = write_file(&entry.staging, rows, gzip);
    staged.push(entry);
    result
}

fn stage_all(
    dir: &Path,
    tables: &OutputTables,
    gzip: bool,
    staged: &mut Vec<Staged>,
) -> Result<()> {
    stage(dir, &tables.state_weeks, gzip, staged)?;
    stage(dir, &tables.national, gzip, staged)?;
    stage(dir, &tables.events, gzip, staged)
}

fn discard(staged: &[Staged]) {
    for entry in staged {
        match fs::remove_file(&entry.staging) {
            Err(e) if e.kind() != ErrorKind::NotFound => {
                warn!(
                    path = %entry.staging.display(),
                    error = %e,
                    "Could not remove staging file"
                );
            }
            _ => {}
        }
    }
}

/// Writes all tables into `dir` and publishes them together. Returns the
/// published paths.
#[tracing::instrument(skip_all, fields(dir = %dir.display(), gzip = gzip))]
pub fn write_outputs(dir: &Path, tables: &OutputTables, gzip: bool) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|source| PipelineError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut staged = Vec::with_capacity(3);
    if let Err(e) = stage_all(dir, tables, gzip, &mut staged) {
        discard(&staged);
        return Err(e);
    }

    publish(&staged)
}

/// Renames every staging file onto its target. A failed rename removes the
/// staging files not yet published.
fn publish(staged: &[Staged]) -> Result<Vec<PathBuf>> {
    let mut published = Vec::with_capacity(staged.len());
    for (i, entry) in staged.iter().enumerate() {
        if let Err(source) = fs::rename(&entry.staging, &entry.target) {
            discard(&staged[i..]);
            if !published.is_empty() {
                error!(
                    published = published.len(),
                    remaining = staged.len() - i,
                    "Publication was partial, output tables are out of sync"
                );
            }
            return Err(PipelineError::Io {
                path: entry.target.clone(),
                source,
            });
        }
        info!(path = %entry.target.display(), "Published table");
        published.push(entry.target.clone());
    }
    Ok(published)
}
