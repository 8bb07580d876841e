//! Population lookup tables built from census-style estimate files.
//!
//! Two physical layouts are accepted and both end up as the same long-form
//! `(region, year) -> population` table:
//!
//! - **wide**: free-form metadata rows, then a row whose cells hold four-digit
//!   years marking the year columns, then one row per geography;
//! - **flat**: a regular header with state and county name columns, and either
//!   year-suffixed columns (`POPESTIMATE2021`, `2021`) or a `YEAR` /
//!   `POPULATION` pair. Rows whose county label equals the state label are
//!   the state totals; the others become [`CountyPopulation`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::ingest::{number_cell, region_cell};
use crate::normalize::{parse_number, resolve_region};
use crate::region::Region;
use crate::report::{Diagnostics, IssueKind};
use crate::schema::{ColumnResolver, RawTable, columns};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopulationRecord {
    pub region: Region,
    pub year: i32,
    pub population: u64,
}

/// Population per region and year. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulationTable {
    by_region_year: BTreeMap<(Region, i32), u64>,
}

impl PopulationTable {
    /// Builds the table; the first record for a (region, year) wins.
    pub fn from_records(records: impl IntoIterator<Item = PopulationRecord>) -> Self {
        let mut by_region_year = BTreeMap::new();
        for r in records {
            by_region_year
                .entry((r.region, r.year))
                .or_insert(r.population);
        }
        Self { by_region_year }
    }

    pub fn get(&self, region: Region, year: i32) -> Option<u64> {
        self.by_region_year.get(&(region, year)).copied()
    }

    pub fn years(&self) -> BTreeSet<i32> {
        self.by_region_year.keys().map(|(_, y)| *y).collect()
    }

    pub fn len(&self) -> usize {
        self.by_region_year.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_region_year.is_empty()
    }

    /// Sums `regions` per year. Region-years absent from the table are left
    /// out of the sum and counted in [`NationalPopulation::missing_region_years`].
    pub fn national(&self, regions: &[Region]) -> NationalPopulation {
        let mut by_year = BTreeMap::new();
        let mut missing_region_years = 0;
        for year in self.years() {
            let mut total = 0u64;
            for &region in regions {
                match self.get(region, year) {
                    Some(p) => total += p,
                    None => missing_region_years += 1,
                }
            }
            by_year.insert(year, total);
        }
        NationalPopulation {
            by_year,
            missing_region_years,
        }
    }
}

/// National population per year.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NationalPopulation {
    pub by_year: BTreeMap<i32, u64>,
    pub missing_region_years: usize,
}

impl NationalPopulation {
    pub fn get(&self, year: i32) -> Option<u64> {
        self.by_year.get(&year).copied()
    }
}

/// County population per year, keyed by region and normalized county label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountyPopulation {
    by_county: HashMap<(Region, String), BTreeMap<i32, u64>>,
}

impl CountyPopulation {
    pub fn insert(&mut self, region: Region, label: &str, year: i32, population: u64) {
        self.by_county
            .entry((region, county_key(label)))
            .or_default()
            .entry(year)
            .or_insert(population);
    }

    pub fn get(&self, region: Region, label: &str, year: i32) -> Option<u64> {
        self.by_county
            .get(&(region, county_key(label)))
            .and_then(|years| years.get(&year))
            .copied()
    }

    /// Number of distinct counties.
    pub fn len(&self) -> usize {
        self.by_county.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_county.is_empty()
    }
}

/// Normalizes a county label for joining: drops a census leading dot and any
/// `, <state>` suffix, trims and lowercases. `"Autauga County, Alabama"` and
/// `".Autauga County"` both become `"autauga county"`.
pub fn county_key(label: &str) -> String {
    let label = label.trim().trim_start_matches('.');
    let label = label.split(',').next().unwrap_or(label);
    label.trim().to_lowercase()
}

/// Everything a population file yields.
#[derive(Debug, Clone, Default)]
pub struct PopulationTables {
    pub states: PopulationTable,
    pub counties: CountyPopulation,
}

/// Builds population tables from a file read with
/// [`RawTable::headerless_from_path`], detecting the layout by content.
#[tracing::instrument(skip_all, fields(table = %raw.name, rows = raw.len()))]
pub fn build_population<R: ColumnResolver + ?Sized>(
    raw: &RawTable,
    resolver: &R,
    diagnostics: &mut Diagnostics,
) -> Result<PopulationTables> {
    let flat = raw.clone().with_header_row(0);
    let tables = if resolver.find(&flat, columns::POP_STATE_NAME).is_some()
        && resolver.find(&flat, columns::POP_COUNTY_NAME).is_some()
    {
        debug!("Detected flat population layout");
        build_flat(&flat, resolver, diagnostics)?
    } else {
        debug!("Detected wide population layout");
        build_wide(raw, diagnostics)?
    };

    info!(
        state_years = tables.states.len(),
        counties = tables.counties.len(),
        years = ?tables.states.years(),
        "Population tables built"
    );
    Ok(tables)
}

/// Matches `2021` or `POPESTIMATE2021`.
fn year_of_header(header: &str) -> Option<i32> {
    let h = header.trim();
    let split = h
        .len()
        .checked_sub(4)
        .and_then(|i| h.get(..i).zip(h.get(i..)));
    let digits = match split {
        Some((prefix, tail)) if prefix.eq_ignore_ascii_case("POPESTIMATE") => tail,
        _ => h,
    };
    if digits.len() == 4 && digits.chars().all(|c| c.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}

fn population_cell(raw: &str, table: &str, diagnostics: &mut Diagnostics) -> Option<u64> {
    let value = number_cell(raw, table, diagnostics)?;
    if value < 0.0 {
        diagnostics.record(table, IssueKind::OutOfRangeValue);
        return None;
    }
    Some(value.round() as u64)
}

fn build_wide(raw: &RawTable, diagnostics: &mut Diagnostics) -> Result<PopulationTables> {
    let name = raw.name.as_str();
    let year_row = raw
        .rows
        .iter()
        .position(|row| row.iter().any(|cell| year_of_header(cell).is_some()))
        .ok_or_else(|| {
            PipelineError::Population(format!("could not find year columns in {name}"))
        })?;

    let year_cols: Vec<(usize, i32)> = raw.rows[year_row]
        .iter()
        .enumerate()
        .filter_map(|(i, cell)| year_of_header(cell).map(|y| (i, y)))
        .collect();
    debug!(year_row, ?year_cols, "Found year columns");

    let mut records = Vec::new();
    for row in (year_row + 1)..raw.len() {
        let label = raw.cell(row, 0).trim();
        if label.is_empty() {
            continue;
        }
        let Some(region) = resolve_region(label) else {
            // Aggregates such as "United States" or "Northeast" carry numbers;
            // trailing notes do not and are skipped silently.
            if year_cols
                .iter()
                .any(|&(col, _)| parse_number(raw.cell(row, col)).is_some())
            {
                diagnostics.record_unmapped(name, label);
            }
            continue;
        };
        for &(col, year) in &year_cols {
            if let Some(population) = population_cell(raw.cell(row, col), name, diagnostics) {
                records.push(PopulationRecord {
                    region,
                    year,
                    population,
                });
            }
        }
    }

    Ok(PopulationTables {
        states: PopulationTable::from_records(records),
        counties: CountyPopulation::default(),
    })
}

fn build_flat<R: ColumnResolver + ?Sized>(
    table: &RawTable,
    resolver: &R,
    diagnostics: &mut Diagnostics,
) -> Result<PopulationTables> {
    let name = table.name.as_str();
    let state = resolver.require(table, columns::POP_STATE_NAME, "state name")?;
    let county = resolver.require(table, columns::POP_COUNTY_NAME, "county name")?;

    // Either one column per year, or a long YEAR/POPULATION pair.
    let year_cols: Vec<(usize, i32)> = table
        .headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| year_of_header(h).map(|y| (i, y)))
        .collect();
    let long = if year_cols.is_empty() {
        Some((
            resolver.require(table, columns::POP_YEAR, "year")?,
            resolver.require(table, columns::POP_VALUE, "population")?,
        ))
    } else {
        None
    };
    debug!(?year_cols, long = long.is_some(), "Resolved flat population columns");

    let mut states = Vec::new();
    let mut counties = CountyPopulation::default();
    for row in 0..table.len() {
        let state_label = table.cell(row, state.index).trim();
        let county_label = table.cell(row, county.index).trim();
        let Some(region) = region_cell(state_label, name, diagnostics) else {
            continue;
        };
        let is_state_row = county_label.eq_ignore_ascii_case(state_label);

        let values: Vec<(i32, u64)> = match &long {
            Some((year_col, value_col)) => {
                let year = number_cell(table.cell(row, year_col.index), name, diagnostics)
                    .map(|y| y as i32)
                    .filter(|y| (1900..=2100).contains(y));
                let population =
                    population_cell(table.cell(row, value_col.index), name, diagnostics);
                year.zip(population).into_iter().collect()
            }
            None => year_cols
                .iter()
                .filter_map(|&(col, year)| {
                    population_cell(table.cell(row, col), name, diagnostics).map(|p| (year, p))
                })
                .collect(),
        };

        for (year, population) in values {
            if is_state_row {
                states.push(PopulationRecord {
                    region,
                    year,
                    population,
                });
            } else {
                counties.insert(region, county_label, year, population);
            }
        }
    }

    Ok(PopulationTables {
        states: PopulationTable::from_records(states),
        counties,
    })
}
