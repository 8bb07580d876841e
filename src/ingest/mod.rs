//! Typed row extraction from raw input tables.
//!
//! Each loader resolves its columns through a [`crate::schema::ColumnResolver`]
//! (a missing required column is fatal) and then converts cells one by one.
//! Cell-level problems never fail a load: the cell becomes missing, or the row
//! is dropped when its key cannot be read, and the problem is tallied in
//! [`Diagnostics`].

pub mod cases;
pub mod hesitancy;
pub mod vaccination;

use chrono::NaiveDate;

use crate::normalize::{
    Percentage, is_blank, parse_date, parse_number, parse_percentage, resolve_region,
};
use crate::region::Region;
use crate::report::{Diagnostics, IssueKind};

pub use cases::{CaseObservation, derive_incremental, increments, load_cases};
pub use hesitancy::{HesitancySurveyRow, load_hesitancy};
pub use vaccination::{VaccinationObservation, VaccinationSeries, load_vaccinations};

// Table names used for loading, diagnostics and the run report.
pub const CASES: &str = "cases";
pub const VACCINATIONS: &str = "vaccinations";
pub const HESITANCY: &str = "hesitancy";
pub const POPULATION: &str = "population";
pub const COUNTY_POPULATION: &str = "county_population";
pub const EVENTS: &str = "events";

pub(crate) fn date_cell(
    raw: &str,
    table: &str,
    diagnostics: &mut Diagnostics,
) -> Option<NaiveDate> {
    let value = parse_date(raw);
    if value.is_none() && !is_blank(raw) {
        diagnostics.record(table, IssueKind::UnparsableValue);
    }
    value
}

pub(crate) fn number_cell(raw: &str, table: &str, diagnostics: &mut Diagnostics) -> Option<f64> {
    let value = parse_number(raw);
    if value.is_none() && !is_blank(raw) {
        diagnostics.record(table, IssueKind::UnparsableValue);
    }
    value
}

pub(crate) fn percentage_cell(
    raw: &str,
    table: &str,
    diagnostics: &mut Diagnostics,
) -> Option<f64> {
    match parse_percentage(raw) {
        Percentage::Value(v) => Some(v),
        Percentage::OutOfRange(_) => {
            diagnostics.record(table, IssueKind::OutOfRangeValue);
            None
        }
        Percentage::Missing => {
            if !is_blank(raw) {
                diagnostics.record(table, IssueKind::UnparsableValue);
            }
            None
        }
    }
}

pub(crate) fn region_cell(raw: &str, table: &str, diagnostics: &mut Diagnostics) -> Option<Region> {
    let region = resolve_region(raw);
    if region.is_none() {
        diagnostics.record_unmapped(table, raw);
    }
    region
}
