//! Event marker normalization: dates become ISO dates, everything else is
//! passed through as-is.

use tracing::debug;

use crate::error::Result;
use crate::ingest::date_cell;
use crate::report::Diagnostics;
use crate::schema::{ColumnResolver, RawTable, ResolvedColumn, columns};
use crate::types::EventMarker;

/// Normalizes every row of the events table, keeping input order. Rows with
/// an unparsable date keep an empty date; missing optional columns yield
/// empty strings.
#[tracing::instrument(skip_all, fields(table = %table.name, rows = table.len()))]
pub fn normalize_events<R: ColumnResolver + ?Sized>(
    table: &RawTable,
    resolver: &R,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<EventMarker>> {
    let date = resolver.require(table, columns::EVENT_DATE, "event date")?;
    let event = resolver.require(table, columns::EVENT_TEXT, "event description")?;
    let source = resolver.find(table, columns::EVENT_SOURCE);
    let url = resolver.find(table, columns::EVENT_URL);
    debug!(
        date = %date.header,
        event = %event.header,
        source = ?source.as_ref().map(|c| c.header.as_str()),
        url = ?url.as_ref().map(|c| c.header.as_str()),
        "Resolved event columns"
    );

    let name = table.name.as_str();
    let markers = (0..table.len())
        .map(|row| EventMarker {
            date: date_cell(table.cell(row, date.index), name, diagnostics),
            event: table.cell(row, event.index).to_string(),
            source: optional_cell(table, row, source.as_ref()),
            official_source_url: optional_cell(table, row, url.as_ref()),
        })
        .collect();
    Ok(markers)
}

fn optional_cell(table: &RawTable, row: usize, column: Option<&ResolvedColumn>) -> String {
    column
        .map(|c| table.cell(row, c.index).to_string())
        .unwrap_or_default()
}
