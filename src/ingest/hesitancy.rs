use tracing::debug;

use crate::error::Result;
use crate::ingest::{number_cell, region_cell};
use crate::region::Region;
use crate::report::Diagnostics;
use crate::schema::{ColumnResolver, RawTable, columns};

/// One survey estimate, county-level when `county` is present.
#[derive(Debug, Clone, PartialEq)]
pub struct HesitancySurveyRow {
    pub region: Region,
    pub county: Option<String>,
    /// Raw estimate; fraction or percentage is decided per dataset.
    pub estimate: f64,
}

#[tracing::instrument(skip_all, fields(table = %table.name, rows = table.len()))]
pub fn load_hesitancy<R: ColumnResolver + ?Sized>(
    table: &RawTable,
    resolver: &R,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<HesitancySurveyRow>> {
    let state = resolver.require(table, columns::HES_STATE, "state identifier")?;
    let estimate = resolver.require(table, columns::HES_ESTIMATE, "hesitancy percentage")?;
    let county = resolver.find(table, columns::HES_COUNTY);
    debug!(
        state = %state.header,
        estimate = %estimate.header,
        county = ?county.as_ref().map(|c| c.header.as_str()),
        "Resolved hesitancy columns"
    );

    let name = table.name.as_str();
    let mut rows = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let Some(region) = region_cell(table.cell(row, state.index), name, diagnostics) else {
            continue;
        };
        let Some(value) = number_cell(table.cell(row, estimate.index), name, diagnostics) else {
            continue;
        };
        let county = county
            .as_ref()
            .map(|c| table.cell(row, c.index).trim().to_string())
            .filter(|c| !c.is_empty());
        rows.push(HesitancySurveyRow {
            region,
            county,
            estimate: value,
        });
    }

    Ok(rows)
}
