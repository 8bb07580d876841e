use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::Result;
use crate::ingest::{date_cell, percentage_cell, region_cell};
use crate::region::Region;
use crate::report::Diagnostics;
use crate::schema::{ColumnResolver, RawTable, columns};

/// Adult (18+) vaccination coverage reported for one region on one date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VaccinationObservation {
    pub region: Region,
    pub date: NaiveDate,
    pub any_dose_pct: Option<f64>,
    pub full_series_pct: Option<f64>,
    pub booster_pct: Option<f64>,
}

/// Parsed vaccination reports, and whether the source carried a booster column
/// at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VaccinationSeries {
    pub observations: Vec<VaccinationObservation>,
    pub has_booster: bool,
}

/// Loads the vaccination table. The booster column is optional; without it
/// every booster value is missing.
#[tracing::instrument(skip_all, fields(table = %table.name, rows = table.len()))]
pub fn load_vaccinations<R: ColumnResolver + ?Sized>(
    table: &RawTable,
    resolver: &R,
    diagnostics: &mut Diagnostics,
) -> Result<VaccinationSeries> {
    let location = resolver.require(table, columns::VAX_LOCATION, "state/location identifier")?;
    let date = resolver.require(table, columns::VAX_DATE, "date")?;
    let any_dose = resolver.require(
        table,
        columns::VAX_ANY_DOSE,
        "vaccination percentage (any dose)",
    )?;
    let full_series = resolver.require(
        table,
        columns::VAX_FULL_SERIES,
        "vaccination percentage (fully vaccinated)",
    )?;
    let booster = resolver.find(table, columns::VAX_BOOSTER);
    if booster.is_none() {
        info!("No booster column found, booster percentages will be missing");
    }
    debug!(
        location = %location.header,
        date = %date.header,
        any_dose = %any_dose.header,
        full_series = %full_series.header,
        booster = ?booster.as_ref().map(|c| c.header.as_str()),
        "Resolved vaccination columns"
    );

    let name = table.name.as_str();
    let mut observations = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let Some(region) = region_cell(table.cell(row, location.index), name, diagnostics) else {
            continue;
        };
        let Some(day) = date_cell(table.cell(row, date.index), name, diagnostics) else {
            continue;
        };
        observations.push(VaccinationObservation {
            region,
            date: day,
            any_dose_pct: percentage_cell(table.cell(row, any_dose.index), name, diagnostics),
            full_series_pct: percentage_cell(table.cell(row, full_series.index), name, diagnostics),
            booster_pct: booster
                .as_ref()
                .and_then(|c| percentage_cell(table.cell(row, c.index), name, diagnostics)),
        });
    }

    Ok(VaccinationSeries {
        observations,
        has_booster: booster.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::IssueKind;
    use crate::schema::CandidateResolver;

    #[test]
    fn test_load_with_booster_column() {
        let csv = "Date,Location,Administered_Dose1_Recip_18PlusPop_Pct,Series_Complete_18PlusPop_Pct,Additional_Doses_18Plus_Vax_Pct\n\
                   03/02/2021,TX,20.5,10.1,\n\
                   03/02/2021,US,30,20,1\n\
                   03/02/2021,CA,101,50,2.5\n";
        let t = RawTable::from_reader("vaccinations", csv.as_bytes()).unwrap();
        let mut d = Diagnostics::default();
        let series = load_vaccinations(&t, &CandidateResolver, &mut d).unwrap();
        let rows = &series.observations;

        assert!(series.has_booster);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].region.postal(), "TX");
        assert_eq!(rows[0].any_dose_pct, Some(20.5));
        assert_eq!(rows[0].booster_pct, None);
        assert_eq!(rows[1].any_dose_pct, None);
        assert_eq!(rows[1].booster_pct, Some(2.5));
        assert_eq!(d.count("vaccinations", IssueKind::OutOfRangeValue), 1);
        assert!(d.unmapped("vaccinations").unwrap().contains("US"));
    }

    #[test]
    fn test_missing_booster_column_is_not_fatal() {
        let csv = "date,location,Series Complete 18PlusPop Pct,Administered Dose1 Recip 18PlusPop Pct\n\
                   2021-03-02,tx,10,20\n";
        let t = RawTable::from_reader("vaccinations", csv.as_bytes()).unwrap();
        let mut d = Diagnostics::default();
        let series = load_vaccinations(&t, &CandidateResolver, &mut d).unwrap();
        let rows = &series.observations;

        assert!(!series.has_booster);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].full_series_pct, Some(10.0));
        assert_eq!(rows[0].any_dose_pct, Some(20.0));
        assert_eq!(rows[0].booster_pct, None);
    }
}
