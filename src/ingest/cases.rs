use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::config::CountMode;
use crate::error::Result;
use crate::ingest::{date_cell, number_cell, region_cell};
use crate::region::Region;
use crate::report::{Diagnostics, IssueKind};
use crate::schema::{ColumnResolver, RawTable, columns};

/// Weekly new cases and deaths reported for one region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaseObservation {
    pub region: Region,
    pub date: NaiveDate,
    pub cases: Option<f64>,
    pub deaths: Option<f64>,
}

/// Loads the cases/deaths table. In [`CountMode::Cumulative`] the running
/// totals are converted to weekly increments with [`derive_incremental`].
#[tracing::instrument(skip_all, fields(table = %table.name, rows = table.len(), ?mode))]
pub fn load_cases<R: ColumnResolver + ?Sized>(
    table: &RawTable,
    resolver: &R,
    mode: CountMode,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<CaseObservation>> {
    let state = resolver.require(table, columns::CASES_STATE, "state identifier")?;
    let end_date = resolver.require(table, columns::CASES_END_DATE, "end date")?;
    let (cases, deaths) = match mode {
        CountMode::Weekly => (
            resolver.require(table, columns::CASES_NEW_CASES, "new cases")?,
            resolver.require(table, columns::CASES_NEW_DEATHS, "new deaths")?,
        ),
        CountMode::Cumulative => (
            resolver.require(table, columns::CASES_TOTAL_CASES, "total cases")?,
            resolver.require(table, columns::CASES_TOTAL_DEATHS, "total deaths")?,
        ),
    };
    debug!(
        state = %state.header,
        end_date = %end_date.header,
        cases = %cases.header,
        deaths = %deaths.header,
        "Resolved case columns"
    );

    let name = table.name.as_str();
    let mut observations = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let Some(region) = region_cell(table.cell(row, state.index), name, diagnostics) else {
            continue;
        };
        let Some(date) = date_cell(table.cell(row, end_date.index), name, diagnostics) else {
            continue;
        };
        observations.push(CaseObservation {
            region,
            date,
            cases: number_cell(table.cell(row, cases.index), name, diagnostics),
            deaths: number_cell(table.cell(row, deaths.index), name, diagnostics),
        });
    }

    Ok(match mode {
        CountMode::Weekly => observations,
        CountMode::Cumulative => derive_incremental(observations, name, diagnostics),
    })
}

/// Converts per-region running totals into per-report increments.
///
/// Observations are grouped by region and ordered by date; a repeated
/// (region, date) keeps its first occurrence. The first observation of a
/// region has no predecessor and keeps its own total, which overstates the
/// increment whenever the total before the first report was non-zero.
pub fn derive_incremental(
    observations: Vec<CaseObservation>,
    table: &str,
    diagnostics: &mut Diagnostics,
) -> Vec<CaseObservation> {
    let mut by_region: BTreeMap<Region, Vec<CaseObservation>> = BTreeMap::new();
    for obs in observations {
        by_region.entry(obs.region).or_default().push(obs);
    }

    let mut out = Vec::new();
    for (_, mut series) in by_region {
        series.sort_by_key(|o| o.date);
        let before = series.len();
        series.dedup_by_key(|o| o.date);
        diagnostics.record_n(table, IssueKind::DuplicateObservation, before - series.len());

        let cases = increments(&series.iter().map(|o| o.cases).collect::<Vec<_>>());
        let deaths = increments(&series.iter().map(|o| o.deaths).collect::<Vec<_>>());
        let negative = cases
            .iter()
            .chain(deaths.iter())
            .filter(|v| v.is_some_and(|v| v < 0.0))
            .count();
        diagnostics.record_n(table, IssueKind::NegativeIncrement, negative);

        out.extend(
            series
                .into_iter()
                .zip(cases.into_iter().zip(deaths))
                .map(|(obs, (cases, deaths))| CaseObservation {
                    cases,
                    deaths,
                    ..obs
                }),
        );
    }
    out
}

/// `total[t] - total[t-1]`, where `t-1` is the latest earlier known total.
/// The first known total is returned as-is; missing totals stay missing.
pub fn increments(totals: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut previous: Option<f64> = None;
    totals
        .iter()
        .map(|total| {
            let total = (*total)?;
            let increment = match previous {
                Some(p) => total - p,
                None => total,
            };
            previous = Some(total);
            Some(increment)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CandidateResolver;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn table(csv: &str) -> RawTable {
        RawTable::from_reader("cases", csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_increments_from_running_totals() {
        let totals = [Some(100.0), Some(150.0), Some(170.0)];
        assert_eq!(
            increments(&totals),
            vec![Some(100.0), Some(50.0), Some(20.0)]
        );
    }

    #[test]
    fn test_first_increment_is_left_censored() {
        // The total before the first report is unknown, so the first week
        // reports the whole running total even though the true increment
        // was only 10.
        let totals = [Some(5_000.0), Some(5_010.0)];
        assert_eq!(increments(&totals), vec![Some(5_000.0), Some(10.0)]);
    }

    #[test]
    fn test_increments_skip_missing_totals() {
        let totals = [Some(10.0), None, Some(25.0)];
        assert_eq!(increments(&totals), vec![Some(10.0), None, Some(15.0)]);
    }

    #[test]
    fn test_load_weekly_cases() {
        let t = table(
            "state,end_date,new_cases,new_deaths\n\
             CA,01/06/2021,\"1,000\",10\n\
             TX,2021-01-06,,5\n\
             NYC,2021-01-06,1,1\n\
             CA,garbage,1,1\n",
        );
        let mut d = Diagnostics::default();
        let rows = load_cases(&t, &CandidateResolver, CountMode::Weekly, &mut d).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].region.postal(), "CA");
        assert_eq!(rows[0].date, date(2021, 1, 6));
        assert_eq!(rows[0].cases, Some(1000.0));
        assert_eq!(rows[1].cases, None);
        assert_eq!(d.count("cases", IssueKind::UnmappableRegion), 1);
        assert_eq!(d.count("cases", IssueKind::UnparsableValue), 1);
    }

    #[test]
    fn test_load_cumulative_cases_derives_increments_per_region() {
        let t = table(
            "state,end_date,tot_cases,tot_deaths\n\
             CA,2021-01-13,1200,12\n\
             TX,2021-01-06,500,5\n\
             CA,2021-01-06,1000,10\n\
             TX,2021-01-13,450,6\n",
        );
        let mut d = Diagnostics::default();
        let rows = load_cases(&t, &CandidateResolver, CountMode::Cumulative, &mut d).unwrap();

        let ca: Vec<_> = rows.iter().filter(|r| r.region.postal() == "CA").collect();
        assert_eq!(ca[0].date, date(2021, 1, 6));
        assert_eq!(ca[0].cases, Some(1000.0));
        assert_eq!(ca[1].cases, Some(200.0));
        assert_eq!(ca[1].deaths, Some(2.0));

        let tx: Vec<_> = rows.iter().filter(|r| r.region.postal() == "TX").collect();
        assert_eq!(tx[1].cases, Some(-50.0));
        assert_eq!(d.count("cases", IssueKind::NegativeIncrement), 1);
    }

    #[test]
    fn test_cumulative_duplicates_keep_first() {
        let ca = Region::from_postal("CA").unwrap();
        let obs = |total| CaseObservation {
            region: ca,
            date: date(2021, 1, 6),
            cases: Some(total),
            deaths: None,
        };
        let mut d = Diagnostics::default();
        let rows = derive_incremental(vec![obs(10.0), obs(99.0)], "cases", &mut d);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cases, Some(10.0));
        assert_eq!(d.count("cases", IssueKind::DuplicateObservation), 1);
    }

    #[test]
    fn test_missing_required_column_is_fatal() {
        let t = table("state,end_date,new_cases\nCA,2021-01-06,1\n");
        let mut d = Diagnostics::default();
        let err = load_cases(&t, &CandidateResolver, CountMode::Weekly, &mut d).unwrap_err();
        assert!(err.to_string().contains("new deaths"));
    }
}
