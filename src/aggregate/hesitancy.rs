use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::aggregate::utility::{mean, weighted_mean};
use crate::ingest::{self, HesitancySurveyRow};
use crate::normalize::percentage_in_range;
use crate::population::CountyPopulation;
use crate::region::Region;
use crate::report::{Diagnostics, IssueKind};

/// Hesitancy percentage in `[0, 100]` per region, constant across weeks.
pub type StateHesitancy = BTreeMap<Region, f64>;

/// Rolls survey rows up to one percentage per state.
///
/// Estimates are fractions unless any of them exceeds 1, in which case the
/// whole column is read as percentages. County rows are weighted by county
/// population in `reference_year`; rows without a county population are
/// dropped and counted as [`IssueKind::UnmatchedCounty`]. Without county
/// populations or county labels every row weighs the same.
#[tracing::instrument(skip_all, fields(rows = rows.len(), reference_year = reference_year))]
pub fn aggregate_hesitancy(
    rows: &[HesitancySurveyRow],
    counties: &CountyPopulation,
    reference_year: i32,
    diagnostics: &mut Diagnostics,
) -> StateHesitancy {
    let max = rows.iter().map(|r| r.estimate).fold(f64::NEG_INFINITY, f64::max);
    let divisor = if max > 1.0 { 100.0 } else { 1.0 };
    let has_counties = rows.iter().any(|r| r.county.is_some());

    let by_state = if has_counties && !counties.is_empty() {
        weighted_by_county(rows, counties, reference_year, divisor, diagnostics)
    } else {
        warn!(
            has_counties,
            county_populations = counties.len(),
            "No county weights available, using unweighted state means"
        );
        unweighted(rows, divisor)
    };

    let states: StateHesitancy = by_state
        .into_iter()
        .filter_map(|(region, value)| {
            let pct = percentage_in_range(value);
            if pct.is_none() {
                diagnostics.record(ingest::HESITANCY, IssueKind::OutOfRangeValue);
            }
            pct.map(|p| (region, p))
        })
        .collect();
    info!(states = states.len(), percentage_input = divisor > 1.0, "State hesitancy computed");
    states
}

fn weighted_by_county(
    rows: &[HesitancySurveyRow],
    counties: &CountyPopulation,
    reference_year: i32,
    divisor: f64,
    diagnostics: &mut Diagnostics,
) -> BTreeMap<Region, f64> {
    let mut pairs: BTreeMap<Region, Vec<(f64, f64)>> = BTreeMap::new();
    let mut unmatched = 0;
    for row in rows {
        let population = row
            .county
            .as_deref()
            .and_then(|county| counties.get(row.region, county, reference_year));
        match population {
            Some(p) => pairs
                .entry(row.region)
                .or_default()
                .push((row.estimate / divisor, p as f64)),
            None => unmatched += 1,
        }
    }
    diagnostics.record_n(ingest::HESITANCY, IssueKind::UnmatchedCounty, unmatched);

    pairs
        .into_iter()
        .filter_map(|(region, pairs)| weighted_mean(&pairs).map(|f| (region, f * 100.0)))
        .collect()
}

fn unweighted(rows: &[HesitancySurveyRow], divisor: f64) -> BTreeMap<Region, f64> {
    let mut values: BTreeMap<Region, Vec<f64>> = BTreeMap::new();
    for row in rows {
        values
            .entry(row.region)
            .or_default()
            .push(row.estimate / divisor * 100.0);
    }
    values
        .into_iter()
        .filter_map(|(region, values)| mean(&values).map(|m| (region, m)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(postal: &str) -> Region {
        Region::from_postal(postal).unwrap()
    }

    fn row(postal: &str, county: Option<&str>, estimate: f64) -> HesitancySurveyRow {
        HesitancySurveyRow {
            region: region(postal),
            county: county.map(str::to_string),
            estimate,
        }
    }

    fn counties() -> CountyPopulation {
        let mut c = CountyPopulation::default();
        c.insert(region("AL"), "Autauga County", 2020, 1_000);
        c.insert(region("AL"), "Baldwin County", 2020, 3_000);
        c.insert(region("AL"), "Baldwin County", 2021, 9_000);
        c
    }

    #[test]
    fn test_population_weighted_state_value() {
        let rows = vec![
            row("AL", Some("Autauga County, Alabama"), 0.10),
            row("AL", Some("Baldwin County, Alabama"), 0.40),
            row("AL", Some("Nowhere County, Alabama"), 0.90),
        ];
        let mut d = Diagnostics::default();
        let states = aggregate_hesitancy(&rows, &counties(), 2020, &mut d);

        let al = states[&region("AL")];
        assert!((al - 32.5).abs() < 1e-9);
        assert_eq!(d.count(ingest::HESITANCY, IssueKind::UnmatchedCounty), 1);
    }

    #[test]
    fn test_percentage_scale_is_dataset_level() {
        // 18.0 > 1, so 0.5 is read as 0.5%, not 50%.
        let rows = vec![
            row("AL", Some("Autauga County"), 18.0),
            row("AL", Some("Baldwin County"), 0.5),
        ];
        let mut d = Diagnostics::default();
        let states = aggregate_hesitancy(&rows, &counties(), 2020, &mut d);
        let expected = (18.0 * 1_000.0 + 0.5 * 3_000.0) / 4_000.0;
        assert!((states[&region("AL")] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_falls_back_to_unweighted_mean() {
        let rows = vec![row("TX", None, 0.2), row("TX", None, 0.3), row("WY", None, 0.25)];
        let mut d = Diagnostics::default();
        let states = aggregate_hesitancy(&rows, &counties(), 2020, &mut d);
        assert!((states[&region("TX")] - 25.0).abs() < 1e-9);
        assert!((states[&region("WY")] - 25.0).abs() < 1e-9);

        let rows = vec![
            row("AL", Some("Autauga County"), 0.1),
            row("AL", Some("Baldwin County"), 0.4),
        ];
        let states = aggregate_hesitancy(&rows, &CountyPopulation::default(), 2020, &mut d);
        assert!((states[&region("AL")] - 25.0).abs() < 1e-9);
        assert!(d.is_empty());
    }

    #[test]
    fn test_out_of_range_result_is_missing() {
        let rows = vec![row("TX", None, 150.0)];
        let mut d = Diagnostics::default();
        let states = aggregate_hesitancy(&rows, &CountyPopulation::default(), 2020, &mut d);
        assert!(states.is_empty());
        assert_eq!(d.count(ingest::HESITANCY, IssueKind::OutOfRangeValue), 1);
    }
}
