//! Rows of the three output tables.

use chrono::NaiveDate;
use serde::Serialize;

use crate::region::Region;

/// One row per (region, week-ending date) of the target grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateWeekFact {
    #[serde(skip)]
    pub region: Region,
    pub state_fips: &'static str,
    pub state_usps: &'static str,
    pub week_end_date: NaiveDate,
    pub vacc_pct_full_18p: Option<f64>,
    pub vacc_pct_any_18p: Option<f64>,
    pub booster_pct_18p: Option<f64>,
    pub weekly_cases: i64,
    pub weekly_deaths: i64,
    pub cases_per_100k: Option<f64>,
    pub deaths_per_100k: Option<f64>,
    pub cumulative_cases: i64,
    pub cumulative_deaths: i64,
    pub cumulative_cases_per_100k: Option<f64>,
    pub cumulative_deaths_per_100k: Option<f64>,
    pub hesitancy_pct: Option<f64>,
    pub population: Option<u64>,
}

impl StateWeekFact {
    /// An empty row for `region` and `week`; every metric starts missing or zero.
    pub fn empty(region: Region, week: NaiveDate) -> Self {
        Self {
            region,
            state_fips: region.fips(),
            state_usps: region.postal(),
            week_end_date: week,
            vacc_pct_full_18p: None,
            vacc_pct_any_18p: None,
            booster_pct_18p: None,
            weekly_cases: 0,
            weekly_deaths: 0,
            cases_per_100k: None,
            deaths_per_100k: None,
            cumulative_cases: 0,
            cumulative_deaths: 0,
            cumulative_cases_per_100k: None,
            cumulative_deaths_per_100k: None,
            hesitancy_pct: None,
            population: None,
        }
    }
}

/// One row per week: the population-weighted national series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NationalWeekFact {
    pub week_end_date: NaiveDate,
    pub vacc_pct_full_18p: Option<f64>,
    pub vacc_pct_any_18p: Option<f64>,
    pub booster_pct_18p: Option<f64>,
    pub weekly_cases: i64,
    pub weekly_deaths: i64,
    pub cases_per_100k: Option<f64>,
    pub deaths_per_100k: Option<f64>,
    pub cumulative_cases: i64,
    pub cumulative_deaths: i64,
    pub cumulative_cases_per_100k: Option<f64>,
    pub cumulative_deaths_per_100k: Option<f64>,
    pub hesitancy_pct: Option<f64>,
    pub population: Option<u64>,
}

/// A dated event marker, passed through with a normalized date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventMarker {
    pub date: Option<NaiveDate>,
    pub event: String,
    pub source: String,
    pub official_source_url: String,
}

/// Count divided by population, scaled to 100 000 people.
pub fn per_100k(count: f64, population: Option<u64>) -> Option<f64> {
    match population {
        Some(p) if p > 0 => Some(count / p as f64 * 100_000.0),
        _ => None,
    }
}
