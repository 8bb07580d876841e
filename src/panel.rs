//! State × week panel assembly.
//!
//! The grid has one cell per declared region and week-ending date. The
//! vaccination and case series are left-joined onto it with [`align`], state
//! hesitancy is broadcast to every week, and then the fill policy is applied
//! per region in week order:
//!
//! - missing weekly counts become 0 and cumulative counts are running sums of
//!   the filled weekly counts;
//! - population is looked up for the week's year and otherwise carried
//!   forward from the region's previous week, never backward;
//! - vaccination percentages of weeks without a matched report follow
//!   [`VaccinationGapPolicy`], except booster, which stays missing throughout
//!   when the source has no booster column;
//! - hesitancy stays missing when the region has none.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use tracing::info;

use crate::aggregate::StateHesitancy;
use crate::align::{Observation, align};
use crate::config::{PipelineConfig, VaccinationGapPolicy};
use crate::error::{PipelineError, Result};
use crate::ingest::{self, CaseObservation, VaccinationSeries};
use crate::population::PopulationTable;
use crate::region::Region;
use crate::report::{Diagnostics, IssueKind};
use crate::types::{StateWeekFact, per_100k};

/// Every `weekday` in `[start, end]`, ascending.
pub fn week_grid(start: NaiveDate, end: NaiveDate, weekday: Weekday) -> Vec<NaiveDate> {
    let offset = (7 + weekday.num_days_from_monday() - start.weekday().num_days_from_monday()) % 7;
    let mut weeks = Vec::new();
    let mut week = start + Duration::days(i64::from(offset));
    while week <= end {
        weeks.push(week);
        week += Duration::days(7);
    }
    weeks
}

/// One (region, week) slot of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GridCell {
    pub region: Region,
    pub week: NaiveDate,
}

impl Observation for GridCell {
    fn region(&self) -> Region {
        self.region
    }

    fn date(&self) -> NaiveDate {
        self.week
    }
}

/// Cells ordered by region, then week.
pub fn grid_cells(regions: &[Region], weeks: &[NaiveDate]) -> Vec<GridCell> {
    regions
        .iter()
        .flat_map(|&region| weeks.iter().map(move |&week| GridCell { region, week }))
        .collect()
}

/// Everything joined onto the grid.
#[derive(Debug, Clone, Copy)]
pub struct PanelInputs<'a> {
    pub cases: &'a [CaseObservation],
    pub vaccinations: &'a VaccinationSeries,
    pub hesitancy: &'a StateHesitancy,
    pub population: &'a PopulationTable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    /// One row per grid cell, ordered by region then week.
    pub facts: Vec<StateWeekFact>,
    pub weeks: Vec<NaiveDate>,
    pub case_matches: usize,
    pub vaccination_matches: usize,
}

#[tracing::instrument(skip_all, fields(start = %config.start_date, end = %config.end_date))]
pub fn assemble_panel(
    config: &PipelineConfig,
    regions: &[Region],
    inputs: PanelInputs<'_>,
    diagnostics: &mut Diagnostics,
) -> Result<Panel> {
    let weeks = week_grid(config.start_date, config.end_date, config.week_ending);
    if weeks.is_empty() || regions.is_empty() {
        return Err(PipelineError::EmptyGrid {
            weekday: config.week_ending,
            start: config.start_date,
            end: config.end_date,
        });
    }
    let cells = grid_cells(regions, &weeks);

    let vaccinations = align(
        &cells,
        &inputs.vaccinations.observations,
        config.vaccination_join,
    );
    let cases = align(&cells, inputs.cases, config.case_join);
    diagnostics.record_n(
        ingest::VACCINATIONS,
        IssueKind::DuplicateObservation,
        vaccinations.duplicate_right,
    );
    diagnostics.record_n(
        ingest::CASES,
        IssueKind::DuplicateObservation,
        cases.duplicate_right,
    );

    let mut facts = Vec::with_capacity(cells.len());
    let mut population_gaps = BTreeSet::new();
    // Per-region running state, reset whenever the region changes.
    let mut current: Option<Region> = None;
    let mut population: Option<u64> = None;
    let mut cumulative_cases = 0i64;
    let mut cumulative_deaths = 0i64;

    for ((cell, vax), case) in cells.iter().zip(&vaccinations.rows).zip(&cases.rows) {
        if current != Some(cell.region) {
            current = Some(cell.region);
            population = None;
            cumulative_cases = 0;
            cumulative_deaths = 0;
        }

        let year = cell.week.year();
        match inputs.population.get(cell.region, year) {
            Some(p) => population = Some(p),
            None => {
                population_gaps.insert((cell.region, year));
            }
        }

        let weekly_cases = case.right.and_then(|c| c.cases).map_or(0, round_count);
        let weekly_deaths = case.right.and_then(|c| c.deaths).map_or(0, round_count);
        cumulative_cases += weekly_cases;
        cumulative_deaths += weekly_deaths;

        let mut fact = StateWeekFact::empty(cell.region, cell.week);
        match (vax.right, config.vaccination_gaps) {
            (Some(report), _) => {
                fact.vacc_pct_full_18p = report.full_series_pct;
                fact.vacc_pct_any_18p = report.any_dose_pct;
                fact.booster_pct_18p = report.booster_pct;
            }
            (None, VaccinationGapPolicy::ZeroFill) => {
                fact.vacc_pct_full_18p = Some(0.0);
                fact.vacc_pct_any_18p = Some(0.0);
                fact.booster_pct_18p = inputs.vaccinations.has_booster.then_some(0.0);
            }
            (None, VaccinationGapPolicy::Missing) => {}
        }
        fact.weekly_cases = weekly_cases;
        fact.weekly_deaths = weekly_deaths;
        fact.cases_per_100k = per_100k(weekly_cases as f64, population);
        fact.deaths_per_100k = per_100k(weekly_deaths as f64, population);
        fact.cumulative_cases = cumulative_cases;
        fact.cumulative_deaths = cumulative_deaths;
        fact.cumulative_cases_per_100k = per_100k(cumulative_cases as f64, population);
        fact.cumulative_deaths_per_100k = per_100k(cumulative_deaths as f64, population);
        fact.hesitancy_pct = inputs.hesitancy.get(&cell.region).copied();
        fact.population = population;
        facts.push(fact);
    }

    diagnostics.record_n(
        ingest::POPULATION,
        IssueKind::PopulationGap,
        population_gaps.len(),
    );

    let panel = Panel {
        case_matches: cases.matched(),
        vaccination_matches: vaccinations.matched(),
        facts,
        weeks,
    };
    info!(
        regions = regions.len(),
        weeks = panel.weeks.len(),
        rows = panel.facts.len(),
        case_matches = panel.case_matches,
        vaccination_matches = panel.vaccination_matches,
        population_gaps = population_gaps.len(),
        "Panel assembled"
    );
    Ok(panel)
}

fn round_count(value: f64) -> i64 {
    value.round() as i64
}
