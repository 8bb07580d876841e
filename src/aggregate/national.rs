use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use tracing::info;

use crate::aggregate::StateHesitancy;
use crate::aggregate::utility::weighted_mean;
use crate::config::VaccinationGapPolicy;
use crate::population::{NationalPopulation, PopulationTable};
use crate::region::Region;
use crate::types::{NationalWeekFact, StateWeekFact, per_100k};

/// Rolls the state panel up to one row per week.
///
/// Counts are summed across regions and divided by the national population of
/// the week's year (carried forward past the last known year). Percentages are
/// population-weighted means over regions with a known population.
#[derive(Debug, Clone)]
pub struct NationalAggregator {
    population: NationalPopulation,
    hesitancy: Option<f64>,
    gaps: VaccinationGapPolicy,
    has_booster: bool,
}

impl NationalAggregator {
    /// `states` and `regions` define the national population; `hesitancy` is
    /// weighted once by each region's population in `reference_year`.
    pub fn new(
        states: &PopulationTable,
        regions: &[Region],
        hesitancy: &StateHesitancy,
        reference_year: i32,
        gaps: VaccinationGapPolicy,
    ) -> Self {
        let pairs: Vec<(f64, f64)> = regions
            .iter()
            .filter_map(|&region| {
                let pct = hesitancy.get(&region)?;
                let population = states.get(region, reference_year)?;
                Some((*pct, population as f64))
            })
            .collect();

        Self {
            population: states.national(regions),
            hesitancy: weighted_mean(&pairs),
            gaps,
            has_booster: true,
        }
    }

    /// Without a booster source the national booster series is missing rather
    /// than a zero-filled mean.
    pub fn with_booster(mut self, has_booster: bool) -> Self {
        self.has_booster = has_booster;
        self
    }

    pub fn population(&self) -> &NationalPopulation {
        &self.population
    }

    #[tracing::instrument(skip_all, fields(facts = facts.len()))]
    pub fn aggregate(&self, facts: &[StateWeekFact]) -> Vec<NationalWeekFact> {
        let mut by_week: BTreeMap<NaiveDate, Vec<&StateWeekFact>> = BTreeMap::new();
        for fact in facts {
            by_week.entry(fact.week_end_date).or_default().push(fact);
        }

        let mut population = None;
        let mut cumulative_cases = 0i64;
        let mut cumulative_deaths = 0i64;
        let rows: Vec<NationalWeekFact> = by_week
            .into_iter()
            .map(|(week, facts)| {
                if let Some(p) = self.population.get(week.year()) {
                    population = Some(p);
                }
                let weekly_cases: i64 = facts.iter().map(|f| f.weekly_cases).sum();
                let weekly_deaths: i64 = facts.iter().map(|f| f.weekly_deaths).sum();
                cumulative_cases += weekly_cases;
                cumulative_deaths += weekly_deaths;

                NationalWeekFact {
                    week_end_date: week,
                    vacc_pct_full_18p: self.weighted(&facts, |f| f.vacc_pct_full_18p),
                    vacc_pct_any_18p: self.weighted(&facts, |f| f.vacc_pct_any_18p),
                    booster_pct_18p: self
                        .has_booster
                        .then(|| self.weighted(&facts, |f| f.booster_pct_18p))
                        .flatten(),
                    weekly_cases,
                    weekly_deaths,
                    cases_per_100k: per_100k(weekly_cases as f64, population),
                    deaths_per_100k: per_100k(weekly_deaths as f64, population),
                    cumulative_cases,
                    cumulative_deaths,
                    cumulative_cases_per_100k: per_100k(cumulative_cases as f64, population),
                    cumulative_deaths_per_100k: per_100k(cumulative_deaths as f64, population),
                    hesitancy_pct: self.hesitancy,
                    population,
                }
            })
            .collect();

        info!(
            weeks = rows.len(),
            hesitancy = ?self.hesitancy,
            "National series aggregated"
        );
        rows
    }

    /// Population-weighted mean of one percentage across a week's regions.
    fn weighted(
        &self,
        facts: &[&StateWeekFact],
        metric: impl Fn(&StateWeekFact) -> Option<f64>,
    ) -> Option<f64> {
        let pairs: Vec<(f64, f64)> = facts
            .iter()
            .filter_map(|f| {
                let population = f.population? as f64;
                let value = match (metric(*f), self.gaps) {
                    (Some(v), _) => v,
                    (None, VaccinationGapPolicy::ZeroFill) => 0.0,
                    (None, VaccinationGapPolicy::Missing) => return None,
                };
                Some((value, population))
            })
            .collect();
        weighted_mean(&pairs)
    }
}
