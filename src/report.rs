//! Run diagnostics and the post-run summary.
//!
//! Recoverable problems (bad cells, unknown regions, out-of-range percentages)
//! are tallied per input table in [`Diagnostics`] while the pipeline runs and
//! surfaced once at the end as warnings and in the JSON [`RunReport`].

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{info, warn};

use crate::types::StateWeekFact;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A non-blank date or number cell that could not be parsed.
    UnparsableValue,
    /// A row whose region label has no known mapping; the row is dropped.
    UnmappableRegion,
    /// A percentage outside `[0, 100]`; set to missing.
    OutOfRangeValue,
    /// A second observation for an already-seen (region, date) key.
    DuplicateObservation,
    /// A county survey row with no matching county population.
    UnmatchedCounty,
    /// A cumulative total that decreased between consecutive reports.
    NegativeIncrement,
    /// A region-year absent from the population table.
    PopulationGap,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    issues: BTreeMap<String, BTreeMap<IssueKind, usize>>,
    unmapped_regions: BTreeMap<String, BTreeSet<String>>,
}

impl Diagnostics {
    pub fn record(&mut self, table: &str, kind: IssueKind) {
        self.record_n(table, kind, 1);
    }

    pub fn record_n(&mut self, table: &str, kind: IssueKind, n: usize) {
        if n == 0 {
            return;
        }
        *self
            .issues
            .entry(table.to_string())
            .or_default()
            .entry(kind)
            .or_default() += n;
    }

    /// Records a dropped row together with the label that failed to map.
    pub fn record_unmapped(&mut self, table: &str, label: &str) {
        self.record(table, IssueKind::UnmappableRegion);
        self.unmapped_regions
            .entry(table.to_string())
            .or_default()
            .insert(label.trim().to_string());
    }

    pub fn count(&self, table: &str, kind: IssueKind) -> usize {
        self.issues
            .get(table)
            .and_then(|kinds| kinds.get(&kind))
            .copied()
            .unwrap_or(0)
    }

    pub fn unmapped(&self, table: &str) -> Option<&BTreeSet<String>> {
        self.unmapped_regions.get(table)
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Emits one warning per (table, issue kind).
    pub fn log_summary(&self) {
        for (table, kinds) in &self.issues {
            for (kind, count) in kinds {
                warn!(table = %table, kind = ?kind, count, "Recoverable data issues");
            }
        }
        for (table, labels) in &self.unmapped_regions {
            let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
            warn!(table = %table, labels = ?labels, "Unmapped region labels");
        }
    }
}

/// Share of `part` in `total` as a percentage; 0 when `total` is 0.
pub fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// How much of the state-week grid was actually backed by input data.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Coverage {
    pub state_weeks: usize,
    pub missing_vacc_full_pct: f64,
    pub missing_population_pct: f64,
    pub missing_hesitancy_pct: f64,
    pub weeks_with_case_report_pct: f64,
    pub weeks_with_vaccination_report_pct: f64,
}

impl Coverage {
    pub fn from_facts(
        facts: &[StateWeekFact],
        case_matches: usize,
        vaccination_matches: usize,
    ) -> Self {
        let state_weeks = facts
            .iter()
            .map(|f| (f.region, f.week_end_date))
            .collect::<BTreeSet<_>>()
            .len();
        let total = facts.len();

        Coverage {
            state_weeks,
            missing_vacc_full_pct: pct(
                facts.iter().filter(|f| f.vacc_pct_full_18p.is_none()).count(),
                total,
            ),
            missing_population_pct: pct(
                facts.iter().filter(|f| f.population.is_none()).count(),
                total,
            ),
            missing_hesitancy_pct: pct(
                facts.iter().filter(|f| f.hesitancy_pct.is_none()).count(),
                total,
            ),
            weeks_with_case_report_pct: pct(case_matches, total),
            weeks_with_vaccination_report_pct: pct(vaccination_matches, total),
        }
    }
}

/// Everything a run reports besides its output tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub state_week_rows: usize,
    pub national_week_rows: usize,
    pub event_rows: usize,
    pub coverage: Coverage,
    pub diagnostics: Diagnostics,
}

impl RunReport {
    pub fn log(&self) {
        info!(
            state_week_rows = self.state_week_rows,
            national_week_rows = self.national_week_rows,
            event_rows = self.event_rows,
            "Pipeline complete"
        );
        info!(
            state_weeks = self.coverage.state_weeks,
            missing_vacc_full_pct = %format!("{:.1}", self.coverage.missing_vacc_full_pct),
            missing_population_pct = %format!("{:.1}", self.coverage.missing_population_pct),
            weeks_with_case_report_pct =
                %format!("{:.1}", self.coverage.weeks_with_case_report_pct),
            weeks_with_vaccination_report_pct =
                %format!("{:.1}", self.coverage.weeks_with_vaccination_report_pct),
            "Coverage"
        );
        self.diagnostics.log_summary();
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
