//! Temporal alignment of region-keyed series.
//!
//! [`align`] matches every left observation to at most one right observation
//! of the same region, either on an identical date ([`JoinMode::Exact`]) or
//! on the closest date within a tolerance ([`JoinMode::Nearest`]). The result
//! has one [`Aligned`] row per left observation, in left input order.

mod exact;
mod nearest;

use chrono::NaiveDate;
use tracing::debug;

use crate::config::JoinMode;
use crate::ingest::{CaseObservation, VaccinationObservation};
use crate::region::Region;

/// Anything keyed by region and date.
pub trait Observation {
    fn region(&self) -> Region;
    fn date(&self) -> NaiveDate;
}

impl Observation for CaseObservation {
    fn region(&self) -> Region {
        self.region
    }

    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Observation for VaccinationObservation {
    fn region(&self) -> Region {
        self.region
    }

    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// A left observation and its match, if any.
#[derive(Debug)]
pub struct Aligned<'a, L, R> {
    pub left: &'a L,
    pub right: Option<&'a R>,
}

// Manual impls: derives would require `L: Clone` and `R: Clone`.
impl<L, R> Clone for Aligned<'_, L, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<L, R> Copy for Aligned<'_, L, R> {}

#[derive(Debug)]
pub struct Alignment<'a, L, R> {
    pub rows: Vec<Aligned<'a, L, R>>,
    /// Right observations ignored because an earlier one had the same
    /// (region, date) key.
    pub duplicate_right: usize,
}

impl<L, R> Alignment<'_, L, R> {
    pub fn matched(&self) -> usize {
        self.rows.iter().filter(|a| a.right.is_some()).count()
    }
}

/// Left-joins `right` onto `left` under `mode`. Never fails: regions present
/// on one side only, and empty inputs, simply produce unmatched rows.
pub fn align<'a, L, R>(left: &'a [L], right: &'a [R], mode: JoinMode) -> Alignment<'a, L, R>
where
    L: Observation + Sync,
    R: Observation + Sync,
{
    let (matches, duplicate_right) = match mode {
        JoinMode::Exact => exact::exact_matches(left, right),
        JoinMode::Nearest { max_gap_days } => {
            nearest::nearest_matches(left, right, max_gap_days)
        }
    };

    let rows: Vec<_> = left
        .iter()
        .zip(matches)
        .map(|(l, m)| Aligned {
            left: l,
            right: m.map(|i| &right[i]),
        })
        .collect();

    let alignment = Alignment {
        rows,
        duplicate_right,
    };
    debug!(
        ?mode,
        left = left.len(),
        right = right.len(),
        matched = alignment.matched(),
        duplicate_right,
        "Aligned series"
    );
    alignment
}
