//! Nearest-date join within a tolerance.
//!
//! Both sides are split per region into date-sorted arrays of indices into
//! the caller's slices. Each left date is binary-searched in its region's
//! right array, so no cross product is ever built. Regions are independent
//! and are matched in parallel.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rayon::prelude::*;

use super::Observation;
use crate::region::Region;

/// (date, index into the caller's slice)
type Entry = (NaiveDate, usize);

pub(super) fn nearest_matches<L, R>(
    left: &[L],
    right: &[R],
    max_gap_days: i64,
) -> (Vec<Option<usize>>, usize)
where
    L: Observation + Sync,
    R: Observation + Sync,
{
    let mut right_by_region: HashMap<Region, Vec<Entry>> = HashMap::new();
    for (i, r) in right.iter().enumerate() {
        right_by_region
            .entry(r.region())
            .or_default()
            .push((r.date(), i));
    }
    let mut duplicates = 0;
    for entries in right_by_region.values_mut() {
        entries.sort_unstable();
        let before = entries.len();
        // Sorted by (date, index): the first occurrence of a date survives.
        entries.dedup_by_key(|(date, _)| *date);
        duplicates += before - entries.len();
    }

    let mut left_by_region: BTreeMap<Region, Vec<Entry>> = BTreeMap::new();
    for (i, l) in left.iter().enumerate() {
        left_by_region
            .entry(l.region())
            .or_default()
            .push((l.date(), i));
    }
    let left_by_region: Vec<(Region, Vec<Entry>)> = left_by_region
        .into_iter()
        .map(|(region, mut entries)| {
            entries.sort_unstable();
            (region, entries)
        })
        .collect();

    let per_region: Vec<Vec<(usize, Option<usize>)>> = left_by_region
        .par_iter()
        .map(|(region, lefts)| match right_by_region.get(region) {
            Some(rights) => match_region(lefts, rights, max_gap_days),
            None => lefts.iter().map(|&(_, li)| (li, None)).collect(),
        })
        .collect();

    let mut matches = vec![None; left.len()];
    for (li, ri) in per_region.into_iter().flatten() {
        matches[li] = ri;
    }
    (matches, duplicates)
}

/// Matches one region. `lefts` and `rights` are sorted by date; lefts are
/// served in that order and each right entry can be claimed only once. For
/// every left date the closest unclaimed right date wins, the earlier one on
/// a tie, provided it is at most `max_gap_days` away.
fn match_region(
    lefts: &[Entry],
    rights: &[Entry],
    max_gap_days: i64,
) -> Vec<(usize, Option<usize>)> {
    let mut claimed = vec![false; rights.len()];

    lefts
        .iter()
        .map(|&(t, li)| {
            // rights[..pos] are before t, rights[pos..] are on or after t.
            let pos = rights.partition_point(|(date, _)| *date < t);

            let mut below = pos;
            while below > 0 && claimed[below - 1] {
                below -= 1;
            }
            let mut above = pos;
            while above < rights.len() && claimed[above] {
                above += 1;
            }

            let before = below
                .checked_sub(1)
                .map(|j| (j, (t - rights[j].0).num_days()))
                .filter(|&(_, gap)| gap <= max_gap_days);
            let after = (above < rights.len())
                .then(|| (above, (rights[above].0 - t).num_days()))
                .filter(|&(_, gap)| gap <= max_gap_days);

            let chosen = match (before, after) {
                (Some((j, gap_before)), Some((k, gap_after))) => {
                    if gap_before <= gap_after {
                        Some(j)
                    } else {
                        Some(k)
                    }
                }
                (Some((j, _)), None) => Some(j),
                (None, Some((k, _))) => Some(k),
                (None, None) => None,
            };

            match chosen {
                Some(j) => {
                    claimed[j] = true;
                    (li, Some(rights[j].1))
                }
                None => (li, None),
            }
        })
        .collect()
}
