use std::collections::HashMap;
use std::collections::hash_map::Entry;

use super::Observation;

/// Left outer join on (region, date). The first right observation of a key
/// wins; later ones are counted as duplicates.
pub(super) fn exact_matches<L: Observation, R: Observation>(
    left: &[L],
    right: &[R],
) -> (Vec<Option<usize>>, usize) {
    let mut index = HashMap::with_capacity(right.len());
    let mut duplicates = 0;
    for (i, r) in right.iter().enumerate() {
        match index.entry((r.region(), r.date())) {
            Entry::Vacant(slot) => {
                slot.insert(i);
            }
            Entry::Occupied(_) => duplicates += 1,
        }
    }

    let matches = left
        .iter()
        .map(|l| index.get(&(l.region(), l.date())).copied())
        .collect();
    (matches, duplicates)
}
