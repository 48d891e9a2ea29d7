//! Folding raw readings into per-field totals and averages.

use crate::types::{FieldMap, Reading};
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone, Copy)]
struct FieldTotal {
    sum: f64,
    count: u32,
}

/// Per-field sum and number of readings that carried the field
fn field_totals(points: &[Reading]) -> BTreeMap<&str, FieldTotal> {
    let mut totals: BTreeMap<&str, FieldTotal> = BTreeMap::new();
    for point in points {
        for (name, value) in &point.fields {
            let total = totals.entry(name.as_str()).or_default();
            total.sum += value;
            total.count += 1;
        }
    }
    totals
}

/// Sum of every field across the readings that contain it.
///
/// A reading without a given field contributes nothing to it.
pub fn aggregate_sum(points: &[Reading]) -> FieldMap {
    field_totals(points)
        .into_iter()
        .map(|(name, total)| (name.to_string(), total.sum))
        .collect()
}

/// Mean of every field over the readings that contain it.
///
/// Sparse fields are averaged over their own occurrences, not over the total
/// number of readings. No readings gives an empty map.
pub fn aggregate_average(points: &[Reading]) -> FieldMap {
    field_totals(points)
        .into_iter()
        .map(|(name, total)| (name.to_string(), total.sum / f64::from(total.count)))
        .collect()
}
