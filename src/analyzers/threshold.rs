use crate::analyzers::aggregate::{Group, MetricCollection};
use crate::error::InsufficientDataError;
use crate::metrics::MetricField;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;

/// How often a group's values exceed a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Exceedance {
    pub threshold: f64,
    pub observed: usize,
    pub exceeding: usize,
    pub probability: f64,
}

/// Empirical probability that a value exceeds `threshold`, compared strictly.
///
/// Signed fields (delay, holdups) compare `|value|`, so both lateness and
/// excessive earliness count; deviation is compared as is.
pub fn exceedance(
    group: &Group,
    field: MetricField,
    threshold: f64,
) -> Option<Exceedance> {
    let observed = group.values().len();
    if observed == 0 {
        return None;
    }

    let exceeding = group
        .values()
        .iter()
        .map(|&v| if field.is_signed() { v.abs() } else { v })
        .filter(|&v| v > threshold)
        .count();

    Some(Exceedance {
        threshold,
        observed,
        exceeding,
        probability: exceeding as f64 / observed as f64,
    })
}

/// Runs [`exceedance`] on every group. Groups without defined values yield
/// [`InsufficientDataError`] instead of a probability.
pub fn exceedance_by_group<K: Ord + Clone + Display>(
    collection: &MetricCollection<K>,
    field: MetricField,
    threshold: f64,
) -> BTreeMap<K, Result<Exceedance, InsufficientDataError>> {
    collection
        .groups()
        .map(|(key, group)| {
            let outcome = exceedance(group, field, threshold).ok_or_else(|| InsufficientDataError {
                group: key.to_string(),
                undefined: group.undefined(),
            });
            (key.clone(), outcome)
        })
        .collect()
}
