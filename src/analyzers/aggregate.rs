use crate::analyzers::utility::Moments;
use crate::records::{LegRecord, LineId, RouteId, StopId};
use crate::trips::Trip;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifies one group of metric values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    All,
    Line(LineId),
    Route(RouteId),
    Stop(StopId),
    Segment(StopId, StopId),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::All => write!(f, "all"),
            GroupKey::Line(line) => write!(f, "line {line}"),
            GroupKey::Route(route) => write!(f, "route {route}"),
            GroupKey::Stop(stop) => write!(f, "stop {stop}"),
            GroupKey::Segment(from, to) => write!(f, "segment {from} -> {to}"),
        }
    }
}

/// Built-in key functions.
///
/// Leg metrics group by the leg's own line, route, departure stop or
/// `(from, to)` segment. Trip metrics group by the trip's line and route, by
/// its origin stop, or by its origin-destination pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Grouping {
    Line,
    Route,
    Stop,
    Segment,
    #[default]
    #[serde(rename = "none")]
    #[value(name = "none")]
    Ungrouped,
}

impl Grouping {
    pub fn leg_key(self, leg: &LegRecord) -> GroupKey {
        match self {
            Grouping::Line => GroupKey::Line(leg.line_id.clone()),
            Grouping::Route => GroupKey::Route(leg.route_id.clone()),
            Grouping::Stop => GroupKey::Stop(leg.from_stop_id.clone()),
            Grouping::Segment => {
                GroupKey::Segment(leg.from_stop_id.clone(), leg.to_stop_id.clone())
            }
            Grouping::Ungrouped => GroupKey::All,
        }
    }

    pub fn trip_key(self, trip: &Trip) -> GroupKey {
        match self {
            Grouping::Line => GroupKey::Line(trip.line_id().clone()),
            Grouping::Route => GroupKey::Route(trip.route_id().clone()),
            Grouping::Stop => GroupKey::Stop(trip.origin().clone()),
            Grouping::Segment => {
                GroupKey::Segment(trip.origin().clone(), trip.destination().clone())
            }
            Grouping::Ungrouped => GroupKey::All,
        }
    }
}

/// Defined values of one group in contribution order, plus how many
/// contributions were undefined.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    values: Vec<f64>,
    undefined: usize,
}

impl Group {
    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values, undefined: 0 }
    }

    pub fn push(&mut self, value: Option<f64>) {
        match value {
            Some(v) => self.values.push(v),
            None => self.undefined += 1,
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn undefined(&self) -> usize {
        self.undefined
    }

    pub fn moments(&self) -> Moments {
        Moments::from_values(&self.values)
    }

    pub fn summary(&self) -> SummaryStats {
        let moments = self.moments();

        SummaryStats {
            count: moments.count(),
            undefined: self.undefined,
            mean: moments.mean(),
            std_dev: moments.sample_stddev(),
            min: moments.min(),
            max: moments.max(),
        }
    }
}

/// Count, mean, sample standard deviation and range of one group.
///
/// An empty group has `count == 0` and every statistic `None`; the standard
/// deviation is also `None` for a single value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryStats {
    pub count: usize,
    pub undefined: usize,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl SummaryStats {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Named mapping from group key to the metric values contributing to it.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricCollection<K: Ord> {
    name: String,
    groups: BTreeMap<K, Group>,
}

impl<K: Ord + Clone> MetricCollection<K> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: BTreeMap::new(),
        }
    }

    /// Groups `items` with a caller-supplied key function. `value_fn`
    /// returning `None` marks an undefined value: it is counted for its group
    /// but never enters any statistic.
    pub fn collect<T, I, KF, VF>(name: impl Into<String>, items: I, key_fn: KF, value_fn: VF) -> Self
    where
        I: IntoIterator<Item = T>,
        KF: Fn(&T) -> K,
        VF: Fn(&T) -> Option<f64>,
    {
        let mut collection = Self::new(name);
        for item in items {
            collection.insert(key_fn(&item), value_fn(&item));
        }
        collection
    }

    pub fn insert(&mut self, key: K, value: Option<f64>) {
        self.groups.entry(key).or_default().push(value);
    }

    /// Appends every group of `other` after this collection's values.
    pub fn merge(mut self, other: MetricCollection<K>) -> Self {
        for (key, group) in other.groups {
            let target = self.groups.entry(key).or_default();
            target.values.extend(group.values);
            target.undefined += group.undefined;
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &K) -> Option<&Group> {
        self.groups.get(key)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&K, &Group)> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Every group's values concatenated in key order.
    pub fn pooled(&self) -> Group {
        let mut pooled = Group::default();
        for group in self.groups.values() {
            pooled.values.extend_from_slice(&group.values);
            pooled.undefined += group.undefined;
        }
        pooled
    }

    pub fn undefined_total(&self) -> usize {
        self.groups.values().map(|g| g.undefined).sum()
    }

    pub fn summarize(&self) -> BTreeMap<K, SummaryStats> {
        self.groups
            .iter()
            .map(|(key, group)| (key.clone(), group.summary()))
            .collect()
    }

    pub fn moments(&self) -> BTreeMap<K, Moments> {
        self.groups
            .iter()
            .map(|(key, group)| (key.clone(), group.moments()))
            .collect()
    }
}
