//! Per-stop holdup profiles along a route.
//!
//! A profile attributes to each stop of a route the mean holdup while dwelling
//! there and the mean holdup on the trajectory to the next stop. Summing a
//! profile gives the delay (or, with absolute values, the deviation) of an
//! average ride along the route.

use crate::analyzers::aggregate::MetricCollection;
use crate::analyzers::utility::mean;
use crate::metrics::{HoldupMode, LegMetric, MetricField};
use crate::records::{LegRecord, LineId, RouteId, StopId};
use crate::trips::Assembly;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// The (at most) two routes with the most legs on `line`, most legs first.
/// Usually these are the two directions between the line's terminals.
pub fn main_routes_of_line(assembly: &Assembly, line: &LineId) -> Vec<RouteId> {
    let mut counts: HashMap<&RouteId, usize> = HashMap::new();
    for leg in assembly.legs().filter(|l| &l.line_id == line) {
        *counts.entry(&leg.route_id).or_default() += 1;
    }

    let mut ranked: Vec<(&RouteId, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.into_iter().take(2).map(|(r, _)| r.clone()).collect()
}

/// Stops of `route` in travel order, first stop included, final stop excluded.
///
/// The walk starts at the most common trip origin and follows each stop's
/// successor (the last one observed) until the most common destination.
pub fn stops_on_route(assembly: &Assembly, route: &RouteId) -> Vec<StopId> {
    let trips: Vec<_> = assembly
        .trips()
        .iter()
        .filter(|t| t.route_id() == route)
        .collect();

    let (Some(origin), Some(destination)) = (
        most_common(trips.iter().map(|t| t.origin())),
        most_common(trips.iter().map(|t| t.destination())),
    ) else {
        return Vec::new();
    };

    let mut successor: HashMap<&StopId, &StopId> = HashMap::new();
    for leg in trips.iter().flat_map(|t| t.legs()) {
        successor.insert(&leg.from_stop_id, &leg.to_stop_id);
    }

    let mut stops = Vec::new();
    let mut visited = HashSet::new();
    let mut current = origin;
    while current != destination && visited.insert(current) {
        let Some(&next) = successor.get(current) else {
            break;
        };
        stops.push(current.clone());
        current = next;
    }
    stops
}

fn most_common<'a>(items: impl Iterator<Item = &'a StopId>) -> Option<&'a StopId> {
    let mut counts: HashMap<&StopId, usize> = HashMap::new();
    for item in items {
        *counts.entry(item).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(stop, _)| stop)
}

/// Mean holdups attributed to one stop, over defined values only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopContribution {
    pub stop_id: StopId,
    pub observations: usize,
    pub holdup_at_stop: Option<f64>,
    pub holdup_between_stops: Option<f64>,
    pub holdup_total: Option<f64>,
}

impl StopContribution {
    pub fn mean(&self, mode: HoldupMode) -> Option<f64> {
        match mode {
            HoldupMode::AtStop => self.holdup_at_stop,
            HoldupMode::BetweenStops => self.holdup_between_stops,
            HoldupMode::Both => self.holdup_total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteProfile {
    pub route_id: RouteId,
    pub stops: Vec<StopContribution>,
}

impl RouteProfile {
    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    /// Sum of the per-stop means selected by `mode`. With `absolute`, each mean
    /// enters as its absolute value, giving the deviation of an average ride
    /// instead of its delay. Stops without data are skipped.
    pub fn delay_along_route(&self, mode: HoldupMode, absolute: bool) -> f64 {
        self.stops
            .iter()
            .filter_map(|s| s.mean(mode))
            .map(|m| if absolute { m.abs() } else { m })
            .sum()
    }

    /// Stops whose mean combined holdup is strictly above `cutoff`.
    pub fn major_contributions(&self, cutoff: f64) -> Vec<&StopContribution> {
        self.stops
            .iter()
            .filter(|s| s.holdup_total.is_some_and(|t| t > cutoff))
            .collect()
    }
}

/// Builds the holdup profile of `route` from the assembled trips.
#[tracing::instrument(skip_all, fields(route = %route))]
pub fn route_profile(assembly: &Assembly, route: &RouteId) -> RouteProfile {
    let observations: Vec<(&LegRecord, LegMetric)> = assembly
        .legs()
        .filter(|l| &l.route_id == route)
        .map(|l| (l, LegMetric::from_leg(l)))
        .collect();

    let by_stop = |field: MetricField| {
        MetricCollection::collect(
            format!("{field:?}"),
            observations.iter(),
            |(leg, _)| leg.from_stop_id.clone(),
            |(_, metric)| field.leg_value(metric, HoldupMode::Both),
        )
    };
    let at_stop = by_stop(MetricField::HoldupAtStop);
    let between = by_stop(MetricField::HoldupBetweenStops);
    let total = by_stop(MetricField::Holdup);

    let stops = stops_on_route(assembly, route)
        .into_iter()
        .map(|stop| {
            let group_mean = |c: &MetricCollection<StopId>| c.get(&stop).and_then(|g| mean(g.values()));
            StopContribution {
                observations: at_stop
                    .get(&stop)
                    .map(|g| g.values().len() + g.undefined())
                    .unwrap_or(0),
                holdup_at_stop: group_mean(&at_stop),
                holdup_between_stops: group_mean(&between),
                holdup_total: group_mean(&total),
                stop_id: stop,
            }
        })
        .collect::<Vec<_>>();

    debug!(stops = stops.len(), legs = observations.len(), "Route profile built");

    RouteProfile {
        route_id: route.clone(),
        stops,
    }
}

/// Delay (or, with `absolute`, deviation) of an average ride on `line`,
/// averaged over its main routes. With `per_stop` each route's value is
/// divided by its number of stops. `None` when the line has no usable route.
pub fn line_measure(
    assembly: &Assembly,
    line: &LineId,
    mode: HoldupMode,
    absolute: bool,
    per_stop: bool,
) -> Option<f64> {
    let measures: Vec<f64> = main_routes_of_line(assembly, line)
        .iter()
        .map(|route| route_profile(assembly, route))
        .filter(|profile| profile.stop_count() > 0)
        .map(|profile| {
            let value = profile.delay_along_route(mode, absolute);
            if per_stop {
                value / profile.stop_count() as f64
            } else {
                value
            }
        })
        .collect();

    mean(&measures)
}
