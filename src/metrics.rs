//! Holdup, delay and deviation computation.
//!
//! A leg's holdups split the change in lateness over that leg into the part
//! gained while dwelling at `from_stop` and the part gained while travelling
//! to `to_stop`. A trip's delay is the signed sum of the selected holdups, its
//! deviation the sum of their absolute values.

use crate::records::{LegRecord, Seconds, TripId};
use crate::trips::Trip;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which holdups feed the per-leg and per-trip sums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum HoldupMode {
    /// Only time lost or gained while dwelling at a stop.
    AtStop,
    /// Only time lost or gained travelling between stops.
    BetweenStops,
    /// Both, combined per leg: arrival at a stop until arrival at the next.
    #[default]
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LegMetric {
    pub sequence_index: u32,
    pub holdup_at_stop: Option<Seconds>,
    pub holdup_between_stops: Option<Seconds>,
    /// Lateness on arrival at `to_stop`.
    pub arrival_delay: Option<Seconds>,
}

impl LegMetric {
    pub fn from_leg(leg: &LegRecord) -> Self {
        let arrival = leg.arrival_from_offset();
        let departure = leg.departure_from_offset();
        let arrival_to = leg.arrival_to_offset();

        LegMetric {
            sequence_index: leg.sequence_index,
            holdup_at_stop: departure.zip(arrival).map(|(d, a)| d - a),
            holdup_between_stops: arrival_to.zip(departure).map(|(t, d)| t - d),
            arrival_delay: arrival_to,
        }
    }

    /// The holdup selected by `mode`; `None` when any part of it is undefined.
    pub fn holdup(&self, mode: HoldupMode) -> Option<Seconds> {
        match mode {
            HoldupMode::AtStop => self.holdup_at_stop,
            HoldupMode::BetweenStops => self.holdup_between_stops,
            HoldupMode::Both => self
                .holdup_at_stop
                .zip(self.holdup_between_stops)
                .map(|(a, b)| a + b),
        }
    }
}

/// Delay and deviation of one trip under one [`HoldupMode`].
///
/// Legs whose selected holdup is undefined are skipped and counted in
/// `skipped_legs`. When no leg contributes, both sums are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TripMetric {
    pub trip_id: TripId,
    pub mode: HoldupMode,
    pub delay: Option<Seconds>,
    pub deviation: Option<Seconds>,
    pub legs: usize,
    pub skipped_legs: usize,
}

impl TripMetric {
    pub fn from_leg_metrics(trip_id: &TripId, legs: &[LegMetric], mode: HoldupMode) -> Self {
        let mut delay: Seconds = 0;
        let mut deviation: Seconds = 0;
        let mut contributing = 0;

        for holdup in legs.iter().filter_map(|l| l.holdup(mode)) {
            delay += holdup;
            deviation += holdup.abs();
            contributing += 1;
        }

        let defined = contributing > 0;
        TripMetric {
            trip_id: trip_id.clone(),
            mode,
            delay: defined.then_some(delay),
            deviation: defined.then_some(deviation),
            legs: legs.len(),
            skipped_legs: legs.len() - contributing,
        }
    }

    pub fn contributing_legs(&self) -> usize {
        self.legs - self.skipped_legs
    }

    /// Share of legs that contributed, in `[0, 1]`.
    pub fn completeness(&self) -> f64 {
        if self.legs == 0 {
            0.0
        } else {
            self.contributing_legs() as f64 / self.legs as f64
        }
    }
}

/// The quantity a query is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum MetricField {
    /// Per trip: signed sum of the mode's holdups.
    #[default]
    Delay,
    /// Per trip: sum of the absolute holdups.
    Deviation,
    /// Per leg.
    HoldupAtStop,
    /// Per leg.
    HoldupBetweenStops,
    /// Per leg: the holdup selected by the mode.
    Holdup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricLevel {
    Leg,
    Trip,
}

impl MetricField {
    pub fn level(self) -> MetricLevel {
        match self {
            MetricField::Delay | MetricField::Deviation => MetricLevel::Trip,
            MetricField::HoldupAtStop | MetricField::HoldupBetweenStops | MetricField::Holdup => {
                MetricLevel::Leg
            }
        }
    }

    /// Signed metrics are compared by absolute value in threshold queries:
    /// excessive earliness is as significant as lateness.
    pub fn is_signed(self) -> bool {
        !matches!(self, MetricField::Deviation)
    }

    /// Value of a leg-level field. Trip-level fields have no per-leg value.
    pub fn leg_value(self, metric: &LegMetric, mode: HoldupMode) -> Option<f64> {
        let seconds = match self {
            MetricField::HoldupAtStop => metric.holdup_at_stop,
            MetricField::HoldupBetweenStops => metric.holdup_between_stops,
            MetricField::Holdup => metric.holdup(mode),
            MetricField::Delay | MetricField::Deviation => None,
        };
        seconds.map(|s| s as f64)
    }

    /// Value of a trip-level field, optionally divided by the trip's leg count
    /// (seconds per stop). Leg-level fields have no per-trip value.
    pub fn trip_value(self, metric: &TripMetric, per_stop: bool) -> Option<f64> {
        let seconds = match self {
            MetricField::Delay => metric.delay,
            MetricField::Deviation => metric.deviation,
            _ => None,
        }?;

        if per_stop {
            Some(seconds as f64 / metric.legs as f64)
        } else {
            Some(seconds as f64)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TripEvaluation {
    pub legs: Vec<LegMetric>,
    pub trip: TripMetric,
}

/// Computes every leg's holdups and the trip's delay and deviation.
/// Summation runs in `sequence_index` order.
pub fn evaluate_trip(trip: &Trip, mode: HoldupMode) -> TripEvaluation {
    let legs: Vec<LegMetric> = trip.legs().iter().map(LegMetric::from_leg).collect();
    let metric = TripMetric::from_leg_metrics(trip.id(), &legs, mode);
    TripEvaluation { legs, trip: metric }
}
