use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::records::LegRecord;

/// How many legs of a dataset carry each actual-time observation, and how many
/// of them allow each holdup to be computed.
#[derive(Debug, Default, Serialize)]
pub struct CoverageStats {
    pub timestamp: DateTime<Utc>,
    pub dataset: Option<String>,
    pub total_legs: usize,

    // actual time fields
    pub with_actual_arrival_from: usize,
    pub with_actual_departure_from: usize,
    pub with_actual_arrival_to: usize,

    // computable holdups
    pub with_holdup_at_stop: usize,
    pub with_holdup_between_stops: usize,
    pub fully_observed: usize,
}

impl CoverageStats {
    pub fn from_legs<'a>(legs: impl IntoIterator<Item = &'a LegRecord>) -> Self {
        let mut s = CoverageStats {
            timestamp: Utc::now(),
            ..Default::default()
        };

        for leg in legs {
            s.total_legs += 1;

            let arrival = leg.actual_arrival_from.is_some();
            let departure = leg.actual_departure_from.is_some();
            let arrival_to = leg.actual_arrival_to.is_some();

            if arrival {
                s.with_actual_arrival_from += 1;
            }

            if departure {
                s.with_actual_departure_from += 1;
            }

            if arrival_to {
                s.with_actual_arrival_to += 1;
            }

            if arrival && departure {
                s.with_holdup_at_stop += 1;
            }

            if departure && arrival_to {
                s.with_holdup_between_stops += 1;
            }

            if arrival && departure && arrival_to {
                s.fully_observed += 1;
            }
        }

        s
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn fully_observed_pct(&self) -> f64 {
        Self::pct(self.fully_observed, self.total_legs)
    }

    /// Set the dataset name (usually the source file)
    pub fn with_dataset(mut self, dataset: &str) -> Self {
        self.dataset = Some(dataset.to_string());
        self
    }
}
