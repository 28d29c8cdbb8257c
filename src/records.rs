//! Leg records as delivered by the dataset loader.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Time differences are always whole seconds.
pub type Seconds = i64;

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl AsRef<str>) -> Self {
                Self(s.as_ref().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(TripId);
string_id!(LineId);
string_id!(RouteId);
string_id!(StopId);

/// One tram movement between two consecutive stops.
///
/// Scheduled times are always present. Any actual time may be absent when the
/// vehicle was not observed; absence is `None`, never a sentinel value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegRecord {
    pub trip_id: TripId,
    pub line_id: LineId,
    pub route_id: RouteId,
    pub sequence_index: u32,
    pub from_stop_id: StopId,
    pub to_stop_id: StopId,

    pub scheduled_arrival_from: NaiveDateTime,
    pub scheduled_departure_from: NaiveDateTime,
    pub scheduled_arrival_to: NaiveDateTime,

    pub actual_arrival_from: Option<NaiveDateTime>,
    pub actual_departure_from: Option<NaiveDateTime>,
    pub actual_arrival_to: Option<NaiveDateTime>,
}

impl LegRecord {
    /// Lateness on arrival at `from_stop`.
    pub fn arrival_from_offset(&self) -> Option<Seconds> {
        offset(self.actual_arrival_from, self.scheduled_arrival_from)
    }

    /// Lateness on departure from `from_stop`.
    pub fn departure_from_offset(&self) -> Option<Seconds> {
        offset(self.actual_departure_from, self.scheduled_departure_from)
    }

    /// Lateness on arrival at `to_stop`.
    pub fn arrival_to_offset(&self) -> Option<Seconds> {
        offset(self.actual_arrival_to, self.scheduled_arrival_to)
    }

    pub fn segment(&self) -> (&StopId, &StopId) {
        (&self.from_stop_id, &self.to_stop_id)
    }
}

fn offset(actual: Option<NaiveDateTime>, scheduled: NaiveDateTime) -> Option<Seconds> {
    actual.map(|a| (a - scheduled).num_seconds())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::leg;

    #[test]
    fn test_identifier_display_and_ordering() {
        let a = StopId::new("BSTA");
        let b = StopId::from("BUCH");

        assert_eq!(a.to_string(), "BSTA");
        assert!(a < b);
        assert_eq!(a, StopId::from("BSTA".to_string()));
    }

    #[test]
    fn test_offsets_are_signed_seconds() {
        let record = leg("T1", 0, "A", "B").with_holdups(-30, 20, 15);

        assert_eq!(record.arrival_from_offset(), Some(-30));
        assert_eq!(record.departure_from_offset(), Some(-10));
        assert_eq!(record.arrival_to_offset(), Some(5));
    }

    #[test]
    fn test_missing_actual_time_has_no_offset() {
        let mut record = leg("T1", 0, "A", "B").with_holdups(0, 0, 0);
        record.actual_arrival_to = None;

        assert_eq!(record.arrival_to_offset(), None);
        assert_eq!(record.arrival_from_offset(), Some(0));
    }

    #[test]
    fn test_identifier_serializes_as_plain_string() {
        let json = serde_json::to_string(&LineId::new("11")).unwrap();
        assert_eq!(json, "\"11\"");
    }
}
