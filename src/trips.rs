//! Trip assembly: grouping leg records into ordered, validated trips.

use crate::error::MalformedTripError;
use crate::records::{LegRecord, LineId, RouteId, StopId, TripId};
use std::collections::HashMap;
use tracing::{debug, warn};

/// The legs of one vehicle run, ordered by `sequence_index` and chained stop
/// to stop. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
    legs: Vec<LegRecord>,
}

impl Trip {
    pub fn id(&self) -> &TripId {
        &self.legs[0].trip_id
    }

    pub fn legs(&self) -> &[LegRecord] {
        &self.legs
    }

    pub fn line_id(&self) -> &LineId {
        &self.legs[0].line_id
    }

    pub fn route_id(&self) -> &RouteId {
        &self.legs[0].route_id
    }

    /// First stop served.
    pub fn origin(&self) -> &StopId {
        &self.legs[0].from_stop_id
    }

    /// Final stop reached.
    pub fn destination(&self) -> &StopId {
        &self.legs[self.legs.len() - 1].to_stop_id
    }
}

/// Output of [`assemble_trips`]: well-formed trips in order of first
/// appearance in the input, plus one diagnostic per rejected trip.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    trips: Vec<Trip>,
    by_id: HashMap<TripId, usize>,
    diagnostics: Vec<MalformedTripError>,
}

impl Assembly {
    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn get(&self, trip_id: &TripId) -> Option<&Trip> {
        self.by_id.get(trip_id).map(|&i| &self.trips[i])
    }

    pub fn diagnostics(&self) -> &[MalformedTripError] {
        &self.diagnostics
    }

    pub fn legs(&self) -> impl Iterator<Item = &LegRecord> {
        self.trips.iter().flat_map(|t| t.legs.iter())
    }
}

/// Groups records by `trip_id` and validates each group independently.
///
/// A trip whose sequence indices have gaps or duplicates, or whose legs do not
/// chain (`to_stop_id` of leg *i* differs from `from_stop_id` of leg *i+1*),
/// is excluded and reported in [`Assembly::diagnostics`]. Other trips are
/// unaffected.
#[tracing::instrument(skip_all)]
pub fn assemble_trips(records: impl IntoIterator<Item = LegRecord>) -> Assembly {
    let mut index: HashMap<TripId, usize> = HashMap::new();
    let mut groups: Vec<Vec<LegRecord>> = Vec::new();

    for record in records {
        let slot = *index.entry(record.trip_id.clone()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(record);
    }

    let mut assembly = Assembly::default();

    for mut legs in groups {
        // stable, so equal indices keep input order
        legs.sort_by_key(|l| l.sequence_index);

        match validate(&legs) {
            Ok(()) => {
                let trip = Trip { legs };
                assembly.by_id.insert(trip.id().clone(), assembly.trips.len());
                assembly.trips.push(trip);
            }
            Err(e) => {
                warn!(trip_id = %e.trip_id(), error = %e, "Excluding malformed trip");
                assembly.diagnostics.push(e);
            }
        }
    }

    debug!(
        trips = assembly.trips.len(),
        malformed = assembly.diagnostics.len(),
        "Trips assembled"
    );

    assembly
}

fn validate(legs: &[LegRecord]) -> Result<(), MalformedTripError> {
    let first = &legs[0];
    if first.sequence_index > 1 {
        return Err(MalformedTripError::SequenceGap {
            trip_id: first.trip_id.clone(),
            expected: 0,
            found: first.sequence_index,
        });
    }

    for pair in legs.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);

        if next.sequence_index == current.sequence_index {
            return Err(MalformedTripError::DuplicateSequence {
                trip_id: current.trip_id.clone(),
                sequence_index: current.sequence_index,
            });
        }

        if next.sequence_index != current.sequence_index + 1 {
            return Err(MalformedTripError::SequenceGap {
                trip_id: current.trip_id.clone(),
                expected: current.sequence_index + 1,
                found: next.sequence_index,
            });
        }

        if current.to_stop_id != next.from_stop_id {
            return Err(MalformedTripError::BrokenChain {
                trip_id: current.trip_id.clone(),
                sequence_index: current.sequence_index,
                to_stop: current.to_stop_id.clone(),
                next_from_stop: next.from_stop_id.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{leg, trip_legs};

    #[test]
    fn test_legs_sorted_by_sequence_index() {
        let records = vec![leg("T1", 2, "C", "D"), leg("T1", 0, "A", "B"), leg("T1", 1, "B", "C")];

        let assembly = assemble_trips(records);

        assert!(assembly.diagnostics().is_empty());
        let trip = assembly.get(&"T1".into()).unwrap();
        let order: Vec<u32> = trip.legs().iter().map(|l| l.sequence_index).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert_eq!(trip.origin().as_str(), "A");
        assert_eq!(trip.destination().as_str(), "D");
    }

    #[test]
    fn test_lookup_by_trip_id() {
        let mut records = trip_legs("T9", "1", "A - C", &["A", "B", "C"], &[(0, 0), (0, 0)]);
        records.extend(vec![leg("BAD", 0, "A", "B"), leg("BAD", 2, "C", "D")]);
        records.extend(trip_legs("T2", "2", "C - A", &["C", "B", "A"], &[(0, 0), (0, 0)]));

        let assembly = assemble_trips(records);

        assert_eq!(assembly.get(&"T2".into()).unwrap().line_id().as_str(), "2");
        assert_eq!(assembly.get(&"T9".into()).unwrap().origin().as_str(), "A");
        assert!(assembly.get(&"BAD".into()).is_none());
        assert!(assembly.get(&"T404".into()).is_none());
    }

    #[test]
    fn test_sequence_may_start_at_one() {
        let records = vec![leg("T1", 1, "A", "B"), leg("T1", 2, "B", "C")];
        let assembly = assemble_trips(records);

        assert_eq!(assembly.trips().len(), 1);
    }

    #[test]
    fn test_trips_kept_in_first_appearance_order() {
        let mut records = trip_legs("T9", "1", "A - C", &["A", "B", "C"], &[(0, 0), (0, 0)]);
        records.extend(trip_legs("T2", "1", "A - C", &["A", "B", "C"], &[(0, 0), (0, 0)]));

        let assembly = assemble_trips(records);
        let ids: Vec<&str> = assembly.trips().iter().map(|t| t.id().as_str()).collect();
        assert_eq!(ids, vec!["T9", "T2"]);
    }

    #[test]
    fn test_gap_is_reported_and_other_trips_survive() {
        let mut records = vec![leg("T1", 0, "A", "B"), leg("T1", 2, "C", "D")];
        records.extend(trip_legs("T2", "1", "A - C", &["A", "B", "C"], &[(0, 0), (0, 0)]));

        let assembly = assemble_trips(records);

        assert_eq!(assembly.trips().len(), 1);
        assert_eq!(assembly.trips()[0].id().as_str(), "T2");
        assert_eq!(
            assembly.diagnostics(),
            &[MalformedTripError::SequenceGap {
                trip_id: "T1".into(),
                expected: 1,
                found: 2,
            }]
        );
    }

    #[test]
    fn test_late_start_is_a_gap() {
        let assembly = assemble_trips(vec![leg("T1", 3, "A", "B")]);
        assert!(matches!(
            assembly.diagnostics()[0],
            MalformedTripError::SequenceGap { expected: 0, found: 3, .. }
        ));
    }

    #[test]
    fn test_duplicate_sequence_index() {
        let records = vec![leg("T1", 0, "A", "B"), leg("T1", 0, "A", "B")];
        let assembly = assemble_trips(records);

        assert!(assembly.trips().is_empty());
        assert!(matches!(
            assembly.diagnostics()[0],
            MalformedTripError::DuplicateSequence { sequence_index: 0, .. }
        ));
    }

    #[test]
    fn test_broken_chain() {
        let records = vec![leg("T1", 0, "A", "B"), leg("T1", 1, "X", "C")];
        let assembly = assemble_trips(records);

        assert!(assembly.trips().is_empty());
        assert!(matches!(
            &assembly.diagnostics()[0],
            MalformedTripError::BrokenChain { to_stop, next_from_stop, .. }
                if to_stop.as_str() == "B" && next_from_stop.as_str() == "X"
        ));
    }

    #[test]
    fn test_empty_input() {
        let assembly = assemble_trips(Vec::new());
        assert!(assembly.trips().is_empty());
        assert!(assembly.diagnostics().is_empty());
    }
}
