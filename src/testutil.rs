use crate::records::{LegRecord, Seconds};
use chrono::{Duration, NaiveDate, NaiveDateTime};

const LEG_SECONDS: i64 = 180;
const DWELL_SECONDS: i64 = 30;

fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(6, 0, 0)
        .unwrap()
}

/// A leg on line "1", route "A - Z" with a regular schedule and no observations.
pub(crate) fn leg(trip_id: &str, sequence_index: u32, from: &str, to: &str) -> LegRecord {
    let start = base_time() + Duration::seconds(LEG_SECONDS * sequence_index as i64);
    LegRecord {
        trip_id: trip_id.into(),
        line_id: "1".into(),
        route_id: "A - Z".into(),
        sequence_index,
        from_stop_id: from.into(),
        to_stop_id: to.into(),
        scheduled_arrival_from: start,
        scheduled_departure_from: start + Duration::seconds(DWELL_SECONDS),
        scheduled_arrival_to: start + Duration::seconds(LEG_SECONDS),
        actual_arrival_from: None,
        actual_departure_from: None,
        actual_arrival_to: None,
    }
}

impl LegRecord {
    /// Fills in actual times so the leg arrives `arrival_offset` late and then
    /// loses `at_stop` seconds dwelling and `between` seconds travelling.
    pub(crate) fn with_holdups(mut self, arrival_offset: Seconds, at_stop: Seconds, between: Seconds) -> Self {
        self.actual_arrival_from = Some(self.scheduled_arrival_from + Duration::seconds(arrival_offset));
        self.actual_departure_from =
            Some(self.scheduled_departure_from + Duration::seconds(arrival_offset + at_stop));
        self.actual_arrival_to =
            Some(self.scheduled_arrival_to + Duration::seconds(arrival_offset + at_stop + between));
        self
    }

    pub(crate) fn on(mut self, line: &str, route: &str) -> Self {
        self.line_id = line.into();
        self.route_id = route.into();
        self
    }
}

/// Chained legs through `stops`, one `(at_stop, between)` holdup pair per leg.
pub(crate) fn trip_legs(
    trip_id: &str,
    line: &str,
    route: &str,
    stops: &[&str],
    holdups: &[(Seconds, Seconds)],
) -> Vec<LegRecord> {
    let mut offset = 0;
    stops
        .windows(2)
        .zip(holdups)
        .enumerate()
        .map(|(i, (pair, &(at_stop, between)))| {
            let record = leg(trip_id, i as u32, pair[0], pair[1])
                .on(line, route)
                .with_holdups(offset, at_stop, between);
            offset += at_stop + between;
            record
        })
        .collect()
}
