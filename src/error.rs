use crate::records::{StopId, TripId};
use thiserror::Error;

/// Structural violation in a trip's leg chain. The trip is excluded from
/// every downstream computation and kept as a diagnostic.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedTripError {
    #[error("trip {trip_id}: sequence index {sequence_index} occurs more than once")]
    DuplicateSequence { trip_id: TripId, sequence_index: u32 },
    #[error("trip {trip_id}: expected sequence index {expected}, found {found}")]
    SequenceGap {
        trip_id: TripId,
        expected: u32,
        found: u32,
    },
    #[error(
        "trip {trip_id}: leg {sequence_index} ends at {to_stop} but the next leg starts at {next_from_stop}"
    )]
    BrokenChain {
        trip_id: TripId,
        sequence_index: u32,
        to_stop: StopId,
        next_from_stop: StopId,
    },
}

impl MalformedTripError {
    pub fn trip_id(&self) -> &TripId {
        match self {
            MalformedTripError::DuplicateSequence { trip_id, .. }
            | MalformedTripError::SequenceGap { trip_id, .. }
            | MalformedTripError::BrokenChain { trip_id, .. } => trip_id,
        }
    }
}

/// A group had no defined values, so no probability can be given for it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("group {group} has no defined values ({undefined} undefined)")]
pub struct InsufficientDataError {
    pub group: String,
    pub undefined: usize,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistributionError {
    #[error("no defined values to estimate a distribution from")]
    EmptyGroup,
    #[error("invalid histogram bins: {0}")]
    InvalidBinSpec(String),
    #[error("invalid bandwidth: {0}")]
    InvalidBandwidth(String),
    #[error("invalid evaluation grid: {0}")]
    InvalidGrid(String),
    #[error("density vanishes on the evaluation grid")]
    DegenerateGrid,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("threshold must be a finite non-negative number of seconds, got {0}")]
    InvalidThreshold(f64),
    #[error(transparent)]
    Distribution(#[from] DistributionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broken_chain_message() {
        let err = MalformedTripError::BrokenChain {
            trip_id: "T7".into(),
            sequence_index: 2,
            to_stop: "HB".into(),
            next_from_stop: "BELL".into(),
        };
        assert_eq!(
            err.to_string(),
            "trip T7: leg 2 ends at HB but the next leg starts at BELL"
        );
        assert_eq!(err.trip_id().as_str(), "T7");
    }

    #[test]
    fn test_insufficient_data_message() {
        let err = InsufficientDataError {
            group: "line 4".into(),
            undefined: 3,
        };
        assert_eq!(err.to_string(), "group line 4 has no defined values (3 undefined)");
    }

    #[test]
    fn test_config_error_wraps_distribution_error() {
        let err: ConfigError = DistributionError::EmptyGroup.into();
        assert!(matches!(err, ConfigError::Distribution(DistributionError::EmptyGroup)));
        assert_eq!(err.to_string(), "no defined values to estimate a distribution from");
    }
}
