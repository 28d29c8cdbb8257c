//! Holdup metrics and statistics for tram operations.
//!
//! Leg records (scheduled and observed times between consecutive stops) are
//! assembled into trips, turned into holdup, delay and deviation metrics, and
//! aggregated into grouped summaries, distributions and threshold
//! probabilities.

pub mod analyzers;
pub mod config;
pub mod error;
pub mod metrics;
pub mod output;
pub mod parser;
pub mod records;
pub mod stats;
pub mod trips;

#[cfg(test)]
mod testutil;
