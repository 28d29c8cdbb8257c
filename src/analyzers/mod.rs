//! Aggregation and statistics over computed holdup metrics.
//!
//! Metric values are grouped by a key function into a [`aggregate::MetricCollection`],
//! summarized per group, and queried for empirical distributions and
//! threshold-exceedance probabilities. [`analyzer`] wires these stages to an
//! [`crate::config::AnalysisConfig`].

pub mod aggregate;
pub mod analyzer;
pub mod distribution;
pub mod profile;
pub mod threshold;
pub mod types;
pub mod utility;
