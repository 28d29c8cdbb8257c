//! Serializable report types handed to presentation code.

use crate::analyzers::aggregate::SummaryStats;
use crate::analyzers::distribution::Distribution;
use crate::analyzers::threshold::Exceedance;
use crate::config::AnalysisConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Summary statistics of one group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub group: String,
    #[serde(flatten)]
    pub stats: SummaryStats,
}

/// Threshold outcome of one group. `exceedance` is `None` when the group had
/// no defined values.
#[derive(Debug, Clone, Serialize)]
pub struct GroupExceedance {
    pub group: String,
    pub insufficient_data: bool,
    pub exceedance: Option<Exceedance>,
}

/// One `(value, count-or-density)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistributionPoint {
    pub value: f64,
    pub weight: f64,
}

/// Distribution of the selected group, or the reason none could be built.
#[derive(Debug, Clone, Serialize)]
pub struct DistributionReport {
    pub group: String,
    pub distribution: Option<Distribution>,
    pub points: Vec<DistributionPoint>,
    pub error: Option<String>,
}

/// How much of the input survived into the metric collection.
#[derive(Debug, Clone, Serialize)]
pub struct CompletenessReport {
    pub legs: usize,
    pub trips: usize,
    pub malformed_trips: Vec<String>,
    /// Trips with at least one leg skipped for missing data.
    pub incomplete_trips: usize,
    pub undefined_values: usize,
}

/// Complete result of one configured analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub schema_version: u8,
    pub generated_at: DateTime<Utc>,
    pub config: AnalysisConfig,
    pub completeness: CompletenessReport,
    pub summaries: Vec<GroupSummary>,
    pub exceedance: Vec<GroupExceedance>,
    pub distribution: DistributionReport,
}
