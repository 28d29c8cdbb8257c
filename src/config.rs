use crate::analyzers::aggregate::Grouping;
use crate::analyzers::distribution::DistributionSpec;
use crate::error::ConfigError;
use crate::metrics::{HoldupMode, MetricField};
use crate::records::{LineId, RouteId};
use crate::trips::Trip;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Selectors for one analysis run.
///
/// Stored as a JSON object; every field may be omitted:
/// ```json
/// {
///   "mode": "both",
///   "metric": "delay",
///   "grouping": "line",
///   "threshold": 60.0,
///   "per_stop": false,
///   "route": "REHA - AUZ",
///   "distribution": { "histogram": { "bins": { "bin_width": 30.0 } } }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Holdups feeding per-leg `holdup` and per-trip delay/deviation (default: both)
    #[serde(default)]
    pub mode: HoldupMode,
    /// Quantity to aggregate (default: delay)
    #[serde(default)]
    pub metric: MetricField,
    /// Key function for the aggregation (default: none)
    #[serde(default)]
    pub grouping: Grouping,
    /// Seconds a value must strictly exceed to count as significant (default: 60)
    #[serde(default = "AnalysisConfig::default_threshold")]
    pub threshold: f64,
    /// Divide trip-level values by the trip's leg count. Ignored for leg-level
    /// metrics (default: false)
    #[serde(default)]
    pub per_stop: bool,
    /// Histogram or density estimate (default: histogram, Sturges' bins)
    #[serde(default)]
    pub distribution: DistributionSpec,
    /// Only trips on this line (default: every line)
    #[serde(default)]
    pub line: Option<LineId>,
    /// Only trips on this route, i.e. one direction of a line (default: every route)
    #[serde(default)]
    pub route: Option<RouteId>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            mode: HoldupMode::default(),
            metric: MetricField::default(),
            grouping: Grouping::default(),
            threshold: Self::default_threshold(),
            per_stop: false,
            distribution: DistributionSpec::default(),
            line: None,
            route: None,
        }
    }
}

impl AnalysisConfig {
    fn default_threshold() -> f64 {
        60.0
    }

    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading analysis config '{path}'"))?;
        let config: AnalysisConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing analysis config '{path}'"))?;
        config.validate()?;
        Ok(config)
    }

    /// Whether `trip` passes the line and route filters.
    pub fn selects(&self, trip: &Trip) -> bool {
        self.line.as_ref().is_none_or(|line| trip.line_id() == line)
            && self.route.as_ref().is_none_or(|route| trip.route_id() == route)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.threshold.is_finite() && self.threshold >= 0.0) {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        self.distribution.validate()?;
        Ok(())
    }
}
