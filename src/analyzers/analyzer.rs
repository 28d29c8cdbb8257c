use crate::analyzers::aggregate::{GroupKey, MetricCollection, SummaryStats};
use crate::analyzers::distribution::{Distribution, DistributionSpec};
use crate::analyzers::threshold::{Exceedance, exceedance_by_group};
use crate::analyzers::types::{
    AnalysisReport, CompletenessReport, DistributionPoint, DistributionReport, GroupExceedance,
    GroupSummary,
};
use crate::config::AnalysisConfig;
use crate::error::{ConfigError, DistributionError, InsufficientDataError};
use crate::metrics::{HoldupMode, MetricLevel, TripEvaluation, evaluate_trip};
use crate::records::LegRecord;
use crate::trips::{Assembly, assemble_trips};
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Evaluates every assembled trip, in assembly order.
pub fn evaluate_trips(assembly: &Assembly, mode: HoldupMode) -> Vec<TripEvaluation> {
    assembly
        .trips()
        .iter()
        .map(|trip| evaluate_trip(trip, mode))
        .collect()
}

/// Builds the collection of `config.metric` values grouped by
/// `config.grouping`, over the trips selected by `config.line` and
/// `config.route`. Leg-level metrics contribute one value per leg,
/// trip-level metrics one per trip.
pub fn collect_metric(assembly: &Assembly, config: &AnalysisConfig) -> MetricCollection<GroupKey> {
    let evaluations = evaluate_trips(assembly, config.mode);
    collect_evaluated(assembly, &evaluations, config)
}

/// [`collect_metric`] over evaluations already computed with `config.mode`,
/// one per assembled trip and in assembly order.
#[tracing::instrument(skip_all, fields(metric = ?config.metric, grouping = ?config.grouping))]
pub fn collect_evaluated(
    assembly: &Assembly,
    evaluations: &[TripEvaluation],
    config: &AnalysisConfig,
) -> MetricCollection<GroupKey> {
    let field = config.metric;
    let name = format!("{field:?}");
    let selected = || {
        assembly
            .trips()
            .iter()
            .zip(evaluations)
            .filter(|(trip, _)| config.selects(trip))
    };

    let collection = match field.level() {
        MetricLevel::Leg => MetricCollection::collect(
            name,
            selected().flat_map(|(trip, evaluation)| trip.legs().iter().zip(&evaluation.legs)),
            |(leg, _)| config.grouping.leg_key(leg),
            |(_, metric)| field.leg_value(metric, config.mode),
        ),
        MetricLevel::Trip => MetricCollection::collect(
            name,
            selected(),
            |(trip, _)| config.grouping.trip_key(trip),
            |(_, evaluation)| field.trip_value(&evaluation.trip, config.per_stop),
        ),
    };

    debug!(
        groups = collection.len(),
        undefined = collection.undefined_total(),
        "Metric collection built"
    );
    collection
}

pub fn summarize(collection: &MetricCollection<GroupKey>) -> BTreeMap<GroupKey, SummaryStats> {
    collection.summarize()
}

/// Distribution of one group's values, or of all values when `group` is `None`.
pub fn distribution(
    collection: &MetricCollection<GroupKey>,
    group: Option<&GroupKey>,
    spec: &DistributionSpec,
) -> Result<Distribution, DistributionError> {
    match group {
        Some(key) => {
            let values = collection.get(key).map(|g| g.values()).unwrap_or_default();
            Distribution::build(values, spec)
        }
        None => Distribution::build(collection.pooled().values(), spec),
    }
}

pub fn threshold_probabilities(
    collection: &MetricCollection<GroupKey>,
    config: &AnalysisConfig,
) -> BTreeMap<GroupKey, Result<Exceedance, InsufficientDataError>> {
    exceedance_by_group(collection, config.metric, config.threshold)
}

/// Runs the whole pipeline: assembly, metric collection, summary statistics,
/// threshold probabilities and the distribution of `focus` (a group's display
/// name, e.g. `"line 4"`; all values when `None`).
#[tracing::instrument(skip_all, fields(legs = records.len()))]
pub fn analyze(
    records: Vec<LegRecord>,
    config: &AnalysisConfig,
    focus: Option<&str>,
) -> Result<AnalysisReport, ConfigError> {
    config.validate()?;

    let legs = records.len();
    let assembly = assemble_trips(records);
    let evaluations = evaluate_trips(&assembly, config.mode);
    let collection = collect_evaluated(&assembly, &evaluations, config);

    let incomplete_trips = evaluations
        .iter()
        .filter(|e| e.trip.skipped_legs > 0)
        .count();

    let summaries = summarize(&collection)
        .into_iter()
        .map(|(key, stats)| GroupSummary {
            group: key.to_string(),
            stats,
        })
        .collect();

    let exceedance = threshold_probabilities(&collection, config)
        .into_iter()
        .map(|(key, outcome)| GroupExceedance {
            group: key.to_string(),
            insufficient_data: outcome.is_err(),
            exceedance: outcome.ok(),
        })
        .collect();

    let focus_key = focus.map(|name| {
        collection
            .groups()
            .map(|(key, _)| key)
            .find(|key| key.to_string() == name)
    });
    let built = match focus_key {
        Some(None) => Err(DistributionError::EmptyGroup),
        Some(Some(key)) => distribution(&collection, Some(key), &config.distribution),
        None => distribution(&collection, None, &config.distribution),
    };
    let distribution = DistributionReport {
        group: focus.unwrap_or("all").to_string(),
        points: built
            .as_ref()
            .map(|d| {
                d.points()
                    .map(|(value, weight)| DistributionPoint { value, weight })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default(),
        error: built.as_ref().err().map(|e| e.to_string()),
        distribution: built.ok(),
    };

    info!(
        trips = assembly.trips().len(),
        malformed = assembly.diagnostics().len(),
        incomplete_trips,
        groups = collection.len(),
        "Analysis complete"
    );

    Ok(AnalysisReport {
        schema_version: 1,
        generated_at: Utc::now(),
        config: config.clone(),
        completeness: CompletenessReport {
            legs,
            trips: assembly.trips().len(),
            malformed_trips: assembly
                .diagnostics()
                .iter()
                .map(|e| e.to_string())
                .collect(),
            incomplete_trips,
            undefined_values: collection.undefined_total(),
        },
        summaries,
        exceedance,
        distribution,
    })
}
