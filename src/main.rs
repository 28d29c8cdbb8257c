//! CLI entry point for the tram holdup analysis tool.
//!
//! Provides subcommands for running a configured analysis over a week of leg
//! records, profiling one direction of a line, and recording data coverage.

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use tram_holdups::analyzers::aggregate::Grouping;
use tram_holdups::analyzers::analyzer::analyze;
use tram_holdups::analyzers::profile::{line_measure, main_routes_of_line, route_profile};
use tram_holdups::config::AnalysisConfig;
use tram_holdups::metrics::{HoldupMode, MetricField};
use tram_holdups::output::{append_record, print_json, print_pretty, write_json};
use tram_holdups::parser::load_legs;
use tram_holdups::records::{LineId, RouteId};
use tram_holdups::stats::CoverageStats;
use tram_holdups::trips::assemble_trips;

#[derive(Parser)]
#[command(name = "tram_holdups")]
#[command(about = "Holdup, delay and deviation statistics for tram operations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute grouped statistics, threshold probabilities and a distribution
    Analyze {
        /// CSV file of leg records
        #[arg(value_name = "CSV")]
        source: String,

        /// JSON analysis config; flags below override its fields
        #[arg(short, long)]
        config: Option<String>,

        #[arg(long, value_enum)]
        mode: Option<HoldupMode>,

        #[arg(long, value_enum)]
        metric: Option<MetricField>,

        #[arg(short, long, value_enum)]
        grouping: Option<Grouping>,

        /// Seconds a value must strictly exceed
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Divide trip-level values by the number of stops
        #[arg(long, default_value_t = false)]
        per_stop: bool,

        /// Only trips on this line
        #[arg(short, long)]
        line: Option<String>,

        /// Only trips on this route (one direction of a line)
        #[arg(short, long)]
        route: Option<String>,

        /// Group whose distribution is reported, e.g. "line 4" (default: all values)
        #[arg(long)]
        group: Option<String>,

        /// File to write the JSON report to
        #[arg(short, long, default_value = "report.json")]
        output: String,
    },
    /// Per-stop holdup profile of one direction of a line
    Profile {
        #[arg(value_name = "CSV")]
        source: String,

        #[arg(short, long)]
        line: String,

        /// Profile the line's second main route instead of the first
        #[arg(short, long, default_value_t = false)]
        reverse: bool,

        #[arg(long, value_enum, default_value_t = HoldupMode::Both)]
        mode: HoldupMode,

        /// Mean combined holdup (seconds) above which a stop is reported
        #[arg(long, default_value_t = 5.0)]
        cutoff: f64,
    },
    /// Count legs carrying each observed time
    Coverage {
        #[arg(value_name = "CSV")]
        source: String,

        /// CSV file to append results to
        #[arg(short, long, default_value = "coverage.csv")]
        output: String,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/tram_holdups.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("tram_holdups.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            source,
            config,
            mode,
            metric,
            grouping,
            threshold,
            per_stop,
            line,
            route,
            group,
            output,
        } => {
            let mut config = match config {
                Some(path) => AnalysisConfig::load(&path)?,
                None => AnalysisConfig::default(),
            };
            if let Some(mode) = mode {
                config.mode = mode;
            }
            if let Some(metric) = metric {
                config.metric = metric;
            }
            if let Some(grouping) = grouping {
                config.grouping = grouping;
            }
            if let Some(threshold) = threshold {
                config.threshold = threshold;
            }
            config.per_stop |= per_stop;
            if let Some(line) = line {
                config.line = Some(LineId::new(line));
            }
            if let Some(route) = route {
                config.route = Some(RouteId::new(route));
            }

            let legs = load_legs(&source)?;
            let report = analyze(legs, &config, group.as_deref())?;

            for summary in &report.summaries {
                info!(
                    group = %summary.group,
                    count = summary.stats.count,
                    mean = ?summary.stats.mean,
                    std_dev = ?summary.stats.std_dev,
                    "Group summary"
                );
            }
            if let Some(error) = &report.distribution.error {
                warn!(group = %report.distribution.group, error = %error, "No distribution");
            }

            write_json(&output, &report)?;
            info!(output, "Report written");
        }
        Commands::Profile {
            source,
            line,
            reverse,
            mode,
            cutoff,
        } => {
            let assembly = assemble_trips(load_legs(&source)?);
            let line = LineId::new(line);

            let routes = main_routes_of_line(&assembly, &line);
            let Some(route) = routes.get(usize::from(reverse)) else {
                bail!("line {line} has no route {}", if reverse { "in reverse" } else { "at all" });
            };

            let profile = route_profile(&assembly, route);
            print_pretty(&profile);

            for stop in profile.major_contributions(cutoff) {
                info!(
                    stop = %stop.stop_id,
                    holdup_at_stop = ?stop.holdup_at_stop,
                    holdup_between_stops = ?stop.holdup_between_stops,
                    holdup_total = ?stop.holdup_total,
                    "Major contribution"
                );
            }

            info!(
                route = %route,
                stops = profile.stop_count(),
                delay = profile.delay_along_route(mode, false),
                deviation = profile.delay_along_route(mode, true),
                line_delay = ?line_measure(&assembly, &line, mode, false, false),
                line_deviation = ?line_measure(&assembly, &line, mode, true, false),
                "Route profile"
            );
        }
        Commands::Coverage { source, output } => {
            let legs = load_legs(&source)?;
            let stats = CoverageStats::from_legs(&legs).with_dataset(&source);
            info!(
                legs = stats.total_legs,
                fully_observed_pct = stats.fully_observed_pct(),
                "Coverage"
            );
            print_json(&stats)?;

            append_record(&output, &stats)?;
        }
    }

    Ok(())
}
