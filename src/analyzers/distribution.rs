//! Empirical distributions of metric values: fixed-width histograms and
//! Gaussian kernel density estimates.
//!
//! Both representations are plain values that regenerate the same
//! `(value, count-or-density)` sequence every time [`Distribution::points`]
//! is called.

use crate::analyzers::utility::{mean, sample_stddev};
use crate::error::DistributionError;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// How histogram bins are laid out over the observed range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinSpec {
    BinCount(usize),
    BinWidth(f64),
    /// Sturges' rule: `ceil(log2(n)) + 1` bins.
    Auto,
}

impl BinSpec {
    pub fn validate(&self) -> Result<(), DistributionError> {
        match *self {
            BinSpec::BinCount(0) => Err(DistributionError::InvalidBinSpec(
                "bin count must be positive".into(),
            )),
            BinSpec::BinCount(n) if n > MAX_BINS => Err(DistributionError::InvalidBinSpec(
                format!("{n} bins exceed the limit of {MAX_BINS}"),
            )),
            BinSpec::BinWidth(w) if !(w.is_finite() && w > 0.0) => Err(
                DistributionError::InvalidBinSpec(format!("bin width must be positive, got {w}")),
            ),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bandwidth {
    Fixed(f64),
    /// Scott's rule: sample standard deviation times `n^(-1/5)`.
    Scott,
}

impl Bandwidth {
    pub fn validate(&self) -> Result<(), DistributionError> {
        match *self {
            Bandwidth::Fixed(h) if !(h.is_finite() && h > 0.0) => Err(
                DistributionError::InvalidBandwidth(format!("must be positive, got {h}")),
            ),
            _ => Ok(()),
        }
    }

    fn resolve(&self, values: &[f64]) -> Result<f64, DistributionError> {
        match *self {
            Bandwidth::Fixed(h) => Ok(h),
            Bandwidth::Scott => {
                let sd = mean(values)
                    .and_then(|m| sample_stddev(values, m))
                    .filter(|sd| *sd > 0.0)
                    .ok_or_else(|| {
                        DistributionError::InvalidBandwidth(
                            "Scott's rule needs at least two distinct values".into(),
                        )
                    })?;
                Ok(sd * (values.len() as f64).powf(-0.2))
            }
        }
    }
}

/// Points at which a density is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridSpec {
    /// Observed range padded by three bandwidths on each side.
    Auto { points: usize },
    Range { start: f64, end: f64, points: usize },
}

impl GridSpec {
    pub fn validate(&self) -> Result<(), DistributionError> {
        let points = match *self {
            GridSpec::Auto { points } => points,
            GridSpec::Range { start, end, points } => {
                if !(start.is_finite() && end.is_finite() && start < end) {
                    return Err(DistributionError::InvalidGrid(format!(
                        "range [{start}, {end}] is empty"
                    )));
                }
                points
            }
        };
        if points < 2 {
            return Err(DistributionError::InvalidGrid(
                "at least two points are needed".into(),
            ));
        }
        Ok(())
    }
}

/// Which representation to build.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionSpec {
    Histogram { bins: BinSpec },
    Density { bandwidth: Bandwidth, grid: GridSpec },
}

impl Default for DistributionSpec {
    fn default() -> Self {
        DistributionSpec::Histogram { bins: BinSpec::Auto }
    }
}

impl DistributionSpec {
    pub fn validate(&self) -> Result<(), DistributionError> {
        match self {
            DistributionSpec::Histogram { bins } => bins.validate(),
            DistributionSpec::Density { bandwidth, grid } => {
                bandwidth.validate()?;
                grid.validate()
            }
        }
    }
}

/// Upper limit on the number of histogram bins.
pub const MAX_BINS: usize = 1_000_000;

/// Equal-width bins over `[lower, lower + bin_width * counts.len()]`.
///
/// Bin `i` holds values in `(edge_i, edge_{i+1}]`; the first bin also holds
/// the lower bound. A value on an interior edge therefore lands in the
/// lower-indexed bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub lower: f64,
    pub bin_width: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn build(values: &[f64], bins: BinSpec) -> Result<Self, DistributionError> {
        bins.validate()?;
        if values.is_empty() {
            return Err(DistributionError::EmptyGroup);
        }

        let lower = values.iter().copied().fold(f64::INFINITY, f64::min);
        let upper = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = upper - lower;

        let (count, bin_width) = match bins {
            BinSpec::BinWidth(w) => {
                let n = (range / w).ceil().max(1.0);
                if !(n <= MAX_BINS as f64) {
                    return Err(DistributionError::InvalidBinSpec(format!(
                        "bin width {w} yields more than {MAX_BINS} bins"
                    )));
                }
                (n as usize, w)
            }
            BinSpec::BinCount(n) => (n, if range > 0.0 { range / n as f64 } else { 1.0 }),
            BinSpec::Auto => {
                let n = (values.len() as f64).log2().ceil() as usize + 1;
                (n, if range > 0.0 { range / n as f64 } else { 1.0 })
            }
        };
        if count > MAX_BINS {
            return Err(DistributionError::InvalidBinSpec(format!(
                "{count} bins exceed the limit of {MAX_BINS}"
            )));
        }

        let mut histogram = Histogram {
            lower,
            bin_width,
            counts: vec![0; count],
        };
        for &v in values {
            let i = histogram.bin_index(v);
            histogram.counts[i] += 1;
        }
        Ok(histogram)
    }

    /// Bin holding `value`, clamped to the histogram's bins.
    ///
    /// The estimate from dividing by the width is corrected against
    /// [`Histogram::edge`], so a value equal to an interior edge always lands
    /// in the lower bin.
    pub fn bin_index(&self, value: f64) -> usize {
        let last = self.counts.len() - 1;
        let position = ((value - self.lower) / self.bin_width).ceil() as i64 - 1;
        let mut i = position.clamp(0, last as i64) as usize;
        while i > 0 && value <= self.edge(i) {
            i -= 1;
        }
        while i < last && value > self.edge(i + 1) {
            i += 1;
        }
        i
    }

    /// Lower edge of bin `i`; `edge(counts.len())` is the upper bound.
    pub fn edge(&self, i: usize) -> f64 {
        self.lower + i as f64 * self.bin_width
    }

    pub fn edges(&self) -> impl Iterator<Item = f64> + '_ {
        (0..=self.counts.len()).map(|i| self.edge(i))
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// `(bin center, count)` pairs.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.counts.iter().enumerate().map(|(i, &c)| {
            (self.lower + (i as f64 + 0.5) * self.bin_width, c as f64)
        })
    }
}

/// Gaussian kernel density estimate, renormalized so that its trapezoidal
/// integral over the evaluation grid is exactly one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityEstimate {
    #[serde(skip)]
    values: Vec<f64>,
    pub bandwidth: f64,
    pub start: f64,
    pub end: f64,
    pub points: usize,
    #[serde(skip)]
    normalizer: f64,
}

impl DensityEstimate {
    pub fn estimate(
        values: &[f64],
        bandwidth: Bandwidth,
        grid: GridSpec,
    ) -> Result<Self, DistributionError> {
        bandwidth.validate()?;
        grid.validate()?;
        if values.is_empty() {
            return Err(DistributionError::EmptyGroup);
        }

        let h = bandwidth.resolve(values)?;
        let (start, end, points) = match grid {
            GridSpec::Range { start, end, points } => (start, end, points),
            GridSpec::Auto { points } => {
                let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
                let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                (lo - 3.0 * h, hi + 3.0 * h, points)
            }
        };

        let mut estimate = DensityEstimate {
            values: values.to_vec(),
            bandwidth: h,
            start,
            end,
            points,
            normalizer: 1.0,
        };

        let mass = trapezoid(estimate.raw_points());
        if !(mass.is_finite() && mass > 0.0) {
            return Err(DistributionError::DegenerateGrid);
        }
        estimate.normalizer = mass;
        Ok(estimate)
    }

    fn grid(&self) -> impl Iterator<Item = f64> + '_ {
        let step = (self.end - self.start) / (self.points - 1) as f64;
        (0..self.points).map(move |i| self.start + i as f64 * step)
    }

    fn kernel_sum(&self, x: f64) -> f64 {
        let h = self.bandwidth;
        let scale = 1.0 / (self.values.len() as f64 * h * (2.0 * PI).sqrt());
        self.values
            .iter()
            .map(|v| (-0.5 * ((x - v) / h).powi(2)).exp())
            .sum::<f64>()
            * scale
    }

    fn raw_points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.grid().map(|x| (x, self.kernel_sum(x)))
    }

    /// `(grid point, density)` pairs.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.raw_points().map(|(x, d)| (x, d / self.normalizer))
    }

    /// Trapezoidal integral of the density over the grid.
    pub fn integral(&self) -> f64 {
        trapezoid(self.points())
    }
}

fn trapezoid(points: impl Iterator<Item = (f64, f64)>) -> f64 {
    let mut total = 0.0;
    let mut previous: Option<(f64, f64)> = None;
    for (x, y) in points {
        if let Some((px, py)) = previous {
            total += (x - px) * (y + py) / 2.0;
        }
        previous = Some((x, y));
    }
    total
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    Histogram(Histogram),
    Density(DensityEstimate),
}

impl Distribution {
    pub fn build(values: &[f64], spec: &DistributionSpec) -> Result<Self, DistributionError> {
        match *spec {
            DistributionSpec::Histogram { bins } => Histogram::build(values, bins).map(Self::Histogram),
            DistributionSpec::Density { bandwidth, grid } => {
                DensityEstimate::estimate(values, bandwidth, grid).map(Self::Density)
            }
        }
    }

    pub fn points(&self) -> Box<dyn Iterator<Item = (f64, f64)> + '_> {
        match self {
            Distribution::Histogram(h) => Box::new(h.points()),
            Distribution::Density(d) => Box::new(d.points()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_histogram_by_count_ties_go_to_lower_bin() {
        let values: Vec<f64> = (0..=10).map(f64::from).collect();
        let histogram = Histogram::build(&values, BinSpec::BinCount(5)).unwrap();

        assert_eq!(histogram.bin_width, 2.0);
        // [0,2] (2,4] (4,6] (6,8] (8,10]
        assert_eq!(histogram.counts, vec![3, 2, 2, 2, 2]);
        assert_eq!(histogram.bin_index(2.0), 0);
        assert_eq!(histogram.bin_index(2.5), 1);
        assert_eq!(histogram.total(), values.len());
    }

    #[test]
    fn test_histogram_ties_on_inexact_edges() {
        let histogram = Histogram::build(&[0.0, 17.0, 34.0], BinSpec::BinCount(14)).unwrap();

        assert_eq!(histogram.edges().nth(7), Some(17.0));
        assert_eq!(histogram.bin_index(17.0), 6);
        assert_eq!(histogram.bin_index(34.0), 13);
        assert_eq!(histogram.counts[6], 1);

        for bins in 2..=14 {
            for range in 1..80 {
                let upper = range as f64;
                let histogram = Histogram::build(&[0.0, upper], BinSpec::BinCount(bins)).unwrap();
                for (i, edge) in histogram.edges().enumerate().skip(1).take(bins - 1) {
                    assert_eq!(histogram.bin_index(edge), i - 1, "edge {edge} of {bins} bins over {upper}");
                }
            }
        }
    }

    #[test]
    fn test_histogram_rejects_too_many_bins() {
        assert!(matches!(
            Histogram::build(&[1.0, 20.0], BinSpec::BinWidth(1e-300)),
            Err(DistributionError::InvalidBinSpec(_))
        ));
        assert!(matches!(
            Histogram::build(&[1.0, 20.0], BinSpec::BinCount(MAX_BINS + 1)),
            Err(DistributionError::InvalidBinSpec(_))
        ));
        assert!(Histogram::build(&[1.0, 20.0], BinSpec::BinCount(MAX_BINS)).is_ok());
    }

    #[test]
    fn test_histogram_by_width() {
        let values = [-15.0, -5.0, 0.0, 3.0, 20.0];
        let histogram = Histogram::build(&values, BinSpec::BinWidth(10.0)).unwrap();

        assert_eq!(histogram.counts.len(), 4);
        let edges: Vec<f64> = histogram.edges().collect();
        assert_eq!(edges, vec![-15.0, -5.0, 5.0, 15.0, 25.0]);
        assert_eq!(histogram.counts, vec![2, 2, 0, 1]);
    }

    #[test]
    fn test_histogram_of_constant_values() {
        let histogram = Histogram::build(&[7.0, 7.0, 7.0], BinSpec::BinWidth(5.0)).unwrap();
        assert_eq!(histogram.counts, vec![3]);

        let histogram = Histogram::build(&[7.0, 7.0], BinSpec::BinCount(3)).unwrap();
        assert_eq!(histogram.counts, vec![2, 0, 0]);
    }

    #[test]
    fn test_histogram_auto_uses_sturges() {
        let values: Vec<f64> = (0..16).map(f64::from).collect();
        let histogram = Histogram::build(&values, BinSpec::Auto).unwrap();
        assert_eq!(histogram.counts.len(), 5);
        assert_eq!(histogram.total(), 16);
    }

    #[test]
    fn test_histogram_rejects_bad_input() {
        assert_eq!(Histogram::build(&[], BinSpec::Auto), Err(DistributionError::EmptyGroup));
        assert!(matches!(
            Histogram::build(&[1.0], BinSpec::BinCount(0)),
            Err(DistributionError::InvalidBinSpec(_))
        ));
        assert!(matches!(
            Histogram::build(&[1.0], BinSpec::BinWidth(-2.0)),
            Err(DistributionError::InvalidBinSpec(_))
        ));
    }

    #[test]
    fn test_histogram_points_are_bin_centers() {
        let histogram = Histogram::build(&[0.0, 4.0], BinSpec::BinCount(2)).unwrap();
        let points: Vec<(f64, f64)> = histogram.points().collect();
        assert_eq!(points, vec![(1.0, 1.0), (3.0, 1.0)]);
    }

    #[test]
    fn test_density_integrates_to_one() {
        let values = [20.0, -5.0, 3.0, 12.0, 45.0, -30.0, 8.0];
        let grids = [
            GridSpec::Auto { points: 200 },
            GridSpec::Range { start: -20.0, end: 30.0, points: 64 },
        ];

        for grid in grids {
            let density = DensityEstimate::estimate(&values, Bandwidth::Fixed(6.0), grid).unwrap();
            assert_relative_eq!(density.integral(), 1.0, max_relative = 1e-6);
            assert!(density.points().all(|(_, d)| d >= 0.0));
        }
    }

    #[test]
    fn test_density_scott_bandwidth() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let density = DensityEstimate::estimate(&values, Bandwidth::Scott, GridSpec::Auto { points: 50 }).unwrap();

        let sd = (2.5f64).sqrt();
        assert_relative_eq!(density.bandwidth, sd * 5f64.powf(-0.2), epsilon = 1e-12);
        assert_relative_eq!(density.integral(), 1.0, max_relative = 1e-6);
    }

    #[test]
    fn test_density_is_restartable() {
        let values = [4.0, 9.0, 9.0, 16.0];
        let density =
            DensityEstimate::estimate(&values, Bandwidth::Fixed(3.0), GridSpec::Auto { points: 32 }).unwrap();

        let first: Vec<_> = density.points().collect();
        let second: Vec<_> = density.points().collect();
        assert_eq!(first.len(), 32);
        assert_eq!(first, second);
    }

    #[test]
    fn test_density_errors() {
        assert_eq!(
            DensityEstimate::estimate(&[], Bandwidth::Fixed(1.0), GridSpec::Auto { points: 10 }),
            Err(DistributionError::EmptyGroup)
        );
        assert!(matches!(
            DensityEstimate::estimate(&[3.0, 3.0], Bandwidth::Scott, GridSpec::Auto { points: 10 }),
            Err(DistributionError::InvalidBandwidth(_))
        ));
        assert!(matches!(
            DensityEstimate::estimate(&[3.0], Bandwidth::Fixed(1.0), GridSpec::Auto { points: 1 }),
            Err(DistributionError::InvalidGrid(_))
        ));
        assert_eq!(
            DensityEstimate::estimate(
                &[0.0],
                Bandwidth::Fixed(1.0),
                GridSpec::Range { start: 1e6, end: 1e6 + 10.0, points: 10 }
            ),
            Err(DistributionError::DegenerateGrid)
        );
    }

    #[test]
    fn test_distribution_dispatch() {
        let spec = DistributionSpec::Histogram { bins: BinSpec::BinCount(2) };
        let distribution = Distribution::build(&[0.0, 4.0], &spec).unwrap();
        assert_eq!(distribution.points().count(), 2);
        assert_eq!(distribution.points().collect::<Vec<_>>(), distribution.points().collect::<Vec<_>>());
    }

    #[test]
    fn test_spec_deserializes() {
        let spec: DistributionSpec =
            serde_json::from_str(r#"{"density": {"bandwidth": {"fixed": 15.0}, "grid": {"auto": {"points": 128}}}}"#)
                .unwrap();
        assert_eq!(
            spec,
            DistributionSpec::Density {
                bandwidth: Bandwidth::Fixed(15.0),
                grid: GridSpec::Auto { points: 128 },
            }
        );

        let spec: DistributionSpec =
            serde_json::from_str(r#"{"histogram": {"bins": "auto"}}"#).unwrap();
        assert_eq!(spec, DistributionSpec::default());
    }
}
