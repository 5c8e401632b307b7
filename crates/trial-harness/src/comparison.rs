//! Comparison of several measurements on one X-axis
//!
//! A [`ComparisonHarness`] measures every configured series through the
//! [`Aggregator`], checks that all of them report the same X-axis, adds any
//! derived series (for example `user - kernel`) and returns the
//! [`SeriesBundle`] handed to a presenter.
//!
//! # Example
//!
//! ```no_run
//! use trial_harness::{Config, ComparisonHarness, ProcessTrialRunner};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::default();
//! let runner = ProcessTrialRunner::new(&config.harness.program_dir, &config.harness.output_path)
//!     .with_environment(config.environment.clone());
//!
//! let bundle = ComparisonHarness::new(runner, config).run(0).await?;
//! for series in &bundle.series {
//!     println!("{} mean = {:.0}", series.label, series.summary.mean);
//! }
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{info, instrument};

use crate::aggregator::Aggregator;
use crate::config::{Config, PlotConfig};
use crate::error::{AlignmentError, HarnessError, Result};
use crate::runner::TrialRunner;
use crate::stats::SeriesSummary;

/// Elementwise combination used for derived series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedOp {
    /// `lhs - rhs`
    Difference,
    /// `lhs + rhs`
    Sum,
    /// `lhs / rhs`; a bundle rejects the series if any divisor is zero
    Ratio,
}

impl DerivedOp {
    pub fn apply(&self, lhs: f64, rhs: f64) -> f64 {
        match self {
            DerivedOp::Difference => lhs - rhs,
            DerivedOp::Sum => lhs + rhs,
            DerivedOp::Ratio => lhs / rhs,
        }
    }
}

impl fmt::Display for DerivedOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DerivedOp::Difference => write!(f, "-"),
            DerivedOp::Sum => write!(f, "+"),
            DerivedOp::Ratio => write!(f, "/"),
        }
    }
}

/// One labelled curve of a bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedSeries {
    pub label: String,
    pub values: Vec<f64>,
    pub summary: SeriesSummary,
    /// `true` for series computed from other series rather than measured
    pub derived: bool,
}

/// X-aligned set of named series, ready for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesBundle {
    pub plot: PlotConfig,
    /// Mode passed to series with a zero offset
    pub base_mode: u32,
    /// Trials per measured series
    pub runs: usize,
    pub z_threshold: f64,
    /// RFC 3339 timestamp of the start of the comparison
    pub started_at: String,
    pub duration_ms: u64,
    pub x_axis: Vec<f64>,
    /// Series in insertion (legend) order
    pub series: Vec<NamedSeries>,
}

impl SeriesBundle {
    /// Empty bundle whose X-axis is set by the first added series.
    pub fn new(plot: PlotConfig) -> Self {
        Self {
            plot,
            base_mode: 0,
            runs: 0,
            z_threshold: 0.0,
            started_at: chrono::Utc::now().to_rfc3339(),
            duration_ms: 0,
            x_axis: Vec::new(),
            series: Vec::new(),
        }
    }

    pub fn get(&self, label: &str) -> Option<&NamedSeries> {
        self.series.iter().find(|s| s.label == label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|s| s.label.as_str())
    }

    /// Add a measured series reported against `x_axis`.
    ///
    /// The first series defines the bundle's X-axis; later series must match
    /// it point for point.
    ///
    /// # Examples
    ///
    /// ```
    /// use trial_harness::comparison::SeriesBundle;
    /// use trial_harness::config::PlotConfig;
    ///
    /// let mut bundle = SeriesBundle::new(PlotConfig::default());
    /// bundle.add_series("user", &[1.0, 2.0, 3.0], vec![5.0, 6.0, 7.0]).unwrap();
    ///
    /// let err = bundle.add_series("kernel", &[1.0, 2.0, 4.0], vec![1.0, 2.0, 3.0]);
    /// assert!(err.is_err());
    /// ```
    pub fn add_series(&mut self, label: &str, x_axis: &[f64], values: Vec<f64>) -> Result<()> {
        self.ensure_unique(label)?;

        if x_axis.len() != values.len() {
            return Err(AlignmentError::LengthMismatch {
                label: label.to_string(),
                expected: x_axis.len(),
                found: values.len(),
            }
            .into());
        }

        if self.series.is_empty() {
            self.x_axis = x_axis.to_vec();
        } else {
            check_alignment(label, &self.x_axis, x_axis)?;
        }

        self.push(label, values, false)
    }

    /// Add `label = lhs <op> rhs`, computed point by point.
    ///
    /// # Examples
    ///
    /// ```
    /// use trial_harness::comparison::{DerivedOp, SeriesBundle};
    /// use trial_harness::config::PlotConfig;
    ///
    /// let mut bundle = SeriesBundle::new(PlotConfig::default());
    /// bundle.add_series("user", &[1.0, 2.0], vec![300.0, 320.0]).unwrap();
    /// bundle.add_series("kernel", &[1.0, 2.0], vec![100.0, 110.0]).unwrap();
    /// bundle.derive("syscall", DerivedOp::Difference, "user", "kernel").unwrap();
    ///
    /// assert_eq!(bundle.get("syscall").unwrap().values, vec![200.0, 210.0]);
    /// ```
    pub fn derive(&mut self, label: &str, op: DerivedOp, lhs: &str, rhs: &str) -> Result<()> {
        self.ensure_unique(label)?;

        let left = self
            .get(lhs)
            .ok_or_else(|| HarnessError::UnknownSeries(lhs.to_string()))?;
        let right = self
            .get(rhs)
            .ok_or_else(|| HarnessError::UnknownSeries(rhs.to_string()))?;

        let values: Vec<f64> = left
            .values
            .iter()
            .zip(&right.values)
            .map(|(&a, &b)| op.apply(a, b))
            .collect();

        self.push(label, values, true)
    }

    fn ensure_unique(&self, label: &str) -> Result<()> {
        if self.get(label).is_some() {
            return Err(HarnessError::DuplicateSeries(label.to_string()));
        }
        Ok(())
    }

    fn push(&mut self, label: &str, values: Vec<f64>, derived: bool) -> Result<()> {
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(HarnessError::NonFiniteValue {
                label: label.to_string(),
                index,
            });
        }

        let summary = SeriesSummary::from_values(&values).ok_or_else(|| {
            HarnessError::Config(format!("series '{}' has no points", label))
        })?;

        self.series.push(NamedSeries {
            label: label.to_string(),
            values,
            summary,
            derived,
        });
        Ok(())
    }
}

/// `found` must equal `expected` in length and in every point.
pub fn check_alignment(
    label: &str,
    expected: &[f64],
    found: &[f64],
) -> std::result::Result<(), AlignmentError> {
    if expected.len() != found.len() {
        return Err(AlignmentError::LengthMismatch {
            label: label.to_string(),
            expected: expected.len(),
            found: found.len(),
        });
    }

    match expected
        .iter()
        .zip(found)
        .enumerate()
        .find(|(_, (a, b))| a != b)
    {
        Some((index, (&expected, &found))) => Err(AlignmentError::AxisMismatch {
            label: label.to_string(),
            index,
            expected,
            found,
        }),
        None => Ok(()),
    }
}

/// Measures every configured series and composes the bundle.
pub struct ComparisonHarness<R> {
    aggregator: Aggregator<R>,
    config: Config,
}

impl<R: TrialRunner> ComparisonHarness<R> {
    pub fn new(runner: R, config: Config) -> Self {
        let aggregator = Aggregator::new(runner, config.aggregator_settings());
        Self { aggregator, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the comparison with `base_mode` added to each series' mode offset.
    #[instrument(skip(self), fields(series = self.config.series.len()))]
    pub async fn run(&self, base_mode: u32) -> Result<SeriesBundle> {
        self.config.validate()?;
        let start_time = Instant::now();

        let mut bundle = SeriesBundle::new(self.config.plot.clone());
        bundle.base_mode = base_mode;
        bundle.runs = self.config.harness.runs;
        bundle.z_threshold = self.config.harness.z_threshold;

        for series in &self.config.series {
            let mode = base_mode.checked_add(series.mode_offset).ok_or_else(|| {
                HarnessError::Config(format!(
                    "mode {} + offset {} overflows for series '{}'",
                    base_mode, series.mode_offset, series.label
                ))
            })?;

            info!("Measuring series '{}'", series.label);
            let measurement = self.aggregator.measure(&series.program, mode).await?;
            bundle.add_series(&series.label, &measurement.x_axis, measurement.values)?;
        }

        for derived in &self.config.derived {
            bundle.derive(&derived.label, derived.op, &derived.lhs, &derived.rhs)?;
        }

        bundle.duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Comparison finished in {}ms with {} series",
            bundle.duration_ms,
            bundle.series.len()
        );
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DerivedSpec, SeriesSpec};
    use crate::error::ExecutionError;
    use crate::table::SampleTable;
    use async_trait::async_trait;

    /// Answers every trial with a table chosen by (program, mode).
    struct FixedRunner;

    #[async_trait]
    impl TrialRunner for FixedRunner {
        async fn run(
            &self,
            program: &str,
            mode: u32,
        ) -> std::result::Result<SampleTable, ExecutionError> {
            let x = vec![1.0, 2.0, 3.0];
            let level = match program {
                "utime" => 300.0,
                "ktime" => 100.0 + mode as f64,
                "shifted" => {
                    return SampleTable::new(vec![1.0, 2.0, 4.0], vec![vec![1.0, 1.0, 1.0]])
                }
                "short" => return SampleTable::new(vec![1.0, 2.0], vec![vec![1.0, 1.0]]),
                _ => {
                    return Err(ExecutionError::Parse {
                        line: 0,
                        message: format!("unknown program {}", program),
                    })
                }
            };
            SampleTable::new(x, vec![vec![level; 3], vec![0.0; 3]])
        }
    }

    fn config(series: Vec<SeriesSpec>, derived: Vec<DerivedSpec>) -> Config {
        let mut config = Config::default();
        config.harness.runs = 3;
        config.series = series;
        config.derived = derived;
        config
    }

    #[tokio::test]
    async fn test_syscall_comparison() {
        let config = config(
            vec![
                SeriesSpec::new("user", "utime", 0),
                SeriesSpec::new("kernel", "ktime", 0),
            ],
            vec![DerivedSpec {
                label: "syscall".to_string(),
                op: DerivedOp::Difference,
                lhs: "user".to_string(),
                rhs: "kernel".to_string(),
            }],
        );

        let bundle = ComparisonHarness::new(FixedRunner, config).run(0).await.unwrap();

        assert_eq!(bundle.x_axis, vec![1.0, 2.0, 3.0]);
        assert_eq!(bundle.labels().collect::<Vec<_>>(), vec!["user", "kernel", "syscall"]);
        assert_eq!(bundle.get("syscall").unwrap().values, vec![200.0; 3]);
        assert!(bundle.get("syscall").unwrap().derived);
        assert!(!bundle.get("user").unwrap().derived);
        assert_eq!(bundle.get("user").unwrap().summary.mean, 300.0);
        assert_eq!(bundle.runs, 3);
    }

    #[tokio::test]
    async fn test_mode_offsets_select_variants() {
        let config = config(
            vec![
                SeriesSpec::new("a", "ktime", 0),
                SeriesSpec::new("b", "ktime", 1),
                SeriesSpec::new("c", "ktime", 2),
            ],
            Vec::new(),
        );

        let bundle = ComparisonHarness::new(FixedRunner, config).run(4).await.unwrap();

        assert_eq!(bundle.base_mode, 4);
        assert_eq!(bundle.get("a").unwrap().summary.mean, 104.0);
        assert_eq!(bundle.get("b").unwrap().summary.mean, 105.0);
        assert_eq!(bundle.get("c").unwrap().summary.mean, 106.0);
    }

    #[tokio::test]
    async fn test_misaligned_series_fail() {
        let config = config(
            vec![
                SeriesSpec::new("kernel", "ktime", 0),
                SeriesSpec::new("other", "shifted", 0),
            ],
            Vec::new(),
        );

        let err = ComparisonHarness::new(FixedRunner, config).run(0).await.unwrap_err();
        assert!(matches!(
            err,
            HarnessError::Alignment(AlignmentError::AxisMismatch { index: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_length_mismatch_fails() {
        let config = config(
            vec![
                SeriesSpec::new("kernel", "ktime", 0),
                SeriesSpec::new("other", "short", 0),
            ],
            Vec::new(),
        );

        let err = ComparisonHarness::new(FixedRunner, config).run(0).await.unwrap_err();
        assert!(matches!(
            err,
            HarnessError::Alignment(AlignmentError::LengthMismatch {
                expected: 3,
                found: 2,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_execution_error_propagates() {
        let config = config(vec![SeriesSpec::new("broken", "missing", 0)], Vec::new());

        let err = ComparisonHarness::new(FixedRunner, config).run(0).await.unwrap_err();
        assert!(matches!(err, HarnessError::Execution(_)));
    }

    #[tokio::test]
    async fn test_mode_overflow_is_rejected() {
        let config = config(vec![SeriesSpec::new("kernel", "ktime", 1)], Vec::new());

        let err = ComparisonHarness::new(FixedRunner, config)
            .run(u32::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
    }

    #[test]
    fn test_alignment_check() {
        assert!(check_alignment("s", &[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).is_ok());
        assert_eq!(
            check_alignment("s", &[1.0, 2.0, 3.0], &[1.0, 2.0, 4.0]),
            Err(AlignmentError::AxisMismatch {
                label: "s".to_string(),
                index: 2,
                expected: 3.0,
                found: 4.0,
            })
        );
        assert!(check_alignment("s", &[1.0, 2.0, 3.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_bundle_rejects_duplicate_and_unknown_labels() {
        let mut bundle = SeriesBundle::new(PlotConfig::default());
        bundle.add_series("user", &[1.0], vec![2.0]).unwrap();

        assert!(matches!(
            bundle.add_series("user", &[1.0], vec![3.0]),
            Err(HarnessError::DuplicateSeries(_))
        ));
        assert!(matches!(
            bundle.derive("x", DerivedOp::Sum, "user", "kernel"),
            Err(HarnessError::UnknownSeries(label)) if label == "kernel"
        ));
    }

    #[test]
    fn test_bundle_rejects_values_not_matching_axis() {
        let mut bundle = SeriesBundle::new(PlotConfig::default());
        assert!(matches!(
            bundle.add_series("user", &[1.0, 2.0], vec![2.0]),
            Err(HarnessError::Alignment(AlignmentError::LengthMismatch { .. }))
        ));
    }

    #[test]
    fn test_derived_ops() {
        assert_eq!(DerivedOp::Difference.apply(5.0, 3.0), 2.0);
        assert_eq!(DerivedOp::Sum.apply(5.0, 3.0), 8.0);
        assert_eq!(DerivedOp::Ratio.apply(6.0, 3.0), 2.0);
        assert!(DerivedOp::Ratio.apply(1.0, 0.0).is_infinite());
    }

    #[test]
    fn test_zero_divisor_ratio_is_rejected() {
        let mut bundle = SeriesBundle::new(PlotConfig::default());
        bundle.add_series("a", &[1.0, 2.0], vec![0.0, 1.0]).unwrap();
        bundle.add_series("b", &[1.0, 2.0], vec![0.0, 1.0]).unwrap();

        let err = bundle.derive("r", DerivedOp::Ratio, "a", "b").unwrap_err();
        assert!(matches!(
            err,
            HarnessError::NonFiniteValue { ref label, index: 0 } if label == "r"
        ));
        assert!(bundle.get("r").is_none());

        bundle.derive("r", DerivedOp::Ratio, "b", "b").unwrap_err();
        bundle.add_series("c", &[1.0, 2.0], vec![2.0, 4.0]).unwrap();
        bundle.derive("r", DerivedOp::Ratio, "c", "c").unwrap();
        assert_eq!(bundle.get("r").unwrap().values, vec![1.0, 1.0]);
    }

    #[test]
    fn test_measured_series_must_be_finite() {
        let mut bundle = SeriesBundle::new(PlotConfig::default());
        let err = bundle
            .add_series("a", &[1.0, 2.0], vec![1.0, f64::NAN])
            .unwrap_err();
        assert!(matches!(err, HarnessError::NonFiniteValue { index: 1, .. }));
        assert!(bundle.series.is_empty());
    }
}
