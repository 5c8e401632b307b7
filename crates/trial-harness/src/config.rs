//! Configuration for measurement runs
//!
//! A configuration names the benchmark programs to measure, how many trials
//! each measurement takes, how cells are cleaned, the execution environment
//! the programs need, and how the resulting series are labelled. Everything
//! that used to be a module-level constant lives here and is passed into the
//! pipeline explicitly.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::aggregator::{AggregatorSettings, EmptyCellPolicy};
use crate::comparison::DerivedOp;
use crate::error::HarnessError;
use crate::runner::ExecutionEnvironment;
use crate::stats::DEFAULT_Z_THRESHOLD;

/// Main configuration structure loaded from TOML files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Trial count, cleaning and output capture settings
    #[serde(default)]
    pub harness: HarnessConfig,
    /// Privilege elevation and CPU pinning for the benchmark programs
    #[serde(default = "default_environment")]
    pub environment: ExecutionEnvironment,
    /// Labels handed to the presenter
    #[serde(default)]
    pub plot: PlotConfig,
    /// Measured series, in legend order
    pub series: Vec<SeriesSpec>,
    /// Series computed from two measured (or earlier derived) series
    #[serde(default)]
    pub derived: Vec<DerivedSpec>,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML is malformed
    /// - The configuration fails [`Config::validate`]
    ///
    /// # Example
    ///
    /// ```no_run
    /// use trial_harness::config::Config;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = Config::from_file("fib.toml")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    ///
    /// # Example
    ///
    /// ```
    /// use trial_harness::config::Config;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let toml = r#"
    ///     [harness]
    ///     runs = 10
    ///
    ///     [[series]]
    ///     label = "kernel"
    ///     program = "ktime"
    /// "#;
    /// let config = Config::from_str(toml)?;
    /// assert_eq!(config.harness.runs, 10);
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(s).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Built-in configuration reproducing one of the stock comparisons.
    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Syscall => Self {
                harness: HarnessConfig::default(),
                environment: default_environment(),
                plot: PlotConfig::default(),
                series: vec![
                    SeriesSpec::new("user", "utime", 0),
                    SeriesSpec::new("kernel", "ktime", 0),
                ],
                derived: vec![DerivedSpec {
                    label: "syscall".to_string(),
                    op: DerivedOp::Difference,
                    lhs: "user".to_string(),
                    rhs: "kernel".to_string(),
                }],
            },
            Preset::Variants => Self {
                harness: HarnessConfig {
                    runs: 100,
                    ..HarnessConfig::default()
                },
                environment: default_environment(),
                plot: PlotConfig {
                    y_min: Some(50.0),
                    y_max: Some(90.0),
                    ..PlotConfig::default()
                },
                series: vec![
                    SeriesSpec::new("fast doubling", "ktime", 0),
                    SeriesSpec::new("fast doubling with fls", "ktime", 1),
                    SeriesSpec::new("fast doubling with clz", "ktime", 2),
                ],
                derived: Vec::new(),
            },
        }
    }

    /// Check the invariants the pipeline relies on.
    pub fn validate(&self) -> Result<(), HarnessError> {
        self.aggregator_settings().validate()?;

        if self.series.is_empty() {
            return Err(HarnessError::Config(
                "at least one [[series]] entry is required".to_string(),
            ));
        }

        let mut labels: Vec<&str> = Vec::new();
        for series in &self.series {
            if series.program.trim().is_empty() {
                return Err(HarnessError::Config(format!(
                    "series '{}' has an empty program",
                    series.label
                )));
            }
            if labels.contains(&series.label.as_str()) {
                return Err(HarnessError::DuplicateSeries(series.label.clone()));
            }
            labels.push(&series.label);
        }

        for derived in &self.derived {
            for operand in [&derived.lhs, &derived.rhs] {
                if !labels.contains(&operand.as_str()) {
                    return Err(HarnessError::UnknownSeries(operand.clone()));
                }
            }
            if labels.contains(&derived.label.as_str()) {
                return Err(HarnessError::DuplicateSeries(derived.label.clone()));
            }
            labels.push(&derived.label);
        }

        Ok(())
    }

    pub fn aggregator_settings(&self) -> AggregatorSettings {
        AggregatorSettings {
            runs: self.harness.runs,
            z_threshold: self.harness.z_threshold,
            empty_cell_policy: self.harness.empty_cell_policy,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::preset(Preset::Syscall)
    }
}

/// Stock comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    /// User-space time, kernel time and their difference
    #[default]
    Syscall,
    /// Three kernel-side algorithm variants selected by consecutive modes
    Variants,
}

impl FromStr for Preset {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "syscall" => Ok(Preset::Syscall),
            "variants" => Ok(Preset::Variants),
            other => Err(HarnessError::Config(format!(
                "unknown preset '{}' (expected 'syscall' or 'variants')",
                other
            ))),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preset::Syscall => write!(f, "syscall"),
            Preset::Variants => write!(f, "variants"),
        }
    }
}

/// Trial count, cleaning and output capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Trials per measurement (default: 50)
    #[serde(default = "default_runs")]
    pub runs: usize,
    /// z-score cut-off for the outlier filter (default: 2.0)
    #[serde(default = "default_z_threshold")]
    pub z_threshold: f64,
    /// What to do when a cell loses every observation to the filter
    #[serde(default)]
    pub empty_cell_policy: EmptyCellPolicy,
    /// Transient file receiving one trial's output, overwritten per trial
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    /// Directory the benchmark programs are resolved against
    #[serde(default = "default_program_dir")]
    pub program_dir: PathBuf,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            runs: default_runs(),
            z_threshold: default_z_threshold(),
            empty_cell_policy: EmptyCellPolicy::default(),
            output_path: default_output_path(),
            program_dir: default_program_dir(),
        }
    }
}

fn default_runs() -> usize {
    50
}

fn default_z_threshold() -> f64 {
    DEFAULT_Z_THRESHOLD
}

fn default_output_path() -> PathBuf {
    PathBuf::from("scripts/tmp.txt")
}

fn default_program_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_environment() -> ExecutionEnvironment {
    ExecutionEnvironment {
        elevate: true,
        cpu: Some(7),
    }
}

/// Presentation labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_x_label")]
    pub x_label: String,
    #[serde(default = "default_y_label")]
    pub y_label: String,
    /// Lower bound of the value axis
    #[serde(default)]
    pub y_min: Option<f64>,
    /// Upper bound of the value axis
    #[serde(default)]
    pub y_max: Option<f64>,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            x_label: default_x_label(),
            y_label: default_y_label(),
            y_min: None,
            y_max: None,
        }
    }
}

fn default_title() -> String {
    "fibonacci performance".to_string()
}

fn default_x_label() -> String {
    "n-th fibonacci".to_string()
}

fn default_y_label() -> String {
    "time (ns)".to_string()
}

/// One measured series: `program` runs with `base_mode + mode_offset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSpec {
    pub label: String,
    pub program: String,
    #[serde(default)]
    pub mode_offset: u32,
}

impl SeriesSpec {
    pub fn new(label: &str, program: &str, mode_offset: u32) -> Self {
        Self {
            label: label.to_string(),
            program: program.to_string(),
            mode_offset,
        }
    }
}

/// A series computed elementwise as `lhs <op> rhs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedSpec {
    pub label: String,
    pub op: DerivedOp,
    pub lhs: String,
    pub rhs: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
            [[series]]
            label = "kernel"
            program = "ktime"
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.harness.runs, 50);
        assert_eq!(config.harness.z_threshold, 2.0);
        assert_eq!(config.harness.empty_cell_policy, EmptyCellPolicy::Fail);
        assert_eq!(config.harness.output_path, PathBuf::from("scripts/tmp.txt"));
        assert!(config.environment.elevate);
        assert_eq!(config.environment.cpu, Some(7));
        assert_eq!(config.plot.title, "fibonacci performance");
        assert_eq!(config.series, vec![SeriesSpec::new("kernel", "ktime", 0)]);
        assert!(config.derived.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [harness]
            runs = 20
            z_threshold = 3.0
            empty_cell_policy = "unfiltered_mean"
            output_path = "/tmp/trial.txt"
            program_dir = "build"

            [environment]
            elevate = false
            cpu = 2

            [plot]
            title = "variants"
            x_label = "n"
            y_label = "ns"
            y_min = 10.0
            y_max = 20.0

            [[series]]
            label = "user"
            program = "utime"

            [[series]]
            label = "kernel"
            program = "ktime"
            mode_offset = 1

            [[derived]]
            label = "syscall"
            op = "difference"
            lhs = "user"
            rhs = "kernel"
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.harness.runs, 20);
        assert_eq!(config.harness.z_threshold, 3.0);
        assert_eq!(
            config.harness.empty_cell_policy,
            EmptyCellPolicy::UnfilteredMean
        );
        assert_eq!(config.harness.program_dir, PathBuf::from("build"));
        assert!(!config.environment.elevate);
        assert_eq!(config.environment.cpu, Some(2));
        assert_eq!(config.plot.y_min, Some(10.0));
        assert_eq!(config.series[1].mode_offset, 1);
        assert_eq!(config.derived[0].op, DerivedOp::Difference);
    }

    #[test]
    fn test_environment_without_cpu() {
        let toml = r#"
            [environment]
            elevate = false

            [[series]]
            label = "kernel"
            program = "ktime"
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.environment.cpu, None);
    }

    #[test]
    fn test_rejects_zero_runs() {
        let toml = r#"
            [harness]
            runs = 0

            [[series]]
            label = "kernel"
            program = "ktime"
        "#;

        assert!(Config::from_str(toml).is_err());
    }

    #[test]
    fn test_rejects_missing_series() {
        assert!(Config::from_str("series = []").is_err());
        assert!(Config::from_str("[harness]\nruns = 3").is_err());
    }

    #[test]
    fn test_rejects_duplicate_labels() {
        let mut config = Config::default();
        config.series.push(SeriesSpec::new("user", "utime", 1));
        assert!(matches!(
            config.validate(),
            Err(HarnessError::DuplicateSeries(label)) if label == "user"
        ));
    }

    #[test]
    fn test_rejects_unknown_derived_operand() {
        let mut config = Config::default();
        config.derived[0].rhs = "system".to_string();
        assert!(matches!(
            config.validate(),
            Err(HarnessError::UnknownSeries(label)) if label == "system"
        ));
    }

    #[test]
    fn test_presets_are_valid() {
        let syscall = Config::preset(Preset::Syscall);
        assert!(syscall.validate().is_ok());
        assert_eq!(syscall.harness.runs, 50);
        assert_eq!(syscall.series.len(), 2);
        assert_eq!(syscall.derived[0].label, "syscall");

        let variants = Config::preset(Preset::Variants);
        assert!(variants.validate().is_ok());
        assert_eq!(variants.harness.runs, 100);
        let offsets: Vec<u32> = variants.series.iter().map(|s| s.mode_offset).collect();
        assert_eq!(offsets, vec![0, 1, 2]);
        assert_eq!(variants.plot.y_max, Some(90.0));
    }

    #[test]
    fn test_preset_from_str() {
        assert_eq!("syscall".parse::<Preset>().unwrap(), Preset::Syscall);
        assert_eq!("variants".parse::<Preset>().unwrap(), Preset::Variants);
        assert!("other".parse::<Preset>().is_err());
        assert_eq!(Preset::Variants.to_string(), "variants");
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let config = Config::preset(Preset::Variants);
        let text = toml::to_string(&config).unwrap();
        assert_eq!(Config::from_str(&text).unwrap(), config);
    }
}
