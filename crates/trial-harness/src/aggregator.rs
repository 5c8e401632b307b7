//! Trial aggregation
//!
//! The aggregator runs a program a fixed number of times, checks that every
//! trial reports the same shape and X-axis as the first, and reduces each
//! (category, sample) cell to the mean of its outlier-filtered observations.
//!
//! ```text
//!   trial 0 ─┐
//!   trial 1 ─┤   cell (c, s): [v0, v1, ..., vN-1] ──filter──► mean ──► cleaned[c][s]
//!   ...      ├─►
//!   trial N ─┘
//! ```
//!
//! Trials run strictly one after another; the first failing trial aborts the
//! whole measurement.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{ExecutionError, HarnessError, Result};
use crate::runner::TrialRunner;
use crate::stats::{mean, OutlierResult, DEFAULT_Z_THRESHOLD};
use crate::table::SampleTable;

/// Behaviour when the outlier filter removes every observation of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyCellPolicy {
    /// Abort with [`HarnessError::AllObservationsFiltered`]
    #[default]
    Fail,
    /// Use the mean of the unfiltered observations
    UnfilteredMean,
}

/// Settings for one aggregation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregatorSettings {
    /// Number of trials per measurement
    pub runs: usize,
    /// z-score cut-off passed to the outlier filter
    pub z_threshold: f64,
    pub empty_cell_policy: EmptyCellPolicy,
}

impl AggregatorSettings {
    pub fn new(runs: usize) -> Self {
        Self {
            runs,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.runs == 0 {
            return Err(HarnessError::Config("runs must be at least 1".to_string()));
        }
        if !self.z_threshold.is_finite() || self.z_threshold <= 0.0 {
            return Err(HarnessError::Config(format!(
                "z_threshold must be a positive number (got {})",
                self.z_threshold
            )));
        }
        Ok(())
    }
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            runs: 50,
            z_threshold: DEFAULT_Z_THRESHOLD,
            empty_cell_policy: EmptyCellPolicy::Fail,
        }
    }
}

/// Per-cell cleaned means over a full trial set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedTable {
    /// X-axis shared by every trial
    pub x_axis: Vec<f64>,
    /// `categories[c][s]` is the cleaned mean of cell (c, s)
    pub categories: Vec<Vec<f64>>,
    /// Number of trials aggregated
    pub trials: usize,
    /// Observations dropped by the outlier filter, summed over all cells
    pub outliers_removed: usize,
}

impl CleanedTable {
    pub fn category(&self, index: usize) -> Option<&[f64]> {
        self.categories.get(index).map(Vec::as_slice)
    }

    /// `(categories, samples)`
    pub fn shape(&self) -> (usize, usize) {
        (self.categories.len(), self.x_axis.len())
    }
}

/// The primary series of a measurement: X-axis plus category 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub x_axis: Vec<f64>,
    pub values: Vec<f64>,
}

/// Runs trials and reduces them to a [`CleanedTable`].
pub struct Aggregator<R> {
    runner: R,
    settings: AggregatorSettings,
}

impl<R: TrialRunner> Aggregator<R> {
    pub fn new(runner: R, settings: AggregatorSettings) -> Self {
        Self { runner, settings }
    }

    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    /// Measure `program` in `mode` and return the X-axis with the cleaned
    /// category-0 row.
    pub async fn measure(&self, program: &str, mode: u32) -> Result<Measurement> {
        let mut table = self.measure_table(program, mode).await?;
        // Tables always have at least one category
        let values = table.categories.swap_remove(0);
        Ok(Measurement {
            x_axis: table.x_axis,
            values,
        })
    }

    /// Measure `program` in `mode` and return every cleaned category.
    #[instrument(skip(self), fields(runs = self.settings.runs))]
    pub async fn measure_table(&self, program: &str, mode: u32) -> Result<CleanedTable> {
        self.settings.validate()?;

        info!(
            "Measuring '{}' (mode {}) over {} trials",
            program, mode, self.settings.runs
        );

        let trials = self.collect_trials(program, mode).await?;
        let table = self.reduce(&trials)?;

        info!(
            "Finished '{}' (mode {}): {} categories x {} samples, {} outliers removed",
            program,
            mode,
            table.shape().0,
            table.shape().1,
            table.outliers_removed
        );
        Ok(table)
    }

    async fn collect_trials(&self, program: &str, mode: u32) -> Result<Vec<SampleTable>> {
        let mut trials: Vec<SampleTable> = Vec::with_capacity(self.settings.runs);

        for trial in 0..self.settings.runs {
            let table = self.runner.run(program, mode).await?;
            if let Some(first) = trials.first() {
                check_consistent(first, &table, trial)?;
            }
            debug!("Trial {}/{} complete", trial + 1, self.settings.runs);
            trials.push(table);
        }

        Ok(trials)
    }

    fn reduce(&self, trials: &[SampleTable]) -> Result<CleanedTable> {
        let first = trials
            .first()
            .ok_or_else(|| HarnessError::Config("runs must be at least 1".to_string()))?;
        let (category_count, sample_count) = first.shape();

        let mut categories = Vec::with_capacity(category_count);
        let mut outliers_removed = 0;
        let mut observations = Vec::with_capacity(trials.len());

        for category in 0..category_count {
            let mut row = Vec::with_capacity(sample_count);
            for sample in 0..sample_count {
                observations.clear();
                observations.extend(trials.iter().map(|t| t.categories()[category][sample]));

                let (value, removed) = self.clean_cell(&observations, category, sample)?;
                outliers_removed += removed;
                row.push(value);
            }
            categories.push(row);
        }

        Ok(CleanedTable {
            x_axis: first.x_axis().to_vec(),
            categories,
            trials: trials.len(),
            outliers_removed,
        })
    }

    /// Mean of the filtered observations and the number of values removed.
    fn clean_cell(
        &self,
        observations: &[f64],
        category: usize,
        sample: usize,
    ) -> Result<(f64, usize)> {
        let Some(outliers) = OutlierResult::detect(observations, self.settings.z_threshold) else {
            return Err(HarnessError::AllObservationsFiltered { category, sample });
        };

        let cleaned = outliers.clean_samples(observations);
        let removed = outliers.outlier_indices.len();

        match mean(&cleaned) {
            Some(value) => Ok((value, removed)),
            None => match self.settings.empty_cell_policy {
                EmptyCellPolicy::Fail => {
                    Err(HarnessError::AllObservationsFiltered { category, sample })
                }
                EmptyCellPolicy::UnfilteredMean => {
                    warn!(
                        "All {} observations filtered for category {}, sample {}; using unfiltered mean",
                        observations.len(),
                        category,
                        sample
                    );
                    Ok((outliers.mean, 0))
                }
            },
        }
    }
}

/// A trial must match the first trial's shape and X-axis exactly.
fn check_consistent(
    first: &SampleTable,
    table: &SampleTable,
    trial: usize,
) -> std::result::Result<(), ExecutionError> {
    if table.shape() != first.shape() {
        return Err(ExecutionError::ShapeMismatch {
            trial,
            expected: first.shape(),
            found: table.shape(),
        });
    }

    if let Some((sample, (&expected, &found))) = first
        .x_axis()
        .iter()
        .zip(table.x_axis())
        .enumerate()
        .find(|(_, (a, b))| a != b)
    {
        return Err(ExecutionError::AxisMismatch {
            trial,
            sample,
            expected,
            found,
        });
    }

    Ok(())
}
