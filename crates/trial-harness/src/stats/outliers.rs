//! Outlier detection for repeated trial observations.
//!
//! This module filters a cell observation vector using the z-score of every
//! value against the population mean and standard deviation of the whole
//! vector. Filtering is a single pass: the mean and deviation are never
//! recomputed after removal.

/// Default z-score cut-off. Values at or beyond it are outliers.
pub const DEFAULT_Z_THRESHOLD: f64 = 2.0;

/// Outlier detection using the z-score method.
///
/// A value `x` is kept when `|x - mean| / std_dev < threshold`. When the
/// standard deviation is zero every z-score is zero, so nothing is removed.
#[derive(Debug, Clone)]
pub struct OutlierResult {
    /// Indices of detected outliers in the original sample array
    pub outlier_indices: Vec<usize>,
    /// Population mean of the original samples
    pub mean: f64,
    /// Population standard deviation of the original samples
    pub std_dev: f64,
    /// Threshold the z-scores were compared against
    pub threshold: f64,
}

impl OutlierResult {
    /// Detect outliers in samples using the z-score method.
    ///
    /// # Arguments
    ///
    /// * `samples` - Slice of samples to analyze
    /// * `threshold` - z-score at or above which a sample is an outlier
    ///
    /// # Returns
    ///
    /// * `Some(result)` - Outlier detection results
    /// * `None` - If samples is empty
    ///
    /// # Examples
    ///
    /// ```
    /// use trial_harness::stats::outliers::OutlierResult;
    ///
    /// let data = vec![10.0, 10.0, 10.0, 10.0, 1000.0];
    /// let result = OutlierResult::detect(&data, 2.0).unwrap();
    /// assert!(result.has_outliers());
    /// assert_eq!(result.outlier_indices, vec![4]);
    /// ```
    pub fn detect(samples: &[f64], threshold: f64) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        // Identical values are zero-variance by definition; summing them can
        // still leave rounding residue in the mean.
        let (mean, std_dev) = if samples.iter().all(|&x| x == samples[0]) {
            (samples[0], 0.0)
        } else {
            let count = samples.len() as f64;
            let mean = samples.iter().sum::<f64>() / count;
            let variance = samples.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / count;
            (mean, variance.sqrt())
        };

        let outlier_indices: Vec<usize> = samples
            .iter()
            .enumerate()
            .filter_map(|(i, &value)| {
                if z_score(value, mean, std_dev) < threshold {
                    None
                } else {
                    Some(i)
                }
            })
            .collect();

        Some(OutlierResult {
            outlier_indices,
            mean,
            std_dev,
            threshold,
        })
    }

    /// Get the clean samples (outliers removed), in their original order.
    ///
    /// # Examples
    ///
    /// ```
    /// use trial_harness::stats::outliers::OutlierResult;
    ///
    /// let data = vec![10.0, 10.0, 1000.0, 10.0, 10.0];
    /// let result = OutlierResult::detect(&data, 2.0).unwrap();
    /// assert_eq!(result.clean_samples(&data), vec![10.0; 4]);
    /// ```
    pub fn clean_samples(&self, samples: &[f64]) -> Vec<f64> {
        let mut outliers = self.outlier_indices.iter().peekable();
        samples
            .iter()
            .enumerate()
            .filter_map(|(i, &value)| {
                if outliers.peek() == Some(&&i) {
                    outliers.next();
                    None
                } else {
                    Some(value)
                }
            })
            .collect()
    }

    /// Check if any outliers were detected.
    pub fn has_outliers(&self) -> bool {
        !self.outlier_indices.is_empty()
    }
}

/// Remove outliers from a cell observation vector.
///
/// Pure and deterministic: the result depends only on `observations` and
/// `threshold`. An empty input yields an empty output.
///
/// # Examples
///
/// ```
/// use trial_harness::stats::filter;
///
/// assert_eq!(filter(&[5.0, 5.0, 5.0, 5.0], 2.0), vec![5.0; 4]);
/// assert_eq!(filter(&[10.0, 10.0, 10.0, 10.0, 1000.0], 2.0), vec![10.0; 4]);
/// ```
pub fn filter(observations: &[f64], threshold: f64) -> Vec<f64> {
    match OutlierResult::detect(observations, threshold) {
        Some(result) => result.clean_samples(observations),
        None => Vec::new(),
    }
}

/// `|x - mean| / std_dev`, with a zero deviation mapping to a zero score.
fn z_score(value: f64, mean: f64, std_dev: f64) -> f64 {
    if std_dev == 0.0 {
        0.0
    } else {
        (value - mean).abs() / std_dev
    }
}
