//! Statistical cleaning and summaries for trial data
//!
//! # Examples
//!
//! ```
//! use trial_harness::stats::{filter, mean, SeriesSummary};
//!
//! // One cell observed across six trials, the last one disturbed
//! let observations = vec![61.0, 60.0, 62.0, 61.0, 61.0, 240.0];
//!
//! let cleaned = filter(&observations, 2.0);
//! assert_eq!(cleaned.len(), 5);
//! assert_eq!(mean(&cleaned), Some(61.0));
//!
//! let summary = SeriesSummary::from_values(&cleaned).unwrap();
//! println!("median: {}, max: {}", summary.median, summary.max);
//! ```

pub mod outliers;
pub mod summary;

pub use outliers::{filter, OutlierResult, DEFAULT_Z_THRESHOLD};
pub use summary::{mean, percentile, SeriesSummary};
