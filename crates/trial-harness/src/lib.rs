//! Repeated-trial measurement harness for external benchmark programs
//!
//! This crate runs a benchmark executable many times, parses the numeric table
//! it prints on every run, removes statistical outliers cell by cell and
//! averages what remains into a stable per-input performance curve. Several
//! curves can then be compared on a shared X-axis.
//!
//! # Features
//!
//! - **Trial execution**: Child processes with optional `sudo` and CPU pinning
//! - **Shape checking**: Every trial must report the same table layout and X-axis
//! - **Outlier filtering**: Single-pass z-score filter per (category, sample) cell
//! - **Comparisons**: Several measurements on one X-axis, plus derived series
//! - **Multiple Output Formats**: JSON, Console, and Markdown reports
//!
//! # Example
//!
//! ```no_run
//! use trial_harness::{ComparisonHarness, Config, ProcessTrialRunner, Reporter, OutputFormat};
//!
//! # async fn example() -> anyhow::Result<()> {
//! // Load configuration
//! let config = Config::from_file("fib.toml")?;
//!
//! // Measure every configured series
//! let runner = ProcessTrialRunner::new(&config.harness.program_dir, &config.harness.output_path)
//!     .with_environment(config.environment.clone());
//! let bundle = ComparisonHarness::new(runner, config).run(0).await?;
//!
//! // Report results
//! Reporter::new(OutputFormat::Console).report(&bundle)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! Comparisons are configured using TOML files:
//!
//! ```toml
//! [harness]
//! runs = 50
//! z_threshold = 2.0
//! output_path = "scripts/tmp.txt"
//!
//! [environment]
//! elevate = true
//! cpu = 7
//!
//! [[series]]
//! label = "user"
//! program = "utime"
//!
//! [[series]]
//! label = "kernel"
//! program = "ktime"
//!
//! [[derived]]
//! label = "syscall"
//! op = "difference"
//! lhs = "user"
//! rhs = "kernel"
//! ```

pub mod aggregator;
pub mod comparison;
pub mod config;
pub mod error;
pub mod reporter;
pub mod runner;
pub mod stats;
pub mod table;

// Re-export main types for convenience
pub use aggregator::{Aggregator, AggregatorSettings, CleanedTable, EmptyCellPolicy, Measurement};
pub use comparison::{ComparisonHarness, DerivedOp, NamedSeries, SeriesBundle};
pub use config::{Config, Preset};
pub use error::{AlignmentError, ExecutionError, HarnessError};
pub use reporter::{OutputFormat, Reporter};
pub use runner::{ExecutionEnvironment, ProcessTrialRunner, TrialRunner};
pub use table::SampleTable;
