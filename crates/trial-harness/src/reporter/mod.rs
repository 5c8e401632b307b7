//! Series bundle reporting
//!
//! This module hands a finished [`SeriesBundle`] to the outside world in one
//! of several text formats. Graphical plotting is left to external tools,
//! which can consume the JSON output.
//!
//! # Output Formats
//!
//! - **JSON**: Machine-readable format for plotting tools
//! - **Console**: Human-readable table with a legend of series means
//! - **Markdown**: Documentation-friendly format for reports
//!
//! # Example
//!
//! ```no_run
//! use trial_harness::reporter::{Reporter, OutputFormat};
//! use trial_harness::comparison::SeriesBundle;
//!
//! # fn example(bundle: SeriesBundle) -> anyhow::Result<()> {
//! let reporter = Reporter::new(OutputFormat::Console);
//! reporter.report(&bundle)?;
//!
//! // Or write to a file
//! Reporter::new(OutputFormat::Json)
//!     .write_to_file(&bundle, "fib.json")?;
//! # Ok(())
//! # }
//! ```

mod console;
mod json;
mod markdown;

use anyhow::Result;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::comparison::{NamedSeries, SeriesBundle};

pub use console::ConsoleReporter;
pub use json::JsonReporter;
pub use markdown::MarkdownReporter;

/// Output format for series bundles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// JSON format for machine parsing
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// Console output with tables
    #[default]
    Console,
    /// Markdown format for documentation
    Markdown,
}

/// Reporter for series bundles
pub struct Reporter {
    format: OutputFormat,
}

impl Reporter {
    /// Create a new reporter with the specified output format
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Report a bundle to stdout
    pub fn report(&self, bundle: &SeriesBundle) -> Result<()> {
        let output = self.format_bundle(bundle)?;
        let mut stdout = io::stdout().lock();
        stdout.write_all(output.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }

    /// Write a bundle to a file
    pub fn write_to_file<P: AsRef<Path>>(&self, bundle: &SeriesBundle, path: P) -> Result<()> {
        let output = self.format_bundle(bundle)?;
        fs::write(path, output)?;
        Ok(())
    }

    /// Format a bundle as a string
    pub fn format_bundle(&self, bundle: &SeriesBundle) -> Result<String> {
        match self.format {
            OutputFormat::Json => JsonReporter::format(bundle, false),
            OutputFormat::JsonPretty => JsonReporter::format(bundle, true),
            OutputFormat::Console => ConsoleReporter::format(bundle),
            OutputFormat::Markdown => MarkdownReporter::format(bundle),
        }
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(OutputFormat::default())
    }
}

/// Legend entry: label with the series mean in the Y unit.
pub(crate) fn legend_label(series: &NamedSeries, unit: &str) -> String {
    if unit.is_empty() {
        format!("{} mean = {:.0}", series.label, series.summary.mean)
    } else {
        format!("{} mean = {:.0} {}", series.label, series.summary.mean, unit)
    }
}

/// Unit taken from a trailing parenthesised part of the Y label, e.g. `ns`
/// from `time (ns)`.
pub(crate) fn y_unit(y_label: &str) -> &str {
    y_label
        .trim_end()
        .strip_suffix(')')
        .and_then(|rest| rest.rsplit_once('(').map(|(_, unit)| unit.trim()))
        .unwrap_or("")
}

/// Compact number for table cells.
pub(crate) fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

/// Table cell for point `index` of a series; blank when the series is short.
pub(crate) fn format_point(series: &NamedSeries, index: usize) -> String {
    series
        .values
        .get(index)
        .map(|v| format_value(*v))
        .unwrap_or_default()
}
