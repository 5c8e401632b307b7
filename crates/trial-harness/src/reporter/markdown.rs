//! Markdown reporter for series bundles

use anyhow::Result;
use std::fmt::Write;

use super::{format_point, format_value, legend_label, y_unit};
use crate::comparison::SeriesBundle;

/// Markdown format reporter
pub struct MarkdownReporter;

impl MarkdownReporter {
    /// Format a bundle as a Markdown document
    pub fn format(bundle: &SeriesBundle) -> Result<String> {
        let mut output = String::new();
        let unit = y_unit(&bundle.plot.y_label);

        writeln!(output, "# {}", bundle.plot.title)?;
        writeln!(output)?;
        writeln!(
            output,
            "Mode {}, {} runs per series, z-score threshold {}, measured {} ({}ms).",
            bundle.base_mode, bundle.runs, bundle.z_threshold, bundle.started_at, bundle.duration_ms
        )?;
        writeln!(output)?;

        writeln!(output, "## Series")?;
        writeln!(output)?;
        for series in &bundle.series {
            let suffix = if series.derived { " _(derived)_" } else { "" };
            writeln!(output, "- {}{}", legend_label(series, unit), suffix)?;
        }
        writeln!(output)?;

        writeln!(output, "## Data ({})", bundle.plot.y_label)?;
        writeln!(output)?;

        write!(output, "| {} |", bundle.plot.x_label)?;
        for series in &bundle.series {
            write!(output, " {} |", series.label)?;
        }
        writeln!(output)?;

        write!(output, "|---:|")?;
        for _ in &bundle.series {
            write!(output, "---:|")?;
        }
        writeln!(output)?;

        for (i, &x) in bundle.x_axis.iter().enumerate() {
            write!(output, "| {} |", format_value(x))?;
            for series in &bundle.series {
                write!(output, " {} |", format_point(series, i))?;
            }
            writeln!(output)?;
        }

        Ok(output)
    }
}
