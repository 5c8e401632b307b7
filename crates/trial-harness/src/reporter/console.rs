//! Console reporter for series bundles
//!
//! Provides human-readable output: run settings, a legend with each series'
//! mean, and an ASCII table of every point.

use anyhow::Result;
use std::fmt::Write;

use super::{format_point, format_value, legend_label, y_unit};
use crate::comparison::SeriesBundle;

/// Console format reporter
pub struct ConsoleReporter;

impl ConsoleReporter {
    /// Format a bundle for console output
    pub fn format(bundle: &SeriesBundle) -> Result<String> {
        let mut output = String::new();

        writeln!(output)?;
        writeln!(output, "╔══════════════════════════════════════════════════════════════╗")?;
        writeln!(output, "║                     MEASUREMENT RESULTS                      ║")?;
        writeln!(output, "╚══════════════════════════════════════════════════════════════╝")?;
        writeln!(output)?;

        writeln!(output, "Title:     {}", bundle.plot.title)?;
        writeln!(output, "Started:   {}", bundle.started_at)?;
        writeln!(output, "Duration:  {}ms", bundle.duration_ms)?;
        writeln!(output)?;

        writeln!(output, "Configuration:")?;
        writeln!(output, "  Base Mode:          {}", bundle.base_mode)?;
        writeln!(output, "  Runs per Series:    {}", bundle.runs)?;
        writeln!(output, "  Z-Score Threshold:  {}", bundle.z_threshold)?;
        if let (Some(min), Some(max)) = (bundle.plot.y_min, bundle.plot.y_max) {
            writeln!(output, "  Value Range:        {} .. {}", min, max)?;
        }
        writeln!(output)?;

        let unit = y_unit(&bundle.plot.y_label);
        writeln!(output, "Series:")?;
        for series in &bundle.series {
            let marker = if series.derived { "derived" } else { "measured" };
            writeln!(
                output,
                "  • {} ({}, min {}, median {}, max {})",
                legend_label(series, unit),
                marker,
                format_value(series.summary.min),
                format_value(series.summary.median),
                format_value(series.summary.max)
            )?;
        }
        writeln!(output)?;

        Self::format_table(&mut output, bundle)?;
        writeln!(output)?;
        Ok(output)
    }

    fn format_table(output: &mut String, bundle: &SeriesBundle) -> Result<()> {
        let mut headers = vec![bundle.plot.x_label.clone()];
        headers.extend(bundle.series.iter().map(|s| s.label.clone()));

        let rows: Vec<Vec<String>> = bundle
            .x_axis
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                let mut row = vec![format_value(x)];
                row.extend(bundle.series.iter().map(|s| format_point(s, i)));
                row
            })
            .collect();

        let widths: Vec<usize> = headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                rows.iter()
                    .map(|row| row[col].chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let rule = |left: &str, mid: &str, right: &str| -> String {
            let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            format!("  {}{}{}", left, segments.join(mid), right)
        };

        writeln!(output, "{}", rule("┌", "┬", "┐"))?;
        let header_cells: Vec<String> = headers
            .iter()
            .zip(&widths)
            .map(|(h, &w)| format!(" {:^w$} ", h, w = w))
            .collect();
        writeln!(output, "  │{}│", header_cells.join("│"))?;
        writeln!(output, "{}", rule("├", "┼", "┤"))?;

        for row in &rows {
            let cells: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(v, &w)| format!(" {:>w$} ", v, w = w))
                .collect();
            writeln!(output, "  │{}│", cells.join("│"))?;
        }

        writeln!(output, "{}", rule("└", "┴", "┘"))?;
        Ok(())
    }
}
