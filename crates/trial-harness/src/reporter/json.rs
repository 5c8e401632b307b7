//! JSON reporter for series bundles

use crate::comparison::SeriesBundle;
use anyhow::Result;

/// JSON format reporter
pub struct JsonReporter;

impl JsonReporter {
    /// Format a bundle as JSON
    ///
    /// # Arguments
    ///
    /// * `bundle` - The bundle to format
    /// * `pretty` - Whether to pretty-print the JSON
    pub fn format(bundle: &SeriesBundle, pretty: bool) -> Result<String> {
        let output = if pretty {
            serde_json::to_string_pretty(bundle)?
        } else {
            serde_json::to_string(bundle)?
        };
        Ok(output)
    }
}
