//! Tabular output of a single trial
//!
//! Benchmark programs print one line per sample point: the X value followed by
//! one column per reported category. [`SampleTable`] stores the transposed
//! form, with the X-axis split out and one row per category.

use serde::{Deserialize, Serialize};

use crate::error::ExecutionError;

/// A rectangular numeric table produced by one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleTable {
    x_axis: Vec<f64>,
    categories: Vec<Vec<f64>>,
}

impl SampleTable {
    /// Build a table from an X-axis and category rows.
    ///
    /// Every category row must have exactly one value per X-axis entry, the
    /// table must contain at least one category and one sample, and every
    /// value must be finite.
    pub fn new(x_axis: Vec<f64>, categories: Vec<Vec<f64>>) -> Result<Self, ExecutionError> {
        if x_axis.is_empty() {
            return Err(ExecutionError::Parse {
                line: 0,
                message: "table has no samples".to_string(),
            });
        }
        if categories.is_empty() {
            return Err(ExecutionError::Parse {
                line: 0,
                message: "table has no categories".to_string(),
            });
        }
        if let Some((index, row)) = categories
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != x_axis.len())
        {
            return Err(ExecutionError::Parse {
                line: 0,
                message: format!(
                    "category {} has {} values, expected {}",
                    index,
                    row.len(),
                    x_axis.len()
                ),
            });
        }

        if x_axis
            .iter()
            .chain(categories.iter().flatten())
            .any(|value| !value.is_finite())
        {
            return Err(ExecutionError::Parse {
                line: 0,
                message: "table contains a non-finite value".to_string(),
            });
        }

        Ok(Self { x_axis, categories })
    }

    /// Parse whitespace-delimited program output.
    ///
    /// Blank lines and lines starting with `#` are skipped. Each remaining
    /// line is one sample point: `x c0 c1 ...`. All lines must have the same
    /// number of columns, and at least two (X plus one category). `nan` and
    /// `inf` tokens are rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use trial_harness::table::SampleTable;
    ///
    /// let table = SampleTable::parse("0 12 7\n1 15 9\n").unwrap();
    /// assert_eq!(table.x_axis(), &[0.0, 1.0]);
    /// assert_eq!(table.category(0), Some(&[12.0, 15.0][..]));
    /// assert_eq!(table.shape(), (2, 2));
    /// ```
    pub fn parse(text: &str) -> Result<Self, ExecutionError> {
        let mut width: Option<usize> = None;
        let mut x_axis = Vec::new();
        let mut categories: Vec<Vec<f64>> = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let values = line
                .split_whitespace()
                .map(|token| match token.parse::<f64>() {
                    Ok(value) if value.is_finite() => Ok(value),
                    Ok(_) => Err(ExecutionError::Parse {
                        line: line_no,
                        message: format!("'{}' is not a finite number", token),
                    }),
                    Err(_) => Err(ExecutionError::Parse {
                        line: line_no,
                        message: format!("'{}' is not a number", token),
                    }),
                })
                .collect::<Result<Vec<f64>, _>>()?;

            match width {
                None => {
                    if values.len() < 2 {
                        return Err(ExecutionError::Parse {
                            line: line_no,
                            message: format!(
                                "expected an X column and at least one category, found {} column(s)",
                                values.len()
                            ),
                        });
                    }
                    width = Some(values.len());
                    categories = vec![Vec::new(); values.len() - 1];
                }
                Some(expected) if expected != values.len() => {
                    return Err(ExecutionError::Parse {
                        line: line_no,
                        message: format!("expected {} columns, found {}", expected, values.len()),
                    });
                }
                Some(_) => {}
            }

            x_axis.push(values[0]);
            for (row, value) in categories.iter_mut().zip(&values[1..]) {
                row.push(*value);
            }
        }

        if width.is_none() {
            return Err(ExecutionError::Parse {
                line: 0,
                message: "output contained no data".to_string(),
            });
        }

        Ok(Self { x_axis, categories })
    }

    pub fn x_axis(&self) -> &[f64] {
        &self.x_axis
    }

    pub fn categories(&self) -> &[Vec<f64>] {
        &self.categories
    }

    pub fn category(&self, index: usize) -> Option<&[f64]> {
        self.categories.get(index).map(Vec::as_slice)
    }

    /// `(categories, samples)`
    pub fn shape(&self) -> (usize, usize) {
        (self.categories.len(), self.x_axis.len())
    }

    /// Value at a (category, sample) coordinate.
    pub fn value(&self, category: usize, sample: usize) -> Option<f64> {
        self.categories.get(category)?.get(sample).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transposes_columns() {
        let table = SampleTable::parse("1 100 50\n2 110 55\n3 120 60\n").unwrap();

        assert_eq!(table.shape(), (2, 3));
        assert_eq!(table.x_axis(), &[1.0, 2.0, 3.0]);
        assert_eq!(table.category(0), Some(&[100.0, 110.0, 120.0][..]));
        assert_eq!(table.category(1), Some(&[50.0, 55.0, 60.0][..]));
        assert_eq!(table.value(1, 2), Some(60.0));
    }

    #[test]
    fn test_parse_skips_blank_and_comment_lines() {
        let text = "# n time\n\n0 10\n   \n1 20\n";
        let table = SampleTable::parse(text).unwrap();

        assert_eq!(table.x_axis(), &[0.0, 1.0]);
        assert_eq!(table.category(0), Some(&[10.0, 20.0][..]));
    }

    #[test]
    fn test_parse_accepts_tabs_and_floats() {
        let table = SampleTable::parse("0\t1.5e2\n1\t-3.25\n").unwrap();
        assert_eq!(table.category(0), Some(&[150.0, -3.25][..]));
    }

    #[test]
    fn test_parse_rejects_ragged_rows() {
        let err = SampleTable::parse("0 10 20\n1 10\n").unwrap_err();
        match err {
            ExecutionError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        let err = SampleTable::parse("0 10\n1 fast\n").unwrap_err();
        assert!(err.to_string().contains("'fast' is not a number"));
    }

    #[test]
    fn test_parse_rejects_non_finite() {
        let err = SampleTable::parse("0 10\n1 nan\n").unwrap_err();
        match err {
            ExecutionError::Parse { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("'nan' is not a finite number"));
            }
            other => panic!("Expected Parse error, got {:?}", other),
        }

        let err = SampleTable::parse("inf 5\n").unwrap_err();
        assert!(err.to_string().contains("'inf' is not a finite number"));
        assert!(SampleTable::parse("0 -infinity\n").is_err());
    }

    #[test]
    fn test_parse_rejects_single_column() {
        assert!(SampleTable::parse("0\n1\n2\n").is_err());
    }

    #[test]
    fn test_parse_rejects_empty_output() {
        assert!(SampleTable::parse("").is_err());
        assert!(SampleTable::parse("# nothing here\n\n").is_err());
    }

    #[test]
    fn test_new_validates_row_lengths() {
        assert!(SampleTable::new(vec![1.0, 2.0], vec![vec![1.0, 2.0]]).is_ok());
        assert!(SampleTable::new(vec![1.0, 2.0], vec![vec![1.0]]).is_err());
        assert!(SampleTable::new(vec![1.0], vec![]).is_err());
        assert!(SampleTable::new(vec![], vec![vec![]]).is_err());
    }

    #[test]
    fn test_new_rejects_non_finite() {
        assert!(SampleTable::new(vec![f64::NAN], vec![vec![1.0]]).is_err());
        assert!(SampleTable::new(vec![1.0], vec![vec![f64::INFINITY]]).is_err());
    }

    #[test]
    fn test_value_out_of_range() {
        let table = SampleTable::new(vec![1.0], vec![vec![5.0]]).unwrap();
        assert_eq!(table.value(0, 1), None);
        assert_eq!(table.value(1, 0), None);
        assert_eq!(table.category(3), None);
    }
}
