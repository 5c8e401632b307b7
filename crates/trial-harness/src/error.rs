//! Error types for trial execution, aggregation and series composition

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Failure of a single trial. Always fatal for the measurement it belongs to.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with {status}")]
    NonZeroExit { program: String, status: ExitStatus },

    #[error("Failed to access trial output {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed trial output at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error(
        "Trial {trial} produced a {found:?} table (categories x samples), expected {expected:?}"
    )]
    ShapeMismatch {
        trial: usize,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Trial {trial} reported X = {found} at sample {sample}, expected {expected}")]
    AxisMismatch {
        trial: usize,
        sample: usize,
        expected: f64,
        found: f64,
    },
}

/// Two series that were meant to share an X-axis do not.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignmentError {
    #[error("Series '{label}' has {found} points, expected {expected}")]
    LengthMismatch {
        label: String,
        expected: usize,
        found: usize,
    },

    #[error("Series '{label}' has X = {found} at index {index}, expected {expected}")]
    AxisMismatch {
        label: String,
        index: usize,
        expected: f64,
        found: f64,
    },
}

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Alignment(#[from] AlignmentError),

    #[error("Every observation was filtered out for category {category}, sample {sample}")]
    AllObservationsFiltered { category: usize, sample: usize },

    #[error("Series '{0}' already exists")]
    DuplicateSeries(String),

    #[error("Series '{label}' has a non-finite value at point {index}")]
    NonFiniteValue { label: String, index: usize },

    #[error("Unknown series: {0}")]
    UnknownSeries(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, HarnessError>;
