//! Trial execution
//!
//! A trial is one run of an external benchmark program with a single integer
//! `mode` argument. The program prints a whitespace-delimited table which is
//! captured and parsed into a [`SampleTable`].
//!
//! The [`TrialRunner`] trait is the seam between the numeric pipeline and
//! process spawning: the aggregator only needs "given program + mode, return
//! a parsed table or fail", so tests substitute an in-memory runner that
//! returns canned tables.
//!
//! # Example
//!
//! ```no_run
//! use trial_harness::runner::{ExecutionEnvironment, ProcessTrialRunner, TrialRunner};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let runner = ProcessTrialRunner::new(".", "scripts/tmp.txt")
//!     .with_environment(ExecutionEnvironment { elevate: true, cpu: Some(7) });
//!
//! // Runs `sudo taskset -c 7 ./ktime 0 > scripts/tmp.txt`
//! let table = runner.run("ktime", 0).await?;
//! println!("{} samples", table.x_axis().len());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::ExecutionError;
use crate::table::SampleTable;

/// Capability to execute one trial and return its parsed output.
#[async_trait]
pub trait TrialRunner {
    /// Run `program` once with `mode` as its only argument.
    async fn run(&self, program: &str, mode: u32) -> Result<SampleTable, ExecutionError>;
}

#[async_trait]
impl<R: TrialRunner + Send + Sync + ?Sized> TrialRunner for &R {
    async fn run(&self, program: &str, mode: u32) -> Result<SampleTable, ExecutionError> {
        (**self).run(program, mode).await
    }
}

/// Execution context the benchmark programs require.
///
/// Programs that read kernel devices typically need root, and pinning them to
/// a dedicated CPU keeps scheduler noise out of the measurements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionEnvironment {
    /// Run through `sudo`
    #[serde(default)]
    pub elevate: bool,
    /// Pin to this CPU with `taskset -c`
    #[serde(default)]
    pub cpu: Option<usize>,
}

impl ExecutionEnvironment {
    /// Full argument vector for launching `program` with `mode`.
    ///
    /// # Examples
    ///
    /// ```
    /// use trial_harness::runner::ExecutionEnvironment;
    ///
    /// let env = ExecutionEnvironment { elevate: true, cpu: Some(7) };
    /// assert_eq!(
    ///     env.command_line("./ktime", 2),
    ///     vec!["sudo", "taskset", "-c", "7", "./ktime", "2"]
    /// );
    /// ```
    pub fn command_line(&self, program: &str, mode: u32) -> Vec<String> {
        let mut argv = Vec::new();
        if self.elevate {
            argv.push("sudo".to_string());
        }
        if let Some(cpu) = self.cpu {
            argv.push("taskset".to_string());
            argv.push("-c".to_string());
            argv.push(cpu.to_string());
        }
        argv.push(program.to_string());
        argv.push(mode.to_string());
        argv
    }
}

/// Runs benchmark programs as child processes.
///
/// Stdout is redirected into `output_path`, which is truncated at the start of
/// every trial and read back once the process has exited.
#[derive(Debug, Clone)]
pub struct ProcessTrialRunner {
    program_dir: PathBuf,
    output_path: PathBuf,
    environment: ExecutionEnvironment,
}

impl ProcessTrialRunner {
    pub fn new(program_dir: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            program_dir: program_dir.into(),
            output_path: output_path.into(),
            environment: ExecutionEnvironment::default(),
        }
    }

    pub fn with_environment(mut self, environment: ExecutionEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Path the program is launched from, relative to `program_dir`.
    pub fn program_path(&self, program: &str) -> PathBuf {
        self.program_dir.join(program)
    }

    fn output_error(&self, source: std::io::Error) -> ExecutionError {
        ExecutionError::Output {
            path: self.output_path.clone(),
            source,
        }
    }
}

#[async_trait]
impl TrialRunner for ProcessTrialRunner {
    #[instrument(skip(self), fields(output = %self.output_path.display()))]
    async fn run(&self, program: &str, mode: u32) -> Result<SampleTable, ExecutionError> {
        let program_path = self.program_path(program).display().to_string();
        let argv = self.environment.command_line(&program_path, mode);
        debug!("Launching: {}", argv.join(" "));

        // The command owns the only parent-side handle to the output file, so
        // dropping it at the end of this block closes the file before reading.
        let status = {
            let output = File::create(&self.output_path).map_err(|e| self.output_error(e))?;
            let mut command = Command::new(&argv[0]);
            command
                .args(&argv[1..])
                .stdin(Stdio::null())
                .stdout(output)
                .stderr(Stdio::inherit())
                .kill_on_drop(true);

            command
                .status()
                .await
                .map_err(|source| ExecutionError::Spawn {
                    program: program_path.clone(),
                    source,
                })?
        };

        if !status.success() {
            return Err(ExecutionError::NonZeroExit {
                program: program_path,
                status,
            });
        }

        let text = tokio::fs::read_to_string(&self.output_path)
            .await
            .map_err(|e| self.output_error(e))?;
        let table = SampleTable::parse(&text)?;

        debug!(
            "Trial produced {} categories x {} samples",
            table.shape().0,
            table.shape().1
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_plain() {
        let env = ExecutionEnvironment::default();
        assert_eq!(env.command_line("./utime", 0), vec!["./utime", "0"]);
    }

    #[test]
    fn test_command_line_pinned_only() {
        let env = ExecutionEnvironment {
            elevate: false,
            cpu: Some(3),
        };
        assert_eq!(
            env.command_line("./ktime", 1),
            vec!["taskset", "-c", "3", "./ktime", "1"]
        );
    }

    #[test]
    fn test_command_line_elevated_only() {
        let env = ExecutionEnvironment {
            elevate: true,
            cpu: None,
        };
        assert_eq!(env.command_line("./ktime", 4), vec!["sudo", "./ktime", "4"]);
    }

    #[test]
    fn test_program_path_resolution() {
        let runner = ProcessTrialRunner::new(".", "out.txt");
        assert_eq!(runner.program_path("utime"), PathBuf::from("./utime"));

        let runner = ProcessTrialRunner::new("build", "out.txt");
        assert_eq!(runner.program_path("ktime"), PathBuf::from("build/ktime"));
        assert_eq!(
            runner.program_path("/usr/local/bin/ktime"),
            PathBuf::from("/usr/local/bin/ktime")
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let dir = std::env::temp_dir();
        let output = dir.join(format!("trial-harness-missing-{}.txt", std::process::id()));
        let runner = ProcessTrialRunner::new(&dir, &output);

        let err = runner
            .run("definitely-not-a-benchmark-program", 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Spawn { .. }));

        let _ = std::fs::remove_file(output);
    }

    #[tokio::test]
    async fn test_unwritable_output_is_output_error() {
        let runner = ProcessTrialRunner::new(".", "/nonexistent-dir/trial.txt");
        let err = runner.run("utime", 0).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Output { .. }));
    }
}
