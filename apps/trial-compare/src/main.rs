//! Trial comparison binary
//!
//! Measures the configured benchmark programs, averages away outliers and
//! prints the resulting series. Invoked with just a mode it reproduces the
//! stock user/kernel/syscall comparison:
//!
//! ```text
//! trial-compare 1
//! trial-compare 0 --preset variants --format markdown
//! trial-compare --config fib.toml --output fib.json --format json-pretty
//! ```

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use trial_harness::{
    ComparisonHarness, Config, OutputFormat, Preset, ProcessTrialRunner, Reporter,
};

#[derive(Parser, Debug)]
#[command(name = "trial-compare")]
#[command(
    version,
    about = "Run benchmark programs repeatedly and compare their outlier-filtered curves"
)]
struct Args {
    /// Base mode passed to the benchmark programs
    #[arg(default_value_t = 0)]
    mode: u32,

    /// Built-in comparison to run when no config file is given
    #[arg(short, long, value_enum, default_value_t = PresetArg::Syscall)]
    preset: PresetArg,

    /// TOML configuration file (overrides --preset)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Trials per series (overrides the configured value)
    #[arg(long)]
    runs: Option<usize>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = FormatArg::Console)]
    format: FormatArg,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PresetArg {
    Syscall,
    Variants,
}

impl From<PresetArg> for Preset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Syscall => Preset::Syscall,
            PresetArg::Variants => Preset::Variants,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Console,
    Json,
    JsonPretty,
    Markdown,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Console => OutputFormat::Console,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::JsonPretty => OutputFormat::JsonPretty,
            FormatArg::Markdown => OutputFormat::Markdown,
        }
    }
}

impl Args {
    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::preset(self.preset.into()),
        };

        if let Some(runs) = self.runs {
            config.harness.runs = runs;
        }
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

// Trials must not overlap, so a single-threaded runtime is enough.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Reports go to stdout, so all logging goes to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = args.load_config()?;
    tracing::info!(
        "Starting trial-compare v{} (mode {}, {} series, {} runs each)",
        env!("CARGO_PKG_VERSION"),
        args.mode,
        config.series.len(),
        config.harness.runs
    );

    if let Some(parent) = config.harness.output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory {}", parent.display())
            })?;
        }
    }

    let runner = ProcessTrialRunner::new(&config.harness.program_dir, &config.harness.output_path)
        .with_environment(config.environment.clone());
    let bundle = ComparisonHarness::new(runner, config).run(args.mode).await?;

    let reporter = Reporter::new(args.format.into());
    match &args.output {
        Some(path) => {
            reporter
                .write_to_file(&bundle, path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            tracing::info!("Report written to {}", path.display());
        }
        None => reporter.report(&bundle)?,
    }

    Ok(())
}
