// Entry point: parse arguments, set up logging, run the report battery.
//
// Mirrors the release tooling invocation `statview <version> <dataset>`,
// e.g. `statview r18 Full`, reading from `data/r18/Full/` and writing to
// `data/r18/Stat-Full/`.
use anyhow::Result;
use clap::Parser;
use statview::runner::{run, RunConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "statview")]
#[command(about = "Build stat-view count tables for a surveillance data release")]
#[command(version)]
struct Cli {
    /// Release version, e.g. r18
    version: String,

    /// Dataset name, e.g. Full
    dataset: String,

    /// Root folder holding `<version>/<dataset>/` inputs
    #[arg(long, value_name = "DIR", default_value = "data", env = "STATVIEW_DATA_DIR")]
    data_dir: PathBuf,

    /// Write reports here instead of `<data-dir>/<version>/Stat-<dataset>`
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Worker threads for report generation (default: one per core)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Print the first N rows of each report
    #[arg(long, value_name = "N", default_value_t = 0)]
    preview: usize,

    /// JSON file with additional report definitions
    #[arg(long, value_name = "FILE")]
    extra_reports: Option<PathBuf>,

    /// Only run reports with these indices (comma separated)
    #[arg(long, value_delimiter = ',')]
    only: Vec<String>,

    /// Exit with status 2 if any report failed
    #[arg(long)]
    strict: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl From<Cli> for RunConfig {
    fn from(cli: Cli) -> Self {
        RunConfig {
            output_dir: cli.output_dir,
            jobs: cli.jobs,
            preview_rows: cli.preview,
            only: cli.only,
            extra_reports: cli.extra_reports,
            ..RunConfig::new(cli.data_dir, &cli.version, &cli.dataset)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let strict = cli.strict;
    let config = RunConfig::from(cli);

    let summary = match run(&config) {
        Ok(s) => s,
        Err(e) => {
            error!("{e:#}");
            return Ok(ExitCode::from(1));
        }
    };

    for outcome in &summary.reports {
        if let Some(preview) = &outcome.preview {
            println!("\n{}_{} ({})\n", outcome.index, outcome.label, outcome.file);
            println!("{preview}");
        }
    }

    let failed: Vec<_> = summary.failed().collect();
    println!(
        "\n{} of {} reports written to {}",
        summary.reports.len() - failed.len(),
        summary.reports.len(),
        summary.output_dir.display()
    );
    for f in &failed {
        println!("  failed: {}_{}", f.index, f.label);
    }

    if strict && !failed.is_empty() {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}
