//! Runs the report battery for one `(version, dataset)` pair.
//!
//! Each report is independent: a failure is logged, recorded in the run
//! summary, and the remaining reports still run.

use crate::loader::{load_dataset, Dataset, InputPaths, LoadReport};
use crate::output::{render_preview, write_csv, write_json};
use crate::reports::{generate_report, load_extra_reports, ReportSpec, STANDARD_REPORTS};
use crate::util::format_int;
use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};

/// Resolved settings for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub data_dir: PathBuf,
    pub version: String,
    pub dataset: String,
    /// Defaults to `<data_dir>/<version>/Stat-<dataset>`.
    pub output_dir: Option<PathBuf>,
    /// Worker threads; `None` uses one per core.
    pub jobs: Option<usize>,
    pub preview_rows: usize,
    /// Report indices to run; empty runs everything.
    pub only: Vec<String>,
    pub extra_reports: Option<PathBuf>,
}

impl RunConfig {
    pub fn new(data_dir: impl Into<PathBuf>, version: &str, dataset: &str) -> Self {
        Self {
            data_dir: data_dir.into(),
            version: version.to_string(),
            dataset: dataset.to_string(),
            output_dir: None,
            jobs: None,
            preview_rows: 0,
            only: Vec::new(),
            extra_reports: None,
        }
    }

    pub fn input_paths(&self) -> InputPaths {
        InputPaths::new(&self.data_dir, &self.version, &self.dataset)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            self.data_dir
                .join(&self.version)
                .join(format!("Stat-{}", self.dataset))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Status {
    Ok { rows: usize },
    Failed { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportOutcome {
    pub index: String,
    pub label: String,
    pub file: String,
    #[serde(flatten)]
    pub status: Status,
    pub elapsed_ms: u128,
    #[serde(skip)]
    pub preview: Option<String>,
}

impl ReportOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self.status, Status::Ok { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub samples: usize,
    pub variants: usize,
    pub clades: usize,
    pub unmatched_variants: usize,
    pub unmatched_clades: usize,
}

impl From<&LoadReport> for LoadSummary {
    fn from(r: &LoadReport) -> Self {
        Self {
            samples: r.samples,
            variants: r.variants,
            clades: r.clades,
            unmatched_variants: r.unmatched_variants,
            unmatched_clades: r.unmatched_clades,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub version: String,
    pub dataset: String,
    pub analyzed_at: String,
    pub output_dir: PathBuf,
    pub load: LoadSummary,
    pub reports: Vec<ReportOutcome>,
}

impl RunSummary {
    pub fn failed(&self) -> impl Iterator<Item = &ReportOutcome> {
        self.reports.iter().filter(|r| !r.is_ok())
    }
}

/// Build and write a single report. Errors carry the report title.
fn run_one(
    spec: &ReportSpec,
    data: &Dataset,
    out_dir: &Path,
    file: &str,
    analyzed_at: NaiveDateTime,
    preview_rows: usize,
) -> Result<(usize, Option<String>)> {
    let table = generate_report(spec, data, analyzed_at)
        .with_context(|| format!("computing {}", spec.title()))?;
    if table.undated > 0 {
        warn!(
            report = %spec.title(),
            undated = table.undated,
            "records without a collection date were left out of period columns"
        );
    }
    write_csv(&out_dir.join(file), &table).with_context(|| format!("writing {file}"))?;
    let preview = (preview_rows > 0).then(|| render_preview(&table, preview_rows, 8));
    Ok((table.rows.len(), preview))
}

/// Run every report in `specs` against `data`, isolating failures.
///
/// Outcomes come back in the order of `specs` whatever the thread count.
pub fn run_reports(
    specs: &[ReportSpec],
    data: &Dataset,
    config: &RunConfig,
    analyzed_at: NaiveDateTime,
) -> Result<Vec<ReportOutcome>> {
    let out_dir = config.output_dir();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.jobs.unwrap_or(0))
        .build()
        .context("building report worker pool")?;

    let outcomes = pool.install(|| {
        specs
            .par_iter()
            .map(|spec| {
                let file = spec.file_name(&config.version, &config.dataset);
                info!(report = %spec.title(), "processing");
                let started = Instant::now();
                let result = run_one(spec, data, &out_dir, &file, analyzed_at, config.preview_rows);
                let elapsed_ms = started.elapsed().as_millis();
                let (status, preview) = match result {
                    Ok((rows, preview)) => {
                        info!(report = %spec.title(), rows, "done");
                        (Status::Ok { rows }, preview)
                    }
                    Err(e) => {
                        error!(report = %spec.title(), "process error: {e:#}");
                        (Status::Failed { message: format!("{e:#}") }, None)
                    }
                };
                ReportOutcome {
                    index: spec.index.clone(),
                    label: spec.label.clone(),
                    file,
                    status,
                    elapsed_ms,
                    preview,
                }
            })
            .collect()
    });
    Ok(outcomes)
}

/// The standard battery plus any extra definitions, narrowed by `only`.
pub fn plan_reports(config: &RunConfig) -> Result<Vec<ReportSpec>> {
    let mut specs: Vec<ReportSpec> = STANDARD_REPORTS.clone();
    if let Some(path) = &config.extra_reports {
        let extra = load_extra_reports(path)
            .with_context(|| format!("reading report definitions from {}", path.display()))?;
        info!(count = extra.len(), "extra report definitions loaded");
        specs.extend(extra);
    }
    if !config.only.is_empty() {
        specs.retain(|s| config.only.iter().any(|i| *i == s.index));
    }
    Ok(specs)
}

/// Load inputs, run the planned reports and write `run_summary_*.json`.
///
/// Missing inputs, unreadable tables and malformed dates fail the whole
/// run; anything inside a report only fails that report.
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    let paths = config.input_paths();
    paths.check_exist()?;
    let specs = plan_reports(config)?;

    let (data, load_report) = load_dataset(&paths)
        .with_context(|| format!("loading {} {}", config.version, config.dataset))?;
    info!(
        "loaded {} samples, {} mutation calls, {} clade calls",
        format_int(load_report.samples),
        format_int(load_report.variants),
        format_int(load_report.clades)
    );
    if load_report.unmatched_variants + load_report.unmatched_clades > 0 {
        warn!(
            variants = load_report.unmatched_variants,
            clades = load_report.unmatched_clades,
            "calls reference samples missing from the sample table"
        );
    }

    let out_dir = config.output_dir();
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let analyzed_at = Local::now().naive_local();
    let reports = run_reports(&specs, &data, config, analyzed_at)?;

    let summary = RunSummary {
        version: config.version.clone(),
        dataset: config.dataset.clone(),
        analyzed_at: analyzed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        output_dir: out_dir.clone(),
        load: LoadSummary::from(&load_report),
        reports,
    };
    let summary_file = out_dir.join(format!(
        "run_summary_{}_{}.json",
        config.version, config.dataset
    ));
    write_json(&summary_file, &summary)
        .with_context(|| format!("writing {}", summary_file.display()))?;
    Ok(summary)
}
