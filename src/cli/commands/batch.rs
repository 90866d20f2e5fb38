//! `dfm batch` command - analyze many requests on the worker pool

use console::style;
use miette::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::analysis::service::{BatchReport, MetricsSnapshot};
use crate::cli::helpers::{parse_request, styled_rating, Context};
use crate::cli::output::{self, Table};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::entities::request::AnalyzeRequest;
use crate::entities::response::AnalysisResponse;

#[derive(clap::Args, Debug)]
pub struct BatchArgs {
    /// Request files or directories of *.json requests
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Worker threads (default: config `workers`, 4)
    #[arg(long, short = 'j')]
    pub workers: Option<usize>,

    /// Bypass the result cache
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Debug, Serialize)]
struct BatchOutput<'a> {
    results: Vec<BatchItem<'a>>,
    skipped: Vec<String>,
    degraded: usize,
    cached: usize,
    elapsed_ms: f64,
    workers: usize,
    metrics: MetricsSnapshot,
}

#[derive(Debug, Serialize)]
struct BatchItem<'a> {
    file: String,
    response: &'a AnalysisResponse,
}

pub fn run(args: BatchArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let mut service = ctx.service(!args.no_cache)?;
    if let Some(workers) = args.workers {
        service = service.with_workers(workers);
    }
    service.authorize(global.api_key.as_deref())?;

    let files = collect_files(&args.inputs)?;
    let mut requests: Vec<AnalyzeRequest> = Vec::with_capacity(files.len());
    let mut loaded: Vec<&Path> = Vec::with_capacity(files.len());
    let mut skipped = Vec::new();
    for file in &files {
        let parsed = std::fs::read_to_string(file)
            .map_err(|e| miette::miette!("{}", e))
            .and_then(|contents| parse_request(&contents, &file.display().to_string()));
        match parsed {
            Ok(request) => {
                requests.push(request);
                loaded.push(file);
            }
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "Skipping unreadable request");
                skipped.push(file.display().to_string());
            }
        }
    }

    if requests.is_empty() {
        return Err(miette::miette!(
            "No analyzable requests found in {} file(s)",
            files.len()
        ));
    }

    let report = service.analyze_batch(&requests);
    let format = ctx.format(global);

    let table = result_table(&loaded, &report);
    match format {
        OutputFormat::Yaml | OutputFormat::Json => {
            let out = BatchOutput {
                results: loaded
                    .iter()
                    .zip(&report.responses)
                    .map(|(file, response)| BatchItem {
                        file: file.display().to_string(),
                        response,
                    })
                    .collect(),
                skipped,
                degraded: report.degraded,
                cached: report.cached,
                elapsed_ms: report.elapsed_ms,
                workers: report.workers,
                metrics: report.metrics,
            };
            output::emit(&out, &table, format)?;
        }
        OutputFormat::Auto => {
            print!("{}", table.render(format)?);
            if !global.quiet {
                print_metrics(&report, skipped.len());
            }
        }
        _ => print!("{}", table.render(format)?),
    }
    Ok(())
}

/// Files named directly plus every `*.json` below the given directories
fn collect_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = walkdir::WalkDir::new(input)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("json"))
                .map(|e| e.path().to_path_buf())
                .collect();
            found.sort();
            files.extend(found);
        } else if input.is_file() {
            files.push(input.clone());
        } else {
            return Err(miette::miette!("No such file or directory: {}", input.display()));
        }
    }
    Ok(files)
}

fn result_table(files: &[&Path], report: &BatchReport) -> Table {
    let mut table = Table::new(["File", "Part", "Score", "Rating", "Issues", "Status"]);
    for (file, response) in files.iter().zip(&report.responses) {
        let status = if response.degraded {
            "degraded"
        } else if response.cached {
            "cached"
        } else {
            "ok"
        };
        table.push([
            file.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string()),
            response.part_name.clone(),
            format!("{:.1}", response.manufacturability_score),
            response.overall_rating.to_string(),
            response.manufacturing_issues.len().to_string(),
            status.to_string(),
        ]);
    }
    table
}

fn print_metrics(report: &BatchReport, skipped: usize) {
    let m = &report.metrics;
    println!();
    println!(
        "{} {} analyzed on {} workers in {:.1} ms",
        style("✓").green(),
        report.responses.len(),
        report.workers,
        report.elapsed_ms
    );
    println!(
        "  {} {}  {} {}  {} {}",
        style("cached").dim(),
        report.cached,
        style("degraded").dim(),
        if report.degraded > 0 {
            style(report.degraded.to_string()).red().to_string()
        } else {
            report.degraded.to_string()
        },
        style("skipped").dim(),
        skipped
    );
    println!(
        "  {} {:.1} ms  {} {:.1} ms",
        style("avg").dim(),
        m.average_ms,
        style("peak").dim(),
        m.peak_ms
    );
    let worst = report
        .responses
        .iter()
        .filter(|r| !r.degraded)
        .min_by(|a, b| a.manufacturability_score.total_cmp(&b.manufacturability_score));
    if let Some(worst) = worst {
        println!(
            "  {} {} ({:.1}, {})",
            style("lowest").dim(),
            worst.part_name,
            worst.manufacturability_score,
            styled_rating(worst.overall_rating)
        );
    }
}
