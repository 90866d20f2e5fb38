//! `dfm analyze` command - single part analysis

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{styled_rating, styled_severity, truncate_str, Context, InputArgs};
use crate::cli::output::{self, Table};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::entities::issue::Severity;
use crate::entities::response::AnalysisResponse;

#[derive(clap::Args, Debug)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Skip the advanced checks
    #[arg(long)]
    pub no_advanced: bool,

    /// Bypass the result cache
    #[arg(long)]
    pub no_cache: bool,

    /// Also write the response to .dfm/reports/<analysis_id>.json
    #[arg(long)]
    pub save: bool,
}

pub fn run(args: AnalyzeArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let service = ctx.service(!args.no_cache)?;
    let mut request = args.input.load(&ctx, service.rules())?;
    if args.no_advanced {
        request.advanced_analysis = false;
    }

    let response = service.handle(global.api_key.as_deref(), &request)?;

    if args.save {
        save_report(&ctx, &response)?;
    }

    let format = ctx.format(global);
    match format {
        OutputFormat::Auto => print_summary(&response, global.quiet)?,
        _ => output::emit(&response, &issue_table(&response), format)?,
    }
    Ok(())
}

fn save_report(ctx: &Context, response: &AnalysisResponse) -> Result<()> {
    let project = ctx
        .project
        .as_ref()
        .ok_or_else(|| miette::miette!("--save needs a DFM project. Run 'dfm init' first."))?;
    let dir = project.reports_dir();
    std::fs::create_dir_all(&dir).into_diagnostic()?;
    let path = dir.join(format!("{}.json", response.analysis_id));
    let json = serde_json::to_string_pretty(response).into_diagnostic()?;
    std::fs::write(&path, json).into_diagnostic()?;
    eprintln!(
        "{} Saved report to {}",
        style("✓").green(),
        style(path.display()).cyan()
    );
    Ok(())
}

pub(crate) fn issue_table(response: &AnalysisResponse) -> Table {
    let mut table = Table::new(["Severity", "Issue", "Description", "Cost Impact"]);
    for issue in &response.manufacturing_issues {
        table.push([
            issue.severity.to_string(),
            issue.title.clone(),
            issue.description.clone(),
            issue
                .cost_impact
                .map(|c| format!("+{:.0}%", c * 100.0))
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    table
}

fn print_summary(response: &AnalysisResponse, quiet: bool) -> Result<()> {
    println!(
        "{} {}  score {} ({}){}{}",
        style("●").cyan(),
        style(&response.part_name).bold(),
        style(format!("{:.1}", response.manufacturability_score)).bold(),
        styled_rating(response.overall_rating),
        if response.cached {
            style("  cached").dim().to_string()
        } else {
            String::new()
        },
        if response.degraded {
            style("  degraded").red().to_string()
        } else {
            String::new()
        },
    );
    if let Some(ref error) = response.error {
        println!("  {} {}", style("error:").red(), error);
    }
    if quiet {
        return Ok(());
    }

    let primary = &response.primary_process;
    let cost = &response.cost_analysis;
    println!(
        "  {} {}  suitability {:.1}  ${:.2}/part  {} units  {} days",
        style("Process:").dim(),
        primary.process.label(),
        primary.suitability_score,
        cost.total_cost_per_part,
        cost.production_volume,
        primary.estimated_lead_time
    );
    println!();

    if response.manufacturing_issues.is_empty() {
        println!("{} No manufacturing issues found", style("✓").green());
    } else {
        let counts: Vec<String> = Severity::ALL
            .iter()
            .rev()
            .map(|&s| (s, response.count_by_severity(s)))
            .filter(|(_, n)| *n > 0)
            .map(|(s, n)| format!("{} {}", n, styled_severity(s)))
            .collect();
        println!(
            "{} issue(s): {}",
            response.manufacturing_issues.len(),
            counts.join(", ")
        );
        let mut table = Table::new(["Severity", "Issue", "Recommendation"]);
        for issue in &response.manufacturing_issues {
            table.push([
                styled_severity(issue.severity),
                issue.title.clone(),
                truncate_str(&issue.recommendation, 70),
            ]);
        }
        print!("{}", table.render(OutputFormat::Auto)?);
    }

    if !response.process_recommendations.is_empty() {
        println!();
        println!("{}", style("Process ranking:").bold());
        for (i, s) in response.process_recommendations.iter().enumerate() {
            println!(
                "  {}. {:<20} {:>5.1}  {}  ${:.2}/part",
                i + 1,
                s.process.label(),
                s.suitability_score,
                styled_rating(s.rating),
                s.estimated_unit_cost
            );
        }
    }

    if !response.expert_recommendations.is_empty() {
        println!();
        println!("{}", style("Recommendations:").bold());
        for rec in &response.expert_recommendations {
            println!("  • {}", rec);
        }
    }

    println!();
    println!(
        "{}",
        style(format!(
            "{} · {:.1} ms",
            response.analysis_id, response.processing_time_ms
        ))
        .dim()
    );
    Ok(())
}
