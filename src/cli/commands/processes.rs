//! `dfm processes` command - ranked process suitability

use console::style;
use miette::Result;

use crate::analysis::{AnalysisInput, Estimator};
use crate::cli::helpers::{styled_rating, Context, InputArgs};
use crate::cli::output::{self, Table};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::entities::response::ProcessSuitability;

#[derive(clap::Args, Debug)]
pub struct ProcessesArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

pub fn run(args: ProcessesArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let rules = ctx.rulebook()?;
    let request = args.input.load(&ctx, &rules)?;
    request.validate()?;

    let ranked = Estimator::new(&rules).rank(&AnalysisInput::from_request(&request))?;

    let format = ctx.format(global);
    match format {
        OutputFormat::Auto => print_ranking(&ranked, global.quiet),
        _ => output::emit(&ranked, &ranking_table(&ranked), format)?,
    }
    Ok(())
}

fn ranking_table(ranked: &[ProcessSuitability]) -> Table {
    let mut table = Table::new(["Rank", "Process", "Score", "Rating", "Unit Cost", "Lead Days"]);
    for (i, s) in ranked.iter().enumerate() {
        table.push([
            (i + 1).to_string(),
            s.process.to_string(),
            format!("{:.1}", s.suitability_score),
            s.rating.to_string(),
            format!("{:.2}", s.estimated_unit_cost),
            s.estimated_lead_time.to_string(),
        ]);
    }
    table
}

fn print_ranking(ranked: &[ProcessSuitability], quiet: bool) {
    for (i, s) in ranked.iter().enumerate() {
        println!(
            "{}. {}  {:.1} ({})  ${:.2}/part  {} days",
            i + 1,
            style(s.process.label()).bold(),
            s.suitability_score,
            styled_rating(s.rating),
            s.estimated_unit_cost,
            s.estimated_lead_time
        );
        if quiet {
            continue;
        }
        for advantage in &s.advantages {
            println!("   {} {}", style("+").green(), advantage);
        }
        for limitation in &s.limitations {
            println!("   {} {}", style("-").red(), limitation);
        }
    }
}
