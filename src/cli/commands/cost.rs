//! `dfm cost` command - cost breakdown for a part

use console::style;
use miette::Result;
use serde::Serialize;

use crate::analysis::Estimator;
use crate::cli::helpers::{Context, InputArgs};
use crate::cli::output::{self, Table};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::entities::process::Process;
use crate::entities::response::CostAnalysis;

#[derive(clap::Args, Debug)]
pub struct CostArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Compare every candidate process instead of the requested one
    #[arg(long)]
    pub compare: bool,
}

#[derive(Debug, Serialize)]
struct ProcessCost {
    process: Process,
    #[serde(flatten)]
    cost: CostAnalysis,
}

pub fn run(args: CostArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let rules = ctx.rulebook()?;
    let request = args.input.load(&ctx, &rules)?;
    request.validate()?;

    let summary = request.cad_data.summary();
    let estimator = Estimator::new(&rules);
    let processes: Vec<Process> = if args.compare {
        rules.candidate_processes.clone()
    } else {
        vec![request.process]
    };

    let costs: Vec<ProcessCost> = processes
        .into_iter()
        .map(|process| ProcessCost {
            process,
            cost: estimator.cost_analysis(
                &summary,
                request.material,
                process,
                request.production_volume,
            ),
        })
        .collect();

    let format = ctx.format(global);
    let table = cost_table(&costs);
    match format {
        OutputFormat::Auto => {
            if !global.quiet {
                println!(
                    "{}  {} · {} units",
                    style(request.cad_data.part_name()).bold(),
                    request.material,
                    request.production_volume
                );
            }
            print!("{}", table.render(format)?);
        }
        _ if costs.len() == 1 => output::emit(&costs[0], &table, format)?,
        _ => output::emit(&costs, &table, format)?,
    }
    Ok(())
}

fn cost_table(costs: &[ProcessCost]) -> Table {
    let mut table = Table::new([
        "Process", "Material", "Labor", "Tooling", "Setup", "Finishing", "Overhead", "Discount",
        "Per Part", "Total",
    ]);
    for pc in costs {
        let c = &pc.cost;
        table.push([
            pc.process.label().to_string(),
            format!("{:.2}", c.material_cost),
            format!("{:.2}", c.labor_cost),
            format!("{:.2}", c.tooling_cost),
            format!("{:.2}", c.setup_cost),
            format!("{:.2}", c.finishing_cost),
            format!("{:.2}", c.overhead_cost),
            format!("{:.2}", c.volume_discount),
            format!("{:.2}", c.total_cost_per_part),
            format!("{:.2}", c.total_cost),
        ]);
    }
    table
}
