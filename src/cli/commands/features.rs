//! `dfm features` command - geometry summary and feature candidates

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::analysis::{DfmEngine, Inspection};
use crate::cli::helpers::Context;
use crate::cli::output::{self, Table};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::entities::shape::ShapeDocument;

#[derive(clap::Args, Debug)]
pub struct FeaturesArgs {
    /// Shape document (JSON, or YAML by extension)
    pub document: PathBuf,
}

pub fn run(args: FeaturesArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let rules = ctx.rulebook()?;
    let document = ShapeDocument::load(&args.document)?;
    let inspection = DfmEngine::new(&rules).inspect(&document)?;

    let format = ctx.format(global);
    let table = face_table(&inspection);
    match format {
        OutputFormat::Auto => {
            if !global.quiet {
                print_summary(&inspection);
            }
            if table.is_empty() {
                println!("{} No feature candidates", style("-").dim());
            } else {
                print!("{}", table.render(format)?);
            }
        }
        _ => output::emit(&inspection, &table, format)?,
    }
    Ok(())
}

fn face_table(inspection: &Inspection) -> Table {
    let mut table = Table::new(["Face", "Kinds"]);
    for (face, kinds) in &inspection.features.map {
        let kinds: Vec<String> = kinds.iter().map(|k| k.to_string()).collect();
        table.push([face.to_string(), kinds.join(",")]);
    }
    table
}

fn print_summary(inspection: &Inspection) {
    let s = &inspection.summary;
    let d = s.bounding_box;
    println!("{}", style(&inspection.part_name).bold());
    println!(
        "  {} {:.1} × {:.1} × {:.1} mm",
        style("Bounding box:").dim(),
        d.length,
        d.width,
        d.height
    );
    println!(
        "  {} {:.1} mm³   {} {:.1} mm²",
        style("Volume:").dim(),
        s.volume,
        style("Area:").dim(),
        s.surface_area
    );
    println!(
        "  {} {}   {} {}   {} {}",
        style("Faces:").dim(),
        s.face_count,
        style("Edges:").dim(),
        s.edge_count,
        style("Vertices:").dim(),
        s.vertex_count
    );

    let counts = inspection.features.counts();
    println!(
        "  {} {} holes, {} fillets, {} chamfers, {} thin walls, {} ribs",
        style("Candidates:").dim(),
        counts.holes,
        counts.fillets,
        counts.chamfers,
        counts.thin_walls,
        counts.ribs
    );
    if let Some(min) = inspection.features.min_wall_thickness() {
        println!("  {} {:.2} mm", style("Min wall:").dim(), min);
    }
    println!();
}
