//! `dfm cache` command - inspect and maintain the result cache

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::Context;
use crate::cli::output;
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show cache location, size and entry counts
    Status,

    /// Remove every cached response
    Clear,

    /// Remove expired responses only
    Prune,
}

pub fn run(cmd: CacheCommands, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    match cmd {
        CacheCommands::Status => run_status(&ctx, global),
        CacheCommands::Clear => {
            let removed = ctx.cache()?.clear()?;
            println!("{} Cleared {} cached result(s)", style("✓").green(), removed);
            Ok(())
        }
        CacheCommands::Prune => {
            let removed = ctx.cache()?.prune()?;
            println!("{} Pruned {} expired result(s)", style("✓").green(), removed);
            Ok(())
        }
    }
}

fn run_status(ctx: &Context, global: &GlobalOpts) -> Result<()> {
    let cache = ctx.cache()?;
    let stats = cache.stats()?;

    let format = ctx.format(global);
    if matches!(format, OutputFormat::Yaml | OutputFormat::Json) {
        if let Some(text) = output::structured(&stats, format)? {
            print!("{}", text);
        }
        return Ok(());
    }

    println!("{}", style("Cache Status").bold());
    println!("{}", style("─".repeat(40)).dim());
    println!("  Location:   {}", cache.dir().display());
    println!("  TTL:        {} h", cache.ttl().as_secs() / 3600);
    println!("  Entries:    {}", style(stats.entries).cyan());
    if stats.expired > 0 {
        println!("  Expired:    {}", style(stats.expired).yellow());
    }
    println!("  Size:       {} KB", style(stats.total_bytes / 1024).cyan());
    if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
        println!("  Oldest:     {}", oldest.format("%Y-%m-%d %H:%M:%S"));
        println!("  Newest:     {}", newest.format("%Y-%m-%d %H:%M:%S"));
    }
    Ok(())
}
