//! `dfm rules` command - view and check the rule book in effect

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::Context;
use crate::cli::output;
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(Subcommand, Debug)]
pub enum RulesCommands {
    /// Print the rule book in effect
    Show,

    /// Print the path of the rule book file, if one is used
    Path,

    /// Check the rule book for inconsistencies
    Check,
}

pub fn run(cmd: RulesCommands, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    match cmd {
        RulesCommands::Show => {
            let rules = ctx.rulebook()?;
            match ctx.format(global) {
                OutputFormat::Json => {
                    if let Some(text) = output::structured(&rules, OutputFormat::Json)? {
                        print!("{}", text);
                    }
                }
                _ => print!("{}", rules.to_yaml()),
            }
            Ok(())
        }
        RulesCommands::Path => {
            match ctx.config.rules_path(ctx.project.as_ref()) {
                Some(path) => println!("{}", path.display()),
                None => println!("{}", style("(built-in rule book)").dim()),
            }
            Ok(())
        }
        RulesCommands::Check => run_check(&ctx),
    }
}

fn run_check(ctx: &Context) -> Result<()> {
    let rules = ctx.config.rulebook(ctx.project.as_ref())?;
    let problems = rules.problems();
    if problems.is_empty() {
        println!(
            "{} Rule book version {} is consistent",
            style("✓").green(),
            rules.version
        );
        return Ok(());
    }

    for problem in &problems {
        println!("{} {}", style("✗").red(), problem);
    }
    Err(miette::miette!(
        "{} problem(s) found in the rule book",
        problems.len()
    ))
}
