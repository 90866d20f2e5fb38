//! `dfm init` command - Initialize a new DFM project

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::cli::GlobalOpts;
use crate::core::project::{Project, ProjectError, PROJECT_DIR};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Overwrite config and rules even if .dfm/ already exists
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs, global: &GlobalOpts) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        if !global.quiet {
            println!(
                "{} Created directory {}",
                style("✓").green(),
                style(path.display()).cyan()
            );
        }
    }

    let project = if args.force {
        Project::init_force(&path)
    } else {
        Project::init(&path)
    };

    match project {
        Ok(project) => {
            if global.quiet {
                return Ok(());
            }
            println!(
                "{} Initialized DFM project at {}",
                style("✓").green(),
                style(project.root().display()).cyan()
            );
            println!();
            println!("Created project structure:");
            print_structure(project.root());
            println!();
            println!("Next steps:");
            println!(
                "  {} Analyze a part request",
                style("dfm analyze part.json").yellow()
            );
            println!(
                "  {} Analyze a CAD export",
                style("dfm analyze --shape part.shape.json").yellow()
            );
            println!(
                "  {} Review the rule book",
                style("dfm rules show").yellow()
            );
            Ok(())
        }
        Err(ProjectError::AlreadyExists(path)) => {
            println!(
                "{} DFM project already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!("Use {} to reinitialize", style("dfm init --force").yellow());
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}

fn print_structure(root: &Path) {
    let entries = [
        format!("{}/config.yaml", PROJECT_DIR),
        format!("{}/rules.yaml", PROJECT_DIR),
        format!("{}/cache/", PROJECT_DIR),
        format!("{}/reports/", PROJECT_DIR),
    ];

    for entry in &entries {
        if root.join(entry).exists() {
            println!("  {}", style(entry).dim());
        }
    }
}
