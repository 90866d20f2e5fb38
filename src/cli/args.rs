//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    analyze::AnalyzeArgs, batch::BatchArgs, cache::CacheCommands, completions::CompletionsArgs,
    config::ConfigCommands, cost::CostArgs, features::FeaturesArgs, init::InitArgs,
    processes::ProcessesArgs, rules::RulesCommands,
};

#[derive(Parser)]
#[command(name = "dfm")]
#[command(author, version, about = "DFM Co-Pilot")]
#[command(long_about = "Design-for-manufacturing analysis: scores CAD parts against process rules, estimates cost and ranks manufacturing processes.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .dfm/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    /// API key presented to the analysis service
    #[arg(long, global = true)]
    pub api_key: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new DFM project
    Init(InitArgs),

    /// Analyze one part
    Analyze(AnalyzeArgs),

    /// Analyze many request files on the worker pool
    Batch(BatchArgs),

    /// Summarize a shape document and list feature candidates
    Features(FeaturesArgs),

    /// Cost breakdown for a part and process
    Cost(CostArgs),

    /// Rank candidate processes for a part
    Processes(ProcessesArgs),

    /// Result cache maintenance
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Inspect the rule book in effect
    #[command(subcommand)]
    Rules(RulesCommands),

    /// View and edit configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable summary with tables
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true)
    }
}
