//! `dfm config` command - Configuration management
//!
//! Provides commands to view and modify DFM configuration.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::helpers::Context;
use crate::cli::output;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::project::Project;
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration values
    Show(ShowArgs),

    /// Set a configuration value
    Set(SetArgs),

    /// Unset (remove) a configuration value
    Unset(UnsetArgs),

    /// Show paths to configuration files
    Path,

    /// List all available configuration keys
    Keys,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Configuration key (e.g., workers, default_material)
    pub key: String,

    /// Value to set
    pub value: String,

    /// Set in global (user) config instead of project config
    #[arg(long, short = 'g')]
    pub global: bool,
}

#[derive(clap::Args, Debug)]
pub struct UnsetArgs {
    /// Configuration key to remove
    pub key: String,

    /// Remove from global (user) config instead of project config
    #[arg(long, short = 'g')]
    pub global: bool,
}

/// Valid configuration keys
const VALID_KEYS: &[(&str, &str)] = &[
    ("api_key", "Shared secret required by analyze and batch"),
    ("cache_dir", "Result cache directory"),
    ("cache_ttl_hours", "Hours before a cached result expires"),
    ("workers", "Batch worker threads"),
    ("rules_file", "Rule book replacing the built-in tables"),
    ("default_material", "Material used with --shape (e.g. abs)"),
    ("default_process", "Process used with --shape (e.g. cnc_milling)"),
    ("default_production_volume", "Production volume used with --shape"),
    (
        "default_format",
        "Default output format (yaml, json, tsv, etc.)",
    ),
];

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => run_show(args, global),
        ConfigCommands::Set(args) => run_set(args, global),
        ConfigCommands::Unset(args) => run_unset(args, global),
        ConfigCommands::Path => run_path(global),
        ConfigCommands::Keys => run_keys(),
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = Context::load(global)?;
    let config = masked(&ctx.config);

    if let Some(key) = &args.key {
        check_key(key)?;
        return match config_value(&config, key)? {
            Some(v) => {
                println!("{}", v);
                Ok(())
            }
            None => Err(miette::miette!("Key '{}' is not set", key)),
        };
    }

    let format = ctx.format(global);
    if matches!(format, OutputFormat::Yaml | OutputFormat::Json) {
        if let Some(text) = output::structured(&config, format)? {
            print!("{}", text);
        }
        return Ok(());
    }

    println!("{}", style("Effective Configuration").bold().underlined());
    println!();
    for (key, _) in VALID_KEYS {
        let value = config_value(&config, key)?;
        print_config_value(key, value.as_deref());
    }

    println!();
    println!("{}", style("Config Sources (in priority order):").dim());
    println!("  1. Environment variables (DFM_API_KEY, DFM_WORKERS, DFM_CACHE_DIR, ...)");
    println!("  2. Project config (.dfm/config.yaml)");
    println!("  3. Global config (~/.config/dfm/config.yaml)");
    Ok(())
}

fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    check_key(&args.key)?;
    let config_path = target_path(args.global, global)?;

    let mut config_map = read_mapping(&config_path)?;
    let value: serde_yml::Value = serde_yml::from_str(&args.value)
        .unwrap_or_else(|_| serde_yml::Value::String(args.value.clone()));
    config_map.insert(serde_yml::Value::String(args.key.clone()), value);

    // Reject values the config layer would not load
    let check = serde_yml::Value::Mapping(config_map.clone());
    if let Err(e) = serde_yml::from_value::<Config>(check) {
        return Err(miette::miette!(
            "Invalid value '{}' for {}: {}",
            args.value,
            args.key,
            e
        ));
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).into_diagnostic()?;
    }
    let yaml = serde_yml::to_string(&config_map).into_diagnostic()?;
    fs::write(&config_path, yaml).into_diagnostic()?;

    let scope = if args.global { "global" } else { "project" };
    println!(
        "{} Set {} {} {} in {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        style("→").dim(),
        style(&args.value).yellow(),
        scope
    );
    Ok(())
}

fn run_unset(args: UnsetArgs, global: &GlobalOpts) -> Result<()> {
    check_key(&args.key)?;
    let config_path = target_path(args.global, global)?;
    if !config_path.exists() {
        return Err(miette::miette!(
            "Config file does not exist: {}",
            config_path.display()
        ));
    }

    let mut config_map = read_mapping(&config_path)?;
    if config_map.remove(args.key.as_str()).is_none() {
        return Err(miette::miette!("Key '{}' not found in config", args.key));
    }

    let yaml = serde_yml::to_string(&config_map).into_diagnostic()?;
    fs::write(&config_path, yaml).into_diagnostic()?;

    let scope = if args.global { "global" } else { "project" };
    println!(
        "{} Removed {} from {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        scope
    );
    Ok(())
}

fn run_path(global: &GlobalOpts) -> Result<()> {
    let global_path = Config::global_config_path()
        .ok_or_else(|| miette::miette!("Could not determine global config directory"))?;

    println!("{}", style("Configuration file paths:").bold());
    println!();
    println!("  {} {}", style("Global:").cyan(), global_path.display());
    print_exists(global_path.exists(), 9);

    println!();
    match project_for(global) {
        Ok(project) => {
            let path = project.config_path();
            println!("  {} {}", style("Project:").cyan(), path.display());
            print_exists(path.exists(), 10);
        }
        Err(_) => println!(
            "  {} {}",
            style("Project:").cyan(),
            style("(not in a DFM project)").dim()
        ),
    }
    Ok(())
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available configuration keys:").bold());
    println!();

    for (key, description) in VALID_KEYS {
        println!("  {:<26} {}", style(key).cyan(), style(description).dim());
    }

    println!();
    println!(
        "{}",
        style("Use 'dfm config set <key> <value>' to set a value.").dim()
    );
    Ok(())
}

// Helper functions

fn check_key(key: &str) -> Result<()> {
    if VALID_KEYS.iter().any(|(k, _)| *k == key) {
        Ok(())
    } else {
        Err(miette::miette!(
            "Unknown configuration key '{}'. Run 'dfm config keys' to list them.",
            key
        ))
    }
}

fn project_for(global: &GlobalOpts) -> Result<Project> {
    let project = match &global.project {
        Some(path) => Project::discover_from(path),
        None => Project::discover(),
    };
    project.map_err(|e| miette::miette!("{}", e))
}

fn target_path(use_global: bool, global: &GlobalOpts) -> Result<PathBuf> {
    if use_global {
        Config::global_config_path()
            .ok_or_else(|| miette::miette!("Could not determine global config directory"))
    } else {
        Ok(project_for(global)?.config_path())
    }
}

fn read_mapping(path: &std::path::Path) -> Result<serde_yml::Mapping> {
    if !path.exists() {
        return Ok(serde_yml::Mapping::new());
    }
    let content = fs::read_to_string(path).into_diagnostic()?;
    match serde_yml::from_str::<serde_yml::Value>(&content) {
        Ok(serde_yml::Value::Mapping(map)) => Ok(map),
        Ok(serde_yml::Value::Null) => Ok(serde_yml::Mapping::new()),
        Ok(_) => Err(miette::miette!(
            "{} does not contain a mapping",
            path.display()
        )),
        Err(e) => Err(miette::miette!("Cannot parse {}: {}", path.display(), e)),
    }
}

/// Copy of the config with the API key hidden
fn masked(config: &Config) -> Config {
    let mut config = config.clone();
    if let Some(ref key) = config.api_key {
        if !key.is_empty() {
            config.api_key = Some("********".to_string());
        }
    }
    config
}

fn config_value(config: &Config, key: &str) -> Result<Option<String>> {
    let value = serde_yml::to_value(config).into_diagnostic()?;
    Ok(value.get(key).and_then(|v| match v {
        serde_yml::Value::Null => None,
        serde_yml::Value::String(s) => Some(s.clone()),
        other => serde_yml::to_string(other)
            .ok()
            .map(|s| s.trim_end().to_string()),
    }))
}

fn print_config_value(key: &str, value: Option<&str>) {
    if let Some(v) = value {
        println!("  {}: {}", style(key).cyan(), style(v).yellow());
    } else {
        println!("  {}: {}", style(key).cyan(), style("(not set)").dim());
    }
}

fn print_exists(exists: bool, indent: usize) {
    let label = if exists {
        style("(exists)").green()
    } else {
        style("(not created)").dim()
    };
    println!("  {:indent$}{}", "", label, indent = indent);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::process::Material;

    #[test]
    fn test_masked_hides_api_key() {
        let config = Config {
            api_key: Some("secret".to_string()),
            ..Default::default()
        };
        assert_eq!(masked(&config).api_key.as_deref(), Some("********"));
        assert_eq!(masked(&Config::default()).api_key, None);
    }

    #[test]
    fn test_config_value_reads_enums_and_numbers() {
        let config = Config {
            workers: Some(8),
            default_material: Some(Material::Aluminum),
            ..Default::default()
        };
        assert_eq!(config_value(&config, "workers").unwrap().as_deref(), Some("8"));
        assert_eq!(
            config_value(&config, "default_material").unwrap().as_deref(),
            Some("aluminum")
        );
        assert_eq!(config_value(&config, "cache_dir").unwrap(), None);
    }

    #[test]
    fn test_check_key() {
        assert!(check_key("workers").is_ok());
        assert!(check_key("author").is_err());
    }

    #[test]
    fn test_read_mapping_missing_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let map = read_mapping(&tmp.path().join("config.yaml")).unwrap();
        assert!(map.is_empty());
    }
}
