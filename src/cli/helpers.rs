//! Shared helper functions for CLI commands
//!
//! Project and config discovery, service construction and request input
//! are needed by most commands, so they live here.

use console::style;
use miette::{IntoDiagnostic, Result};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::analysis::{AnalysisService, DfmEngine};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::cache::ResultCache;
use crate::core::project::Project;
use crate::core::rulebook::RuleBook;
use crate::core::Config;
use crate::entities::issue::Severity;
use crate::entities::process::{Material, Process};
use crate::entities::request::AnalyzeRequest;
use crate::entities::response::Rating;
use crate::entities::shape::ShapeDocument;

/// Project (if any) and the merged configuration
pub struct Context {
    pub project: Option<Project>,
    pub config: Config,
}

impl Context {
    /// Discover the project from `--project` or the working directory
    pub fn load(global: &GlobalOpts) -> Result<Self> {
        let project = match &global.project {
            Some(path) => Some(Project::discover_from(path).map_err(|e| miette::miette!("{}", e))?),
            None => Project::discover().ok(),
        };
        let config = Config::load_with_project(project.as_ref());
        Ok(Self { project, config })
    }

    pub fn rulebook(&self) -> Result<RuleBook> {
        let rules = self.config.rulebook(self.project.as_ref())?;
        for problem in rules.problems() {
            tracing::warn!(problem = %problem, "Rule book inconsistency");
        }
        Ok(rules)
    }

    pub fn cache(&self) -> Result<ResultCache> {
        let dir = self.config.cache_dir(self.project.as_ref());
        Ok(ResultCache::open(dir, self.config.cache_ttl())?)
    }

    /// Service with the configured key, cache and worker count
    pub fn service(&self, use_cache: bool) -> Result<AnalysisService> {
        let cache = if use_cache {
            match self.cache() {
                Ok(cache) => Some(cache),
                Err(e) => {
                    tracing::warn!(error = %e, "Result cache unavailable, continuing without it");
                    None
                }
            }
        } else {
            None
        };
        Ok(
            AnalysisService::new(self.rulebook()?, cache, self.config.api_key.clone())
                .with_workers(self.config.workers()),
        )
    }

    /// `--format`, falling back to the configured default
    pub fn format(&self, global: &GlobalOpts) -> OutputFormat {
        if global.format != OutputFormat::Auto {
            return global.format;
        }
        self.config
            .default_format
            .as_deref()
            .and_then(|f| f.parse().ok())
            .unwrap_or(OutputFormat::Auto)
    }
}

/// Where a command takes its part from
#[derive(clap::Args, Debug, Clone)]
pub struct InputArgs {
    /// Request JSON file (omit or "-" to read stdin)
    pub request: Option<PathBuf>,

    /// Build the request from a shape document instead
    #[arg(long, conflicts_with = "request")]
    pub shape: Option<PathBuf>,

    /// Material (overrides the request)
    #[arg(long, short = 'm')]
    pub material: Option<Material>,

    /// Manufacturing process (overrides the request)
    #[arg(long, short = 'p')]
    pub process: Option<Process>,

    /// Production volume (overrides the request)
    #[arg(long)]
    pub volume: Option<u32>,
}

impl InputArgs {
    /// Resolve the request, applying flag overrides and config defaults
    pub fn load(&self, ctx: &Context, rules: &RuleBook) -> Result<AnalyzeRequest> {
        let mut request = match &self.shape {
            Some(path) => {
                let document = ShapeDocument::load(path)?;
                let mut request = DfmEngine::new(rules).request_for(
                    &document,
                    self.material.unwrap_or_else(|| ctx.config.material()),
                    self.process.unwrap_or_else(|| ctx.config.process()),
                )?;
                request.production_volume = ctx.config.production_volume();
                request
            }
            None => read_request(self.request.as_deref())?,
        };

        if let Some(material) = self.material {
            request.material = material;
        }
        if let Some(process) = self.process {
            request.process = process;
        }
        if let Some(volume) = self.volume {
            request.production_volume = volume;
        }
        Ok(request)
    }
}

/// Read one request from a file, or stdin for `None` and "-"
pub fn read_request(path: Option<&Path>) -> Result<AnalyzeRequest> {
    let (contents, origin) = match path {
        Some(p) if p.as_os_str() != "-" => (
            std::fs::read_to_string(p)
                .map_err(|e| miette::miette!("Cannot read {}: {}", p.display(), e))?,
            p.display().to_string(),
        ),
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).into_diagnostic()?;
            (buf, "stdin".to_string())
        }
    };
    parse_request(&contents, &origin)
}

pub fn parse_request(contents: &str, origin: &str) -> Result<AnalyzeRequest> {
    serde_json::from_str(contents)
        .map_err(|e| miette::miette!("Invalid request in {}: {}", origin, e))
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

pub fn styled_severity(severity: Severity) -> String {
    let text = severity.to_string();
    match severity {
        Severity::Critical => style(text).red().bold().to_string(),
        Severity::High => style(text).red().to_string(),
        Severity::Medium => style(text).yellow().to_string(),
        Severity::Low => style(text).cyan().to_string(),
        Severity::Info => style(text).dim().to_string(),
    }
}

pub fn styled_rating(rating: Rating) -> String {
    let text = rating.to_string();
    match rating {
        Rating::Excellent => style(text).green().bold().to_string(),
        Rating::Good => style(text).green().to_string(),
        Rating::Fair => style(text).yellow().to_string(),
        Rating::Poor => style(text).red().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
        assert_eq!(truncate_str("ääääää", 5), "ää...");
    }

    #[test]
    fn test_parse_request_defaults() {
        let req = parse_request(
            r#"{"cad_data": {"dimensions": {"length": 10, "width": 5, "height": 2}}}"#,
            "test",
        )
        .unwrap();
        assert_eq!(req.material, Material::Abs);
        assert_eq!(req.production_volume, 1000);
        assert!(req.advanced_analysis);
        assert_eq!(req.cad_data.part_name(), "Unknown Part");
    }

    #[test]
    fn test_parse_request_rejects_garbage() {
        let err = parse_request("{", "broken.json").unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_format_falls_back_to_config() {
        let ctx = Context {
            project: None,
            config: Config {
                default_format: Some("json".to_string()),
                ..Default::default()
            },
        };
        let global = GlobalOpts {
            format: OutputFormat::Auto,
            quiet: false,
            verbose: false,
            project: None,
            api_key: None,
        };
        assert_eq!(ctx.format(&global), OutputFormat::Json);

        let explicit = GlobalOpts {
            format: OutputFormat::Csv,
            ..global
        };
        assert_eq!(ctx.format(&explicit), OutputFormat::Csv);
    }
}
