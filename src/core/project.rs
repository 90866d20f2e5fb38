//! Project discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::rulebook::RuleBook;

/// Name of the per-project settings directory
pub const PROJECT_DIR: &str = ".dfm";

/// A directory tree containing a `.dfm/` folder
#[derive(Debug)]
pub struct Project {
    /// Root directory of the project (parent of .dfm/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current =
            std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create `.dfm/` with a commented config and the built-in rule book
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if root.join(PROJECT_DIR).exists() {
            return Err(ProjectError::AlreadyExists(root));
        }
        Self::write_structure(root)
    }

    /// Initialize even if `.dfm/` exists, overwriting config and rules
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self::write_structure(root)
    }

    fn write_structure(root: PathBuf) -> Result<Self, ProjectError> {
        let project = Self { root };
        let dir = project.dfm_dir();

        std::fs::create_dir_all(project.cache_dir())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        std::fs::create_dir_all(project.reports_dir())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        std::fs::write(dir.join("config.yaml"), Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        std::fs::write(project.rules_path(), RuleBook::default().to_yaml())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        std::fs::write(dir.join(".gitignore"), "cache/\n")
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        Ok(project)
    }

    fn default_config() -> &'static str {
        r#"# DFM project configuration
# Values here override ~/.config/dfm/config.yaml; DFM_* environment
# variables override both.

# Shared secret required by `dfm analyze` and `dfm batch`
# api_key: ""

# Result cache location and lifetime (default: .dfm/cache, 24 hours)
# cache_dir: ""
# cache_ttl_hours: 24

# Worker threads for batch analysis
# workers: 4

# Defaults for requests that omit them
# default_material: abs
# default_process: injection_molding
# default_production_volume: 1000

# Default output format (auto, yaml, json, tsv, csv, md)
# default_format: auto
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .dfm configuration directory
    pub fn dfm_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.dfm_dir().join("config.yaml")
    }

    pub fn rules_path(&self) -> PathBuf {
        self.dfm_dir().join("rules.yaml")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.dfm_dir().join("cache")
    }

    /// Where `dfm analyze --save` writes responses
    pub fn reports_dir(&self) -> PathBuf {
        self.dfm_dir().join("reports")
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not a DFM project (searched from {searched_from:?}). Run 'dfm init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("DFM project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}
