//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::project::Project;
use crate::core::rulebook::RuleBook;
use crate::entities::process::{Material, Process};
use crate::yaml::{read_yaml, YamlError};

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_CACHE_TTL_HOURS: u64 = 24;

/// DFM configuration with layered hierarchy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shared secret expected from API clients
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Result cache directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_ttl_hours: Option<u64>,

    /// Batch worker threads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    /// Rule book overriding the built-in tables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_file: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_material: Option<Material>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_process: Option<Process>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_production_volume: Option<u32>,

    /// Default output format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_format: Option<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let project = Project::discover().ok();
        Self::load_with_project(project.as_ref())
    }

    /// Same as `load`, with an explicit project (or none)
    pub fn load_with_project(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/dfm/config.yaml)
        if let Some(global) = Self::global_config_path().and_then(|p| Self::read_layer(&p)) {
            config.merge(global);
        }

        // 3. Project config (.dfm/config.yaml)
        if let Some(project_config) = project.and_then(|p| Self::read_layer(&p.config_path())) {
            config.merge(project_config);
        }

        // 4. Environment variables
        config.merge(Self::from_env());

        config
    }

    /// A config file layer; unreadable files are skipped with a warning
    fn read_layer(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        match read_yaml::<Config>(path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring invalid config file");
                None
            }
        }
    }

    fn from_env() -> Config {
        let mut config = Config {
            api_key: std::env::var("DFM_API_KEY").ok(),
            cache_dir: std::env::var_os("DFM_CACHE_DIR").map(PathBuf::from),
            rules_file: std::env::var_os("DFM_RULES").map(PathBuf::from),
            ..Default::default()
        };
        if let Ok(workers) = std::env::var("DFM_WORKERS") {
            match workers.parse() {
                Ok(n) => config.workers = Some(n),
                Err(_) => tracing::warn!(value = %workers, "DFM_WORKERS is not a number"),
            }
        }
        if let Ok(ttl) = std::env::var("DFM_CACHE_TTL_HOURS") {
            match ttl.parse() {
                Ok(n) => config.cache_ttl_hours = Some(n),
                Err(_) => tracing::warn!(value = %ttl, "DFM_CACHE_TTL_HOURS is not a number"),
            }
        }
        config
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "dfm").map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Config) {
        if other.api_key.is_some() {
            self.api_key = other.api_key;
        }
        if other.cache_dir.is_some() {
            self.cache_dir = other.cache_dir;
        }
        if other.cache_ttl_hours.is_some() {
            self.cache_ttl_hours = other.cache_ttl_hours;
        }
        if other.workers.is_some() {
            self.workers = other.workers;
        }
        if other.rules_file.is_some() {
            self.rules_file = other.rules_file;
        }
        if other.default_material.is_some() {
            self.default_material = other.default_material;
        }
        if other.default_process.is_some() {
            self.default_process = other.default_process;
        }
        if other.default_production_volume.is_some() {
            self.default_production_volume = other.default_production_volume;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
    }

    /// Batch worker count, at least one
    pub fn workers(&self) -> usize {
        self.workers.unwrap_or(DEFAULT_WORKERS).max(1)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours.unwrap_or(DEFAULT_CACHE_TTL_HOURS) * 3600)
    }

    /// Configured directory, else the project's, else the user cache directory
    pub fn cache_dir(&self, project: Option<&Project>) -> PathBuf {
        if let Some(ref dir) = self.cache_dir {
            return dir.clone();
        }
        if let Some(project) = project {
            return project.cache_dir();
        }
        directories::ProjectDirs::from("", "", "dfm")
            .map(|dirs| dirs.cache_dir().join("results"))
            .unwrap_or_else(|| std::env::temp_dir().join("dfm-cache"))
    }

    /// Rule book file in effect, if any
    pub fn rules_path(&self, project: Option<&Project>) -> Option<PathBuf> {
        if let Some(ref path) = self.rules_file {
            return Some(path.clone());
        }
        project.map(|p| p.rules_path()).filter(|p| p.exists())
    }

    /// Load the rule book in effect, or the built-in tables
    pub fn rulebook(&self, project: Option<&Project>) -> Result<RuleBook, YamlError> {
        match self.rules_path(project) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading rule book");
                RuleBook::load(&path)
            }
            None => Ok(RuleBook::default()),
        }
    }

    pub fn material(&self) -> Material {
        self.default_material.unwrap_or_default()
    }

    pub fn process(&self) -> Process {
        self.default_process.unwrap_or_default()
    }

    pub fn production_volume(&self) -> u32 {
        self.default_production_volume.unwrap_or(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_merge_prefers_other() {
        let mut base = Config {
            workers: Some(2),
            api_key: Some("old".to_string()),
            ..Default::default()
        };
        base.merge(Config {
            api_key: Some("new".to_string()),
            ..Default::default()
        });
        assert_eq!(base.api_key.as_deref(), Some("new"));
        assert_eq!(base.workers, Some(2));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.workers(), 4);
        assert_eq!(config.cache_ttl(), Duration::from_secs(24 * 3600));
        assert_eq!(config.material(), Material::Abs);
        assert_eq!(config.process(), Process::InjectionMolding);
        assert_eq!(config.production_volume(), 1000);
    }

    #[test]
    fn test_workers_never_zero() {
        let config = Config {
            workers: Some(0),
            ..Default::default()
        };
        assert_eq!(config.workers(), 1);
    }

    #[test]
    fn test_project_layer_and_paths() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        std::fs::write(
            project.config_path(),
            "workers: 8\ndefault_material: aluminum\ndefault_process: cnc_milling\n",
        )
        .unwrap();

        let layer = Config::read_layer(&project.config_path()).unwrap();
        assert_eq!(layer.workers, Some(8));
        assert_eq!(layer.default_material, Some(Material::Aluminum));
        assert_eq!(layer.default_process, Some(Process::CncMilling));

        let config = Config::default();
        assert_eq!(config.cache_dir(Some(&project)), project.cache_dir());
        assert_eq!(config.rules_path(Some(&project)), Some(project.rules_path()));
        assert!(config.rulebook(Some(&project)).is_ok());
    }

    #[test]
    fn test_invalid_layer_is_skipped() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.yaml");
        std::fs::write(&path, "workers: [1, 2\n").unwrap();
        assert!(Config::read_layer(&path).is_none());
    }

    #[test]
    fn test_missing_rules_file_is_an_error() {
        let config = Config {
            rules_file: Some(PathBuf::from("/nonexistent/rules.yaml")),
            ..Default::default()
        };
        assert!(config.rulebook(None).is_err());
    }
}
