//! Core module - project layout, configuration, rule book and cache

pub mod cache;
pub mod config;
pub mod error;
pub mod project;
pub mod rulebook;

pub use cache::{CacheStats, ResultCache};
pub use config::Config;
pub use error::{DfmError, DfmResult};
pub use project::{Project, ProjectError};
pub use rulebook::RuleBook;
