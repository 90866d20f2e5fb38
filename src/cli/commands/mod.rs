//! CLI command implementations

pub mod analyze;
pub mod batch;
pub mod cache;
pub mod completions;
pub mod config;
pub mod cost;
pub mod features;
pub mod init;
pub mod processes;
pub mod rules;
