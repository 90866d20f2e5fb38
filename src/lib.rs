//! DFM Co-Pilot: design-for-manufacturing analysis
//!
//! Reduces CAD geometry to a manufacturability score, a list of issues,
//! cost estimates and ranked process recommendations. Every threshold
//! lives in a versioned [`core::RuleBook`].

pub mod analysis;
pub mod cli;
pub mod core;
pub mod entities;
pub mod logging;
pub mod yaml;
