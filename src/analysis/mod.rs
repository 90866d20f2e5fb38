//! The DFM analysis pipeline
//!
//! Geometry flows one way: a shape document is summarized, its faces are
//! classified into feature candidates, the rule evaluator turns geometry
//! into issues, and the scorer, estimator and recommendation builder
//! reduce those issues into a response. [`AnalysisService`] wraps the
//! pipeline with authorization, caching and a batch worker pool.

pub mod complexity;
pub mod engine;
pub mod estimator;
pub mod features;
pub mod raycast;
pub mod recommendations;
pub mod rules;
pub mod scoring;
pub mod service;
pub mod summarizer;

pub use engine::{DfmEngine, Inspection};
pub use estimator::Estimator;
pub use features::FeatureDetector;
pub use raycast::{BruteForceCaster, RayCaster};
pub use rules::{AnalysisInput, RuleEvaluator};
pub use service::{AnalysisService, BatchReport, MetricsSnapshot};
pub use summarizer::{summarize, summarize_shape};
