//! Data types of the analysis contract
//!
//! **Geometry input:**
//! - [`ShapeDocument`] - CAD document exported by the host kernel
//! - [`GeometrySummary`] - scalar metrics of one shape
//! - [`FeatureSet`] - multi-label face classification
//!
//! **Request and response:**
//! - [`AnalyzeRequest`] - body of an `/analyze` call
//! - [`ManufacturingIssue`] - one DFM finding
//! - [`AnalysisResponse`] - score, issues, costs and recommendations

pub mod feature;
pub mod geometry;
pub mod issue;
pub mod process;
pub mod request;
pub mod response;
pub mod shape;

pub use feature::{FeatureKind, FeatureSet};
pub use geometry::{Dimensions, GeometrySummary};
pub use issue::{IssueKind, ManufacturingIssue, Severity};
pub use process::{Material, Process, ProcessFamily};
pub use request::{AnalyzeRequest, CadData, CadFeatures};
pub use response::{AnalysisResponse, CostAnalysis, ProcessSuitability, Rating};
pub use shape::{Shape, ShapeDocument};
