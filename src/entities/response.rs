//! The `/analyze` response contract

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::issue::{ManufacturingIssue, Severity};
use crate::entities::process::Process;

/// Score bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Poor,
    #[default]
    Fair,
    Good,
    Excellent,
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rating::Excellent => write!(f, "excellent"),
            Rating::Good => write!(f, "good"),
            Rating::Fair => write!(f, "fair"),
            Rating::Poor => write!(f, "poor"),
        }
    }
}

/// Per-part cost breakdown in USD
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostAnalysis {
    pub material_cost: f64,
    pub labor_cost: f64,
    /// One-off tooling investment
    pub tooling_cost: f64,
    /// One-off setup cost
    pub setup_cost: f64,
    pub finishing_cost: f64,
    pub overhead_cost: f64,
    /// Multiplier applied for the production volume tier
    pub volume_discount: f64,
    pub total_cost_per_part: f64,
    /// Per-part cost times production volume
    pub total_cost: f64,
    pub production_volume: u32,
}

/// How well one process fits the part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSuitability {
    pub process: Process,
    pub suitability_score: f64,
    pub rating: Rating,
    pub estimated_unit_cost: f64,
    /// Calendar days
    pub estimated_lead_time: u32,
    pub advantages: Vec<String>,
    pub limitations: Vec<String>,
}

/// Complexity indicators attached to a response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplexityReport {
    pub score: f64,
    pub rating: String,
    pub implications: Vec<String>,
    pub surface_to_volume_ratio: f64,
    pub feature_density: f64,
    pub feature_complexity_rating: String,
    /// 1 (hard to mold) to 10 (easy to mold)
    pub moldability_score: f64,
}

/// Full analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub analysis_id: String,
    pub part_name: String,
    pub created_at: DateTime<Utc>,
    pub manufacturability_score: f64,
    pub overall_rating: Rating,
    pub primary_process: ProcessSuitability,
    pub manufacturing_issues: Vec<ManufacturingIssue>,
    pub cost_analysis: CostAnalysis,
    pub process_recommendations: Vec<ProcessSuitability>,
    #[serde(default)]
    pub expert_recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<ComplexityReport>,
    #[serde(default)]
    pub processing_time_ms: f64,
    /// Served from the result cache
    #[serde(default)]
    pub cached: bool,
    /// Produced by the fallback path after a pipeline failure
    #[serde(default)]
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResponse {
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.manufacturing_issues
            .iter()
            .filter(|i| i.severity == severity)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_order_and_display() {
        assert!(Rating::Excellent > Rating::Good);
        assert!(Rating::Fair > Rating::Poor);
        assert_eq!(Rating::Good.to_string(), "good");
        assert_eq!(serde_json::to_string(&Rating::Poor).unwrap(), "\"poor\"");
    }
}
