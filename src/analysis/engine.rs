//! The DFM pipeline: summarize, evaluate, score, estimate, recommend

use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};
use ulid::Ulid;

use crate::analysis::complexity;
use crate::analysis::estimator::Estimator;
use crate::analysis::features::FeatureDetector;
use crate::analysis::recommendations;
use crate::analysis::rules::{AnalysisInput, RuleEvaluator};
use crate::analysis::scoring::{self, round1};
use crate::analysis::summarizer;
use crate::core::error::{DfmError, DfmResult};
use crate::core::rulebook::RuleBook;
use crate::entities::feature::FeatureSet;
use crate::entities::geometry::GeometrySummary;
use crate::entities::process::{Material, Process};
use crate::entities::request::AnalyzeRequest;
use crate::entities::response::AnalysisResponse;
use crate::entities::shape::ShapeDocument;

/// Runs one analysis end to end against a rule book
pub struct DfmEngine<'a> {
    rules: &'a RuleBook,
}

impl<'a> DfmEngine<'a> {
    pub fn new(rules: &'a RuleBook) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleBook {
        self.rules
    }

    /// Analyze a request; errors are returned, not degraded
    pub fn analyze(&self, request: &AnalyzeRequest) -> DfmResult<AnalysisResponse> {
        let started = Instant::now();
        request.validate()?;

        let input = AnalysisInput::from_request(request);
        info!(
            part = request.cad_data.part_name(),
            material = %input.material,
            process = %input.process,
            volume = input.production_volume,
            "Analyzing part"
        );

        let issues = RuleEvaluator::new(self.rules).evaluate(&input)?;
        let score = round1(scoring::score(&issues, self.rules));
        debug!(issues = issues.len(), score, "Rules evaluated");

        let estimator = Estimator::new(self.rules);
        let primary_process = estimator.suitability(&input, score);
        let cost_analysis = estimator.cost_analysis(
            &input.summary,
            input.material,
            input.process,
            input.production_volume,
        );
        let process_recommendations = estimator.rank(&input)?;
        let complexity = complexity::assess(&input.summary, input.features, &self.rules.complexity);
        let expert_recommendations = recommendations::build(
            &issues,
            input.material,
            input.process,
            input.production_volume,
            self.rules,
        );

        let processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        info!(score, processing_time_ms, "Analysis complete");

        Ok(AnalysisResponse {
            analysis_id: Ulid::new().to_string(),
            part_name: request.cad_data.part_name().to_string(),
            created_at: Utc::now(),
            manufacturability_score: score,
            overall_rating: scoring::rate(score, self.rules),
            primary_process,
            manufacturing_issues: issues,
            cost_analysis,
            process_recommendations,
            expert_recommendations,
            complexity: Some(complexity),
            processing_time_ms,
            cached: false,
            degraded: false,
            error: None,
        })
    }

    /// Summarize a shape document and detect its features
    pub fn inspect(&self, document: &ShapeDocument) -> DfmResult<Inspection> {
        let summary = summarizer::summarize(Some(document))?;
        let features = match document.active().and_then(|o| o.shape.as_ref()) {
            Some(shape) => FeatureDetector::new(&self.rules.features).detect(shape, &summary),
            None => FeatureSet::default(),
        };
        Ok(Inspection {
            part_name: document.part_name(),
            summary,
            features,
        })
    }

    /// Build a request from a shape document
    pub fn request_for(
        &self,
        document: &ShapeDocument,
        material: Material,
        process: Process,
    ) -> DfmResult<AnalyzeRequest> {
        let inspection = self.inspect(document)?;
        if inspection.summary.is_empty() {
            return Err(DfmError::InvalidRequest(format!(
                "document '{}' has no geometry to analyze",
                document.name
            )));
        }
        Ok(AnalyzeRequest::from_geometry(
            inspection.part_name,
            &inspection.summary,
            &inspection.features,
            material,
            process,
        ))
    }
}

/// Geometry summary together with the detected feature candidates
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub part_name: String,
    pub summary: GeometrySummary,
    pub features: FeatureSet,
}
