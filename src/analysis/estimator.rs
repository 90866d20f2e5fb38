//! Cost and process estimation
//!
//! Closed-form cost models and suitability penalties, all read from the
//! rule book. Nothing here is simulated.

use tracing::debug;

use crate::analysis::rules::{AnalysisInput, RuleEvaluator};
use crate::analysis::scoring::{self, round1};
use crate::core::error::DfmResult;
use crate::core::rulebook::{CostModel, LaborModel, RuleBook, ToolingModel};
use crate::entities::geometry::GeometrySummary;
use crate::entities::process::{Material, Process};
use crate::entities::response::{CostAnalysis, ProcessSuitability};

/// Lowest unit cost ever quoted
const MIN_UNIT_COST: f64 = 1.0;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Cost, lead time and suitability estimator
pub struct Estimator<'a> {
    rules: &'a RuleBook,
}

impl<'a> Estimator<'a> {
    pub fn new(rules: &'a RuleBook) -> Self {
        Self { rules }
    }

    /// Per-part cost breakdown for a process and production volume
    pub fn cost_analysis(
        &self,
        summary: &GeometrySummary,
        material: Material,
        process: Process,
        production_volume: u32,
    ) -> CostAnalysis {
        let model = self.rules.cost_model(process);
        let volume = production_volume.max(1) as f64;
        let cm3 = summary.volume_cm3();

        let material_cost = cm3
            * self.rules.material_rate(material)
            * model.material_factor
            * model.waste_factor;
        let labor_cost = labor_cost(model, summary);
        let tooling_cost = tooling_cost(model, summary);
        let overhead_cost = model.overhead_rate * (material_cost + labor_cost);
        let volume_discount = volume_discount(model, production_volume);

        let per_part = (material_cost
            + labor_cost
            + tooling_cost / volume
            + model.setup_cost / volume
            + model.finishing_cost
            + overhead_cost)
            * volume_discount;

        debug!(
            process = %process,
            material = %material,
            per_part,
            "Estimated cost"
        );

        CostAnalysis {
            material_cost: round2(material_cost),
            labor_cost: round2(labor_cost),
            tooling_cost: round2(tooling_cost),
            setup_cost: round2(model.setup_cost),
            finishing_cost: round2(model.finishing_cost),
            overhead_cost: round2(overhead_cost),
            volume_discount,
            total_cost_per_part: round2(per_part),
            total_cost: round2(per_part * volume),
            production_volume,
        }
    }

    /// Unit cost quoted in process recommendations
    pub fn unit_cost(
        &self,
        summary: &GeometrySummary,
        material: Material,
        process: Process,
        production_volume: u32,
    ) -> f64 {
        self.cost_analysis(summary, material, process, production_volume)
            .total_cost_per_part
            .max(MIN_UNIT_COST)
    }

    /// Manufacturability score adjusted for material, volume and size fit
    pub fn suitability_score(&self, input: &AnalysisInput<'_>, manufacturability: f64) -> f64 {
        let tables = &self.rules.suitability;
        let mut score = manufacturability;

        if !self.rules.is_compatible(input.material, input.process) {
            score *= tables.incompatible_material_factor;
        }
        score *= tables
            .volume
            .get(&input.process)
            .map(|v| v.factor(input.production_volume))
            .unwrap_or(tables.default_volume_factor);
        score *= tables
            .size
            .get(&input.process)
            .map(|s| s.factor(input.summary.bounding_box.max()))
            .unwrap_or(tables.default_size_factor);

        round1(score.clamp(0.0, 100.0))
    }

    /// Suitability of the input's own process given its manufacturability score
    pub fn suitability(&self, input: &AnalysisInput<'_>, manufacturability: f64) -> ProcessSuitability {
        let process = input.process;
        let score = self.suitability_score(input, manufacturability);
        ProcessSuitability {
            process,
            suitability_score: score,
            rating: scoring::rate(score, self.rules),
            estimated_unit_cost: self.unit_cost(
                &input.summary,
                input.material,
                process,
                input.production_volume,
            ),
            estimated_lead_time: self.rules.lead_time_days(process, input.production_volume),
            advantages: process.advantages().iter().map(|s| s.to_string()).collect(),
            limitations: process.limitations().iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Evaluate every candidate process and rank by descending suitability
    pub fn rank(&self, input: &AnalysisInput<'_>) -> DfmResult<Vec<ProcessSuitability>> {
        let evaluator = RuleEvaluator::new(self.rules);
        let mut ranked = Vec::with_capacity(self.rules.candidate_processes.len());

        for &process in &self.rules.candidate_processes {
            let candidate = input.with_process(process);
            let issues = evaluator.evaluate(&candidate)?;
            let score = scoring::score(&issues, self.rules);
            ranked.push(self.suitability(&candidate, score));
        }

        ranked.sort_by(|a, b| b.suitability_score.total_cmp(&a.suitability_score));
        Ok(ranked)
    }
}

fn labor_cost(model: &CostModel, summary: &GeometrySummary) -> f64 {
    let faces = summary.face_count as f64;
    match model.labor {
        LaborModel::MoldCycle {
            base_cycle_seconds,
            reference_volume,
            face_divisor,
        } => {
            let seconds =
                base_cycle_seconds * summary.volume / reference_volume * (1.0 + faces / face_divisor);
            seconds / 3600.0 * model.machine_rate
        }
        LaborModel::Machining {
            base_hours,
            reference_volume,
            face_divisor,
        } => {
            let hours = base_hours * summary.volume / reference_volume * (1.0 + faces / face_divisor);
            hours * model.machine_rate
        }
        LaborModel::Additive {
            deposition_rate_cm3_per_hour,
            attendance,
        } => {
            let hours = summary.volume_cm3() / deposition_rate_cm3_per_hour;
            hours * model.machine_rate * attendance
        }
        LaborModel::Flat { cost_per_part } => cost_per_part,
    }
}

fn tooling_cost(model: &CostModel, summary: &GeometrySummary) -> f64 {
    match model.tooling {
        ToolingModel::Mold {
            base_cost,
            reference_faces,
            face_divisor,
            max_complexity_factor,
            reference_size,
            min_size_factor,
            max_size_factor,
            complexity_factor,
        } => {
            let faces = summary.face_count as f64;
            // max/min rather than clamp: hand-edited bounds may be inverted
            let complexity = (1.0 + (faces - reference_faces) / face_divisor)
                .max(1.0)
                .min(max_complexity_factor);
            let size = (summary.bounding_box.max() / reference_size)
                .max(min_size_factor)
                .min(max_size_factor);
            base_cost * complexity * size * complexity_factor
        }
        ToolingModel::Fixture {
            fixture_cost,
            programming_cost,
        } => fixture_cost + programming_cost,
        ToolingModel::Flat { cost } => cost,
    }
}

/// Factor of the highest tier at or below the production volume
fn volume_discount(model: &CostModel, production_volume: u32) -> f64 {
    model
        .volume_discounts
        .iter()
        .filter(|t| t.min_volume <= production_volume)
        .max_by_key(|t| t.min_volume)
        .map(|t| t.factor)
        .unwrap_or(1.0)
}
