//! Rule evaluator: per-process threshold checks that turn geometry into issues
//!
//! Evaluation is a pure function of the input and the rule book. Issues
//! come out in detection order: common checks, then process checks, then
//! the advanced checks.

use tracing::debug;

use crate::core::error::DfmResult;
use crate::core::rulebook::{ProcessConstraints, RuleBook};
use crate::entities::geometry::GeometrySummary;
use crate::entities::issue::{IssueKind, ManufacturingIssue, Severity};
use crate::entities::process::{Material, Process, ProcessFamily};
use crate::entities::request::{AnalyzeRequest, CadFeatures};

/// Everything a single evaluation looks at
#[derive(Debug, Clone)]
pub struct AnalysisInput<'a> {
    pub summary: GeometrySummary,
    pub features: &'a CadFeatures,
    pub material: Material,
    pub process: Process,
    pub production_volume: u32,
    pub advanced: bool,
}

impl<'a> AnalysisInput<'a> {
    pub fn from_request(request: &'a AnalyzeRequest) -> Self {
        Self {
            summary: request.cad_data.summary(),
            features: &request.cad_data.features,
            material: request.material,
            process: request.process,
            production_volume: request.production_volume,
            advanced: request.advanced_analysis,
        }
    }

    /// Same part and material evaluated for another process
    #[must_use]
    pub fn with_process(&self, process: Process) -> Self {
        Self {
            process,
            ..self.clone()
        }
    }
}

/// Resolved thresholds for one process
struct Limits {
    min_wall: f64,
    max_wall: f64,
    max_aspect: f64,
    min_hole: f64,
    max_hole_depth_ratio: f64,
}

impl Limits {
    fn resolve(rules: &RuleBook, c: &ProcessConstraints) -> Self {
        let d = &rules.check_defaults;
        Self {
            min_wall: c.min_wall_thickness.unwrap_or(d.min_wall_thickness),
            max_wall: c.max_wall_thickness.unwrap_or(d.max_wall_thickness),
            max_aspect: c.max_aspect_ratio.unwrap_or(d.max_aspect_ratio),
            min_hole: c.min_hole_diameter.unwrap_or(d.min_hole_diameter),
            max_hole_depth_ratio: c.max_hole_depth_ratio.unwrap_or(d.max_hole_depth_ratio),
        }
    }
}

/// Applies the rule book's checks to an analysis input
pub struct RuleEvaluator<'a> {
    rules: &'a RuleBook,
}

impl<'a> RuleEvaluator<'a> {
    pub fn new(rules: &'a RuleBook) -> Self {
        Self { rules }
    }

    /// Evaluate a request as submitted
    pub fn evaluate_request(&self, request: &AnalyzeRequest) -> DfmResult<Vec<ManufacturingIssue>> {
        self.evaluate(&AnalysisInput::from_request(request))
    }

    pub fn evaluate(&self, input: &AnalysisInput<'_>) -> DfmResult<Vec<ManufacturingIssue>> {
        let constraints = self.rules.constraints_for(input.process)?;
        let limits = Limits::resolve(self.rules, constraints);
        debug!(
            process = %input.process,
            material = %input.material,
            min_wall = limits.min_wall,
            max_wall = limits.max_wall,
            "Evaluating rules"
        );

        let mut issues = Vec::new();

        self.check_walls(input, &limits, &mut issues);
        let valid_box = self.check_aspect_ratio(input, &limits, &mut issues);
        self.check_holes(input, &limits, &mut issues);
        if valid_box {
            self.check_part_size(input, constraints, &mut issues);
        }

        match input.process.family() {
            ProcessFamily::Molding if input.process == Process::InjectionMolding => {
                self.check_injection_molding(input, constraints, valid_box, &mut issues)
            }
            ProcessFamily::Machining => {
                self.check_machining(input, constraints, valid_box, &mut issues)
            }
            ProcessFamily::Additive => {
                self.check_printing(input, constraints, valid_box, &mut issues)
            }
            _ => {}
        }

        if input.advanced {
            match input.process {
                Process::InjectionMolding => self.check_advanced_molding(input, &mut issues),
                Process::CncMilling | Process::CncTurning => {
                    self.check_advanced_machining(input, &mut issues)
                }
                Process::FdmPrinting if valid_box => self.check_advanced_fdm(input, &mut issues),
                _ => {}
            }
            self.check_material(input, &mut issues);
        }

        debug!(issues = issues.len(), "Rule evaluation complete");
        Ok(issues)
    }

    fn check_walls(&self, input: &AnalysisInput<'_>, limits: &Limits, issues: &mut Vec<ManufacturingIssue>) {
        let walls = &input.features.thin_walls;

        if !walls.is_empty() {
            for wall in walls {
                let issue = if wall.thickness < limits.min_wall {
                    ManufacturingIssue::new(
                        IssueKind::WallTooThin,
                        Severity::High,
                        format!(
                            "Wall thickness of {:.2}mm is below minimum recommended {:.2}mm",
                            wall.thickness, limits.min_wall
                        ),
                        format!(
                            "Increase wall thickness to at least {:.2}mm or add ribs for structural support",
                            limits.min_wall
                        ),
                    )
                    .with_cost_impact(0.15)
                } else if wall.thickness > limits.max_wall {
                    ManufacturingIssue::new(
                        IssueKind::WallTooThick,
                        Severity::Medium,
                        format!(
                            "Wall thickness of {:.2}mm exceeds maximum recommended {:.2}mm",
                            wall.thickness, limits.max_wall
                        ),
                        format!(
                            "Reduce wall thickness to below {:.2}mm to save material and reduce cooling time",
                            limits.max_wall
                        ),
                    )
                    .with_cost_impact(0.08)
                } else {
                    continue;
                };
                issues.push(match wall.position {
                    Some(p) => issue.with_position(p),
                    None => issue,
                });
            }
            return;
        }

        let Some(estimated) = input.summary.estimated_wall_thickness() else {
            debug!("Volume or area is zero, skipping wall thickness estimate");
            return;
        };
        let thick_limit = limits.max_wall * self.rules.check_defaults.estimated_thick_factor;

        if estimated < limits.min_wall {
            issues.push(
                ManufacturingIssue::new(
                    IssueKind::WallTooThin,
                    Severity::Medium,
                    format!(
                        "Estimated average wall thickness of {:.2}mm is below minimum recommended {:.2}mm",
                        estimated, limits.min_wall
                    ),
                    format!(
                        "Consider increasing wall thickness to at least {:.2}mm",
                        limits.min_wall
                    ),
                )
                .with_position(input.summary.center_of_mass)
                .with_cost_impact(0.10),
            );
        } else if estimated > thick_limit {
            issues.push(
                ManufacturingIssue::new(
                    IssueKind::WallTooThick,
                    Severity::Low,
                    format!(
                        "Estimated average wall thickness of {:.2}mm is well above recommended {:.2}mm",
                        estimated, limits.max_wall
                    ),
                    "Consider reducing overall wall thickness to save material and reduce cooling time",
                )
                .with_position(input.summary.center_of_mass)
                .with_cost_impact(0.05),
            );
        }
    }

    /// Returns false when the bounding box is degenerate
    fn check_aspect_ratio(
        &self,
        input: &AnalysisInput<'_>,
        limits: &Limits,
        issues: &mut Vec<ManufacturingIssue>,
    ) -> bool {
        let dims = input.summary.bounding_box;
        let Some(ratio) = dims.aspect_ratio() else {
            issues.push(
                ManufacturingIssue::new(
                    IssueKind::InvalidDimensions,
                    Severity::Critical,
                    "Model has zero or negative dimensions",
                    "Check model integrity and ensure all dimensions are positive",
                )
                .with_position(input.summary.center_of_mass)
                .with_cost_impact(0.25),
            );
            return false;
        };

        if ratio > limits.max_aspect {
            let (long, short) = dims.extreme_axes();
            issues.push(
                ManufacturingIssue::new(
                    IssueKind::HighAspectRatio,
                    Severity::Medium,
                    format!(
                        "Aspect ratio of {:.2} exceeds recommended maximum of {:.2}",
                        ratio, limits.max_aspect
                    ),
                    format!(
                        "Consider reducing the {} or increasing the {}",
                        long, short
                    ),
                )
                .with_position(input.summary.center_of_mass)
                .with_cost_impact(0.12),
            );
        }
        true
    }

    fn check_holes(&self, input: &AnalysisInput<'_>, limits: &Limits, issues: &mut Vec<ManufacturingIssue>) {
        for hole in &input.features.holes {
            let position = hole.position.unwrap_or(input.summary.center_of_mass);

            if hole.diameter < limits.min_hole {
                issues.push(
                    ManufacturingIssue::new(
                        IssueKind::HoleTooSmall,
                        Severity::High,
                        format!(
                            "Hole diameter of {:.2}mm is below minimum recommended {:.2}mm",
                            hole.diameter, limits.min_hole
                        ),
                        format!(
                            "Increase hole diameter to at least {:.2}mm or remove it if non-essential",
                            limits.min_hole
                        ),
                    )
                    .with_position(position)
                    .with_cost_impact(0.15),
                );
            }

            if hole.diameter > 0.0 {
                let ratio = hole.depth / hole.diameter;
                if ratio > limits.max_hole_depth_ratio {
                    issues.push(
                        ManufacturingIssue::new(
                            IssueKind::DeepHole,
                            Severity::Medium,
                            format!(
                                "Hole depth-to-diameter ratio of {:.2} exceeds recommended maximum of {:.2}",
                                ratio, limits.max_hole_depth_ratio
                            ),
                            "Increase the hole diameter, reduce its depth, or plan for deep-hole drilling",
                        )
                        .with_position(position)
                        .with_cost_impact(0.18),
                    );
                }
            }
        }
    }

    fn check_part_size(
        &self,
        input: &AnalysisInput<'_>,
        constraints: &ProcessConstraints,
        issues: &mut Vec<ManufacturingIssue>,
    ) {
        let largest = input.summary.bounding_box.max();
        let label = input.process.label();

        if let Some(max) = constraints.max_part_size.filter(|&max| largest > max) {
            issues.push(
                ManufacturingIssue::new(
                    IssueKind::PartTooLarge,
                    Severity::High,
                    format!(
                        "Largest dimension of {:.1}mm exceeds the {:.0}mm limit for {}",
                        largest, max, label
                    ),
                    "Split the part into an assembly or choose a process with a larger work envelope",
                )
                .with_cost_impact(0.20),
            );
        } else if let Some(min) = constraints.min_part_size.filter(|&min| largest < min) {
            issues.push(
                ManufacturingIssue::new(
                    IssueKind::PartTooSmall,
                    Severity::Medium,
                    format!(
                        "Largest dimension of {:.1}mm is below the {:.1}mm minimum for {}",
                        largest, min, label
                    ),
                    "Consider a micro-fabrication process or combine small parts into one",
                )
                .with_cost_impact(0.10),
            );
        }
    }

    fn check_injection_molding(
        &self,
        input: &AnalysisInput<'_>,
        constraints: &ProcessConstraints,
        valid_box: bool,
        issues: &mut Vec<ManufacturingIssue>,
    ) {
        let dims = input.summary.bounding_box;
        let limit = self.rules.process_checks.draft_ratio_limit;

        if valid_box && (dims.length / dims.height > limit || dims.width / dims.height > limit) {
            let draft = constraints.draft_angle.unwrap_or(1.0);
            issues.push(
                ManufacturingIssue::new(
                    IssueKind::DraftAngle,
                    Severity::Medium,
                    "Part has high aspect ratio walls that may require proper draft angles",
                    format!(
                        "Ensure all vertical walls have at least {}° draft angle for proper ejection",
                        draft
                    ),
                )
                .with_position(input.summary.center_of_mass)
                .with_cost_impact(0.10),
            );
        }

        let average = input
            .features
            .average_wall_thickness()
            .or_else(|| input.summary.estimated_wall_thickness());
        let sink_limit = constraints
            .sink_mark_thickness
            .or(constraints.max_wall_thickness)
            .unwrap_or(self.rules.check_defaults.max_wall_thickness);

        if let Some(average) = average.filter(|&t| t > sink_limit) {
            issues.push(
                ManufacturingIssue::new(
                    IssueKind::SinkMarks,
                    Severity::Medium,
                    format!(
                        "Average wall thickness of {:.2}mm may lead to sink marks",
                        average
                    ),
                    "Use uniform wall thickness and add ribs instead of thick sections",
                )
                .with_position(input.summary.center_of_mass)
                .with_cost_impact(0.08),
            );
        }
    }

    fn check_machining(
        &self,
        input: &AnalysisInput<'_>,
        constraints: &ProcessConstraints,
        valid_box: bool,
        issues: &mut Vec<ManufacturingIssue>,
    ) {
        let dims = input.summary.bounding_box;
        let ratio = self.rules.process_checks.deep_pocket_ratio;

        if valid_box && dims.height > ratio * dims.length.min(dims.width) {
            issues.push(
                ManufacturingIssue::new(
                    IssueKind::DeepPocket,
                    Severity::Medium,
                    format!(
                        "Part has deep pockets with depth-to-width ratio exceeding {}:1",
                        ratio
                    ),
                    "Redesign with shallower pockets or plan for long-reach tooling",
                )
                .with_position(input.summary.center_of_mass)
                .with_cost_impact(0.15),
            );
        }

        let corner = constraints.min_corner_radius.unwrap_or(1.0);
        let factor = self.rules.process_checks.corner_radius_factor;
        if input.features.holes.iter().any(|h| h.diameter < factor * corner) {
            issues.push(
                ManufacturingIssue::new(
                    IssueKind::SharpInternalCorner,
                    Severity::Medium,
                    format!(
                        "Part has potential sharp internal corners below minimum radius of {}mm",
                        corner
                    ),
                    format!("Design all internal corners with at least {}mm radius", corner),
                )
                .with_position(input.summary.center_of_mass)
                .with_cost_impact(0.12),
            );
        }
    }

    fn check_printing(
        &self,
        input: &AnalysisInput<'_>,
        constraints: &ProcessConstraints,
        valid_box: bool,
        issues: &mut Vec<ManufacturingIssue>,
    ) {
        let min_feature = constraints.min_feature_size.unwrap_or(0.4);
        if input
            .features
            .thin_walls
            .iter()
            .any(|w| w.thickness < min_feature)
        {
            issues.push(
                ManufacturingIssue::new(
                    IssueKind::ThinFeature,
                    Severity::High,
                    format!(
                        "Part has features thinner than minimum printable size of {}mm",
                        min_feature
                    ),
                    format!("Increase all feature thicknesses to at least {}mm", min_feature),
                )
                .with_position(input.summary.center_of_mass)
                .with_cost_impact(0.20),
            );
        }

        let dims = input.summary.bounding_box;
        let ratio = self.rules.process_checks.support_height_ratio;
        if valid_box && dims.height > ratio * dims.length.max(dims.width) {
            issues.push(
                ManufacturingIssue::new(
                    IssueKind::SupportStructure,
                    Severity::Medium,
                    "Part geometry may require extensive support structures during printing",
                    "Minimize overhangs or reorient the part for printing",
                )
                .with_position(input.summary.center_of_mass)
                .with_cost_impact(0.15),
            );
        }
    }

    fn check_advanced_molding(&self, input: &AnalysisInput<'_>, issues: &mut Vec<ManufacturingIssue>) {
        let advanced = &self.rules.advanced;
        let features = input.features;

        if features.holes.len() > advanced.weld_line_hole_count {
            issues.push(
                ManufacturingIssue::new(
                    IssueKind::WeldLine,
                    Severity::Medium,
                    "Multiple holes may cause weld lines in the part",
                    "Reposition holes or adjust the gate location to minimize weld lines",
                )
                .with_position(input.summary.center_of_mass)
                .with_cost_impact(0.08),
            );
        }

        if features.thin_walls.len() > 1 {
            if let (Some(min), Some(max)) =
                (features.min_wall_thickness(), features.max_wall_thickness())
            {
                let variation = max - min;
                if variation > advanced.wall_variation_limit {
                    issues.push(
                        ManufacturingIssue::new(
                            IssueKind::NonUniformWall,
                            Severity::Medium,
                            format!("Wall thickness varies by {:.2}mm across the part", variation),
                            "Design with uniform wall thickness to prevent warping and sink marks",
                        )
                        .with_position(input.summary.center_of_mass)
                        .with_cost_impact(0.10),
                    );
                }
            }
        }
    }

    fn check_advanced_machining(&self, input: &AnalysisInput<'_>, issues: &mut Vec<ManufacturingIssue>) {
        let advanced = &self.rules.advanced;
        let features = input.features;

        if features
            .thin_walls
            .iter()
            .any(|w| w.thickness < advanced.machining_min_wall)
        {
            issues.push(
                ManufacturingIssue::new(
                    IssueKind::ThinWallMachining,
                    Severity::Medium,
                    "Thin walls may vibrate or deflect during machining",
                    "Increase wall thickness or add support ribs to prevent deflection",
                )
                .with_position(input.summary.center_of_mass)
                .with_cost_impact(0.12),
            );
        }

        if features
            .holes
            .iter()
            .any(|h| h.depth > advanced.drilling_depth_ratio * h.diameter)
        {
            issues.push(
                ManufacturingIssue::new(
                    IssueKind::DeepHoleDrilling,
                    Severity::Medium,
                    "Deep holes may require specialized drilling techniques",
                    "Redesign with shallower holes or specify a gun drilling operation",
                )
                .with_position(input.summary.center_of_mass)
                .with_cost_impact(0.15),
            );
        }
    }

    fn check_advanced_fdm(&self, input: &AnalysisInput<'_>, issues: &mut Vec<ManufacturingIssue>) {
        let advanced = &self.rules.advanced;
        let dims = input.summary.bounding_box;

        if dims.length > advanced.warping_length || dims.width > advanced.warping_length {
            issues.push(
                ManufacturingIssue::new(
                    IssueKind::WarpingRisk,
                    Severity::Medium,
                    "Large flat surfaces may warp during printing",
                    "Add ribs to reduce warping, or print in a heated build chamber",
                )
                .with_position(input.summary.center_of_mass)
                .with_cost_impact(0.10),
            );
        }

        if dims.height > advanced.layer_adhesion_ratio * dims.length.min(dims.width) {
            issues.push(
                ManufacturingIssue::new(
                    IssueKind::LayerAdhesion,
                    Severity::High,
                    "Tall, thin features may have poor layer adhesion and break easily",
                    "Increase cross-sectional area or reorient the part for printing",
                )
                .with_position(input.summary.center_of_mass)
                .with_cost_impact(0.18),
            );
        }
    }

    fn check_material(&self, input: &AnalysisInput<'_>, issues: &mut Vec<ManufacturingIssue>) {
        if let Some(pair) = self.rules.disallowed_pair(input.process, input.material) {
            issues.push(
                ManufacturingIssue::new(
                    IssueKind::MaterialProcessIncompatibility,
                    Severity::High,
                    format!(
                        "{} is not suited to {}: {}",
                        input.material, input.process, pair.reason
                    ),
                    "Use a material better suited to this manufacturing process",
                )
                .with_cost_impact(0.25),
            );
        }

        for limit in &self.rules.material_volume_limits {
            if limit.material == input.material && input.summary.volume > limit.max_volume {
                issues.push(
                    ManufacturingIssue::new(
                        IssueKind::MaterialSizeCompatibility,
                        Severity::Medium,
                        limit.reason.clone(),
                        "Consider a more dimensionally stable material such as PC or reinforced nylon",
                    )
                    .with_cost_impact(0.15),
                );
            }
        }
    }
}
