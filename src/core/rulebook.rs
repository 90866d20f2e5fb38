//! Versioned rule book: every threshold, weight and coefficient table
//!
//! All scoring, rule and cost functions take a `&RuleBook` explicitly.
//! The built-in tables can be overridden per project by a
//! `.dfm/rules.yaml` file; top-level sections that are omitted keep
//! their defaults.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::error::{DfmError, DfmResult};
use crate::entities::issue::Severity;
use crate::entities::process::{Material, Process};
use crate::entities::response::Rating;
use crate::yaml::{read_yaml, YamlError};

/// Version of the built-in tables; part of every cache key
pub const RULEBOOK_VERSION: u32 = 1;

/// Score deducted per issue of each severity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityWeights {
    pub info: f64,
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            info: 0.0,
            low: 5.0,
            medium: 10.0,
            high: 20.0,
            critical: 40.0,
        }
    }
}

impl SeverityWeights {
    pub fn weight(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Info => self.info,
            Severity::Low => self.low,
            Severity::Medium => self.medium,
            Severity::High => self.high,
            Severity::Critical => self.critical,
        }
    }
}

/// Lower bounds of the rating buckets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingThresholds {
    pub excellent: f64,
    pub good: f64,
    pub fair: f64,
}

impl Default for RatingThresholds {
    fn default() -> Self {
        Self {
            excellent: 90.0,
            good: 75.0,
            fair: 50.0,
        }
    }
}

impl RatingThresholds {
    pub fn rate(&self, score: f64) -> Rating {
        if score >= self.excellent {
            Rating::Excellent
        } else if score >= self.good {
            Rating::Good
        } else if score >= self.fair {
            Rating::Fair
        } else {
            Rating::Poor
        }
    }
}

/// Values used when a process table leaves a constraint unset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckDefaults {
    pub min_wall_thickness: f64,
    pub max_wall_thickness: f64,
    pub max_aspect_ratio: f64,
    pub min_hole_diameter: f64,
    pub max_hole_depth_ratio: f64,
    /// Estimated thickness must exceed `max_wall_thickness` times this
    pub estimated_thick_factor: f64,
}

impl Default for CheckDefaults {
    fn default() -> Self {
        Self {
            min_wall_thickness: 0.8,
            max_wall_thickness: 5.0,
            max_aspect_ratio: 5.0,
            min_hole_diameter: 1.0,
            max_hole_depth_ratio: 10.0,
            estimated_thick_factor: 1.5,
        }
    }
}

/// Static design limits of one process, in millimetres and degrees
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConstraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_wall_thickness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_wall_thickness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_aspect_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_hole_diameter: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_hole_depth_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft_angle: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_corner_radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_feature_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_overhang_angle: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sink_mark_thickness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_part_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_part_size: Option<f64>,
}

impl ProcessConstraints {
    pub fn injection_molding() -> Self {
        Self {
            min_wall_thickness: Some(0.5),
            max_wall_thickness: Some(4.0),
            max_aspect_ratio: Some(5.0),
            draft_angle: Some(1.0),
            min_corner_radius: Some(0.5),
            sink_mark_thickness: Some(4.0),
            tolerance: Some(0.1),
            max_part_size: Some(1000.0),
            min_part_size: Some(5.0),
            ..Default::default()
        }
    }

    pub fn cnc_milling() -> Self {
        Self {
            min_wall_thickness: Some(0.8),
            max_aspect_ratio: Some(8.0),
            min_corner_radius: Some(0.8),
            min_hole_diameter: Some(1.0),
            max_hole_depth_ratio: Some(5.0),
            tolerance: Some(0.05),
            max_part_size: Some(2000.0),
            min_part_size: Some(10.0),
            ..Default::default()
        }
    }

    pub fn cnc_turning() -> Self {
        Self {
            max_aspect_ratio: Some(10.0),
            max_part_size: Some(1000.0),
            min_part_size: Some(3.0),
            ..Self::cnc_milling()
        }
    }

    pub fn fdm_printing() -> Self {
        Self {
            min_wall_thickness: Some(1.0),
            max_aspect_ratio: Some(5.0),
            min_hole_diameter: Some(2.0),
            min_feature_size: Some(1.0),
            max_overhang_angle: Some(45.0),
            tolerance: Some(0.2),
            max_part_size: Some(300.0),
            min_part_size: Some(2.0),
            ..Default::default()
        }
    }

    pub fn sla_printing() -> Self {
        Self {
            min_wall_thickness: Some(0.5),
            max_aspect_ratio: Some(8.0),
            min_hole_diameter: Some(0.5),
            min_feature_size: Some(0.3),
            max_overhang_angle: Some(30.0),
            tolerance: Some(0.1),
            max_part_size: Some(250.0),
            min_part_size: Some(1.0),
            ..Default::default()
        }
    }

    pub fn sls_printing() -> Self {
        Self {
            min_wall_thickness: Some(0.8),
            max_aspect_ratio: Some(8.0),
            min_hole_diameter: Some(1.5),
            min_feature_size: Some(0.5),
            tolerance: Some(0.15),
            max_part_size: Some(350.0),
            min_part_size: Some(2.0),
            ..Default::default()
        }
    }

    pub fn sheet_metal() -> Self {
        Self {
            min_wall_thickness: Some(0.5),
            max_wall_thickness: Some(6.0),
            max_aspect_ratio: Some(10.0),
            min_hole_diameter: Some(1.0),
            min_corner_radius: Some(0.5),
            tolerance: Some(0.1),
            max_part_size: Some(3000.0),
            min_part_size: Some(5.0),
            ..Default::default()
        }
    }

    pub fn casting() -> Self {
        Self {
            min_wall_thickness: Some(2.0),
            max_wall_thickness: Some(25.0),
            max_aspect_ratio: Some(6.0),
            min_hole_diameter: Some(3.0),
            draft_angle: Some(2.0),
            min_corner_radius: Some(1.0),
            sink_mark_thickness: Some(25.0),
            tolerance: Some(0.5),
            max_part_size: Some(3000.0),
            min_part_size: Some(10.0),
            ..Default::default()
        }
    }

    pub fn forging() -> Self {
        Self {
            min_wall_thickness: Some(3.0),
            max_wall_thickness: Some(50.0),
            max_aspect_ratio: Some(5.0),
            min_hole_diameter: Some(5.0),
            draft_angle: Some(5.0),
            tolerance: Some(0.5),
            max_part_size: Some(1500.0),
            min_part_size: Some(10.0),
            ..Default::default()
        }
    }

    pub fn extrusion() -> Self {
        Self {
            min_wall_thickness: Some(1.0),
            max_wall_thickness: Some(10.0),
            max_aspect_ratio: Some(10.0),
            tolerance: Some(0.2),
            max_part_size: Some(6000.0),
            min_part_size: Some(5.0),
            ..Default::default()
        }
    }
}

/// Thresholds of the process-family bounding-box heuristics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessCheckThresholds {
    /// L/H or W/H above which draft problems are likely
    pub draft_ratio_limit: f64,
    /// Pocket depth over smaller planar dimension
    pub deep_pocket_ratio: f64,
    /// Holes smaller than this many corner radii leave sharp corners
    pub corner_radius_factor: f64,
    /// Height over larger planar dimension needing supports
    pub support_height_ratio: f64,
}

impl Default for ProcessCheckThresholds {
    fn default() -> Self {
        Self {
            draft_ratio_limit: 5.0,
            deep_pocket_ratio: 3.0,
            corner_radius_factor: 2.0,
            support_height_ratio: 2.0,
        }
    }
}

/// Thresholds of the advanced checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedThresholds {
    /// More holes than this create weld lines
    pub weld_line_hole_count: usize,
    pub wall_variation_limit: f64,
    pub machining_min_wall: f64,
    pub drilling_depth_ratio: f64,
    pub warping_length: f64,
    pub layer_adhesion_ratio: f64,
}

impl Default for AdvancedThresholds {
    fn default() -> Self {
        Self {
            weld_line_hole_count: 1,
            wall_variation_limit: 1.0,
            machining_min_wall: 1.0,
            drilling_depth_ratio: 10.0,
            warping_length: 100.0,
            layer_adhesion_ratio: 5.0,
        }
    }
}

/// A process and material that cannot be combined
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncompatiblePair {
    pub process: Process,
    pub material: Material,
    pub reason: String,
}

/// Volume above which a material becomes problematic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialVolumeLimit {
    pub material: Material,
    /// mm³
    pub max_volume: f64,
    pub reason: String,
}

/// Cost and compatibility data for a material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialProperties {
    /// USD per cm³
    pub cost_per_cm3: f64,
    pub compatible_processes: Vec<Process>,
}

/// Closed-form labor cost model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum LaborModel {
    /// seconds = base × volume/reference × (1 + faces/divisor), billed at the machine rate
    MoldCycle {
        base_cycle_seconds: f64,
        reference_volume: f64,
        face_divisor: f64,
    },
    /// hours = base × volume/reference × (1 + faces/divisor), billed at the machine rate
    Machining {
        base_hours: f64,
        reference_volume: f64,
        face_divisor: f64,
    },
    /// hours = cm³ / rate, billed at the machine rate times attendance
    Additive {
        deposition_rate_cm3_per_hour: f64,
        attendance: f64,
    },
    Flat {
        cost_per_part: f64,
    },
}

/// Tooling cost model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ToolingModel {
    /// base × clamp(1 + (faces − ref)/divisor) × clamp(maxdim/ref_size) × factor
    Mold {
        base_cost: f64,
        reference_faces: f64,
        face_divisor: f64,
        max_complexity_factor: f64,
        reference_size: f64,
        min_size_factor: f64,
        max_size_factor: f64,
        complexity_factor: f64,
    },
    Fixture {
        fixture_cost: f64,
        programming_cost: f64,
    },
    Flat {
        cost: f64,
    },
}

/// Production volume at or above which `factor` applies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscountTier {
    pub min_volume: u32,
    pub factor: f64,
}

/// Per-process cost coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// USD per hour
    pub machine_rate: f64,
    pub material_factor: f64,
    pub waste_factor: f64,
    pub labor: LaborModel,
    pub tooling: ToolingModel,
    pub setup_cost: f64,
    pub finishing_cost: f64,
    /// Fraction of material plus labor
    pub overhead_rate: f64,
    #[serde(default)]
    pub volume_discounts: Vec<DiscountTier>,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            machine_rate: 50.0,
            material_factor: 1.0,
            waste_factor: 1.2,
            labor: LaborModel::Flat {
                cost_per_part: 10.0,
            },
            tooling: ToolingModel::Flat { cost: 50.0 },
            setup_cost: 0.0,
            finishing_cost: 1.0,
            overhead_rate: 0.2,
            volume_discounts: Vec::new(),
        }
    }
}

impl CostModel {
    fn injection_molding() -> Self {
        Self {
            machine_rate: 75.0,
            material_factor: 1.0,
            waste_factor: 1.1,
            labor: LaborModel::MoldCycle {
                base_cycle_seconds: 30.0,
                reference_volume: 10_000.0,
                face_divisor: 100.0,
            },
            tooling: ToolingModel::Mold {
                base_cost: 5000.0,
                reference_faces: 50.0,
                face_divisor: 100.0,
                max_complexity_factor: 3.0,
                reference_size: 100.0,
                min_size_factor: 0.5,
                max_size_factor: 3.0,
                complexity_factor: 1.0,
            },
            setup_cost: 500.0,
            finishing_cost: 0.5,
            overhead_rate: 0.2,
            volume_discounts: tiers(&[
                (1000, 1.0),
                (5000, 0.8),
                (10_000, 0.6),
                (50_000, 0.4),
                (100_000, 0.3),
            ]),
        }
    }

    fn cnc() -> Self {
        Self {
            machine_rate: 85.0,
            material_factor: 1.2,
            waste_factor: 1.3,
            labor: LaborModel::Machining {
                base_hours: 0.5,
                reference_volume: 50_000.0,
                face_divisor: 50.0,
            },
            tooling: ToolingModel::Fixture {
                fixture_cost: 50.0,
                programming_cost: 200.0,
            },
            setup_cost: 150.0,
            finishing_cost: 2.0,
            overhead_rate: 0.2,
            volume_discounts: tiers(&[(10, 1.0), (50, 0.9), (100, 0.8), (500, 0.7), (1000, 0.6)]),
        }
    }

    fn fdm() -> Self {
        Self {
            machine_rate: 20.0,
            labor: LaborModel::Additive {
                deposition_rate_cm3_per_hour: 15.0,
                attendance: 0.3,
            },
            ..Self::default()
        }
    }
}

fn tiers(values: &[(u32, f64)]) -> Vec<DiscountTier> {
    values
        .iter()
        .map(|&(min_volume, factor)| DiscountTier { min_volume, factor })
        .collect()
}

/// Step function over production volume: first band whose `below` exceeds the volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeSuitability {
    pub bands: Vec<VolumeBand>,
    pub otherwise: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeBand {
    pub below: u32,
    pub factor: f64,
}

impl VolumeSuitability {
    fn new(bands: &[(u32, f64)], otherwise: f64) -> Self {
        Self {
            bands: bands
                .iter()
                .map(|&(below, factor)| VolumeBand { below, factor })
                .collect(),
            otherwise,
        }
    }

    pub fn factor(&self, volume: u32) -> f64 {
        self.bands
            .iter()
            .find(|b| volume < b.below)
            .map(|b| b.factor)
            .unwrap_or(self.otherwise)
    }
}

/// Penalties for parts outside a process's comfortable size range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeSuitability {
    pub min_size: f64,
    pub small_factor: f64,
    pub max_size: f64,
    pub large_factor: f64,
}

impl SizeSuitability {
    pub fn factor(&self, max_dimension: f64) -> f64 {
        if max_dimension < self.min_size {
            self.small_factor
        } else if max_dimension > self.max_size {
            self.large_factor
        } else {
            1.0
        }
    }
}

/// Suitability penalty tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuitabilityTables {
    pub incompatible_material_factor: f64,
    pub volume: BTreeMap<Process, VolumeSuitability>,
    pub default_volume_factor: f64,
    pub size: BTreeMap<Process, SizeSuitability>,
    pub default_size_factor: f64,
}

impl Default for SuitabilityTables {
    fn default() -> Self {
        let mut volume = BTreeMap::new();
        volume.insert(
            Process::InjectionMolding,
            VolumeSuitability::new(&[(100, 0.5), (1000, 0.7), (10_000, 0.9)], 1.0),
        );
        volume.insert(
            Process::CncMilling,
            VolumeSuitability::new(&[(10, 1.0), (100, 0.9), (1000, 0.7)], 0.5),
        );
        volume.insert(
            Process::FdmPrinting,
            VolumeSuitability::new(&[(10, 1.0), (50, 0.8), (100, 0.6)], 0.4),
        );

        let mut size = BTreeMap::new();
        size.insert(
            Process::InjectionMolding,
            SizeSuitability {
                min_size: 10.0,
                small_factor: 0.7,
                max_size: 1000.0,
                large_factor: 0.6,
            },
        );
        size.insert(
            Process::CncMilling,
            SizeSuitability {
                min_size: 5.0,
                small_factor: 0.6,
                max_size: 2000.0,
                large_factor: 0.7,
            },
        );
        size.insert(
            Process::FdmPrinting,
            SizeSuitability {
                min_size: 5.0,
                small_factor: 0.8,
                max_size: 300.0,
                large_factor: 0.5,
            },
        );

        Self {
            incompatible_material_factor: 0.7,
            volume,
            default_volume_factor: 0.8,
            size,
            default_size_factor: 0.9,
        }
    }
}

/// Lead time = base days + ⌈volume / parts_per_day⌉
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeadTime {
    pub base_days: u32,
    pub parts_per_day: u32,
}

/// Parameters of the face classifiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureParams {
    /// Fillet radius limit as a fraction of the largest bounding-box dimension
    pub fillet_radius_ratio: f64,
    /// Tangency accepted when `1 − |n1·n2|` is below this
    pub tangent_tolerance: f64,
    /// Small-face limit for chamfers, as a fraction of total area
    pub chamfer_area_fraction: f64,
    /// Shortest edge must be below this fraction of the third shortest
    pub chamfer_edge_ratio: f64,
    /// Absolute small-face limit for the elongation detector, mm²
    pub chamfer_max_area: f64,
    pub chamfer_aspect_ratio: f64,
    /// Faces smaller than this fraction of total area are not ray cast
    pub min_face_area_fraction: f64,
    /// Hits closer than this are self-intersections
    pub min_ray_distance: f64,
    pub rib_thickness_ratio: f64,
    pub rib_length_ratio: f64,
    pub rib_thickness_multiple: f64,
    /// Rounding step of face centres for de-duplication, mm
    pub dedup_precision: f64,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            fillet_radius_ratio: 0.1,
            tangent_tolerance: 0.01,
            chamfer_area_fraction: 0.01,
            chamfer_edge_ratio: 0.5,
            chamfer_max_area: 100.0,
            chamfer_aspect_ratio: 5.0,
            min_face_area_fraction: 0.001,
            min_ray_distance: 0.001,
            rib_thickness_ratio: 0.7,
            rib_length_ratio: 3.0,
            rib_thickness_multiple: 5.0,
            dedup_precision: 0.1,
        }
    }
}

/// Coefficients of the complexity indicators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityParams {
    pub surface_ratio_weight: f64,
    pub feature_density_weight: f64,
    pub aspect_divisor: f64,
    pub aspect_cap: f64,
    pub aspect_weight: f64,
    pub feature_weight: f64,
    /// Lower bounds for Very High, High, Medium and Low
    pub rating_bounds: [f64; 4],
    pub hole_points: f64,
    pub rib_points: f64,
    pub undercut_points: f64,
    pub thin_wall_points: f64,
    pub sharp_corner_points: f64,
    /// Upper bounds (exclusive) for Low, Medium and High
    pub feature_rating_bounds: [f64; 3],
    pub undercut_penalty: f64,
    pub thin_wall_penalty: f64,
    pub sharp_corner_penalty: f64,
    pub hole_penalty: f64,
    pub thin_section_limit: f64,
    pub thin_section_penalty: f64,
    pub aspect_limit: f64,
    pub aspect_penalty: f64,
}

impl Default for ComplexityParams {
    fn default() -> Self {
        Self {
            surface_ratio_weight: 5.0,
            feature_density_weight: 30.0,
            aspect_divisor: 3.0,
            aspect_cap: 10.0,
            aspect_weight: 3.0,
            feature_weight: 2.0,
            rating_bounds: [80.0, 60.0, 40.0, 20.0],
            hole_points: 3.0,
            rib_points: 1.0,
            undercut_points: 5.0,
            thin_wall_points: 4.0,
            sharp_corner_points: 0.5,
            feature_rating_bounds: [15.0, 35.0, 60.0],
            undercut_penalty: 1.5,
            thin_wall_penalty: 0.8,
            sharp_corner_penalty: 0.02,
            hole_penalty: 0.3,
            thin_section_limit: 1.5,
            thin_section_penalty: 2.0,
            aspect_limit: 10.0,
            aspect_penalty: 1.5,
        }
    }
}

/// Thresholds of the expert recommendations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationParams {
    pub molding_min_volume: u32,
    pub machining_max_volume: u32,
    pub many_issues: usize,
}

impl Default for RecommendationParams {
    fn default() -> Self {
        Self {
            molding_min_volume: 1000,
            machining_max_volume: 1000,
            many_issues: 5,
        }
    }
}

/// The complete set of tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleBook {
    pub version: u32,
    pub severity_weights: SeverityWeights,
    pub rating_thresholds: RatingThresholds,
    pub check_defaults: CheckDefaults,
    pub constraints: BTreeMap<Process, ProcessConstraints>,
    pub process_checks: ProcessCheckThresholds,
    pub advanced: AdvancedThresholds,
    pub incompatible_pairs: Vec<IncompatiblePair>,
    pub material_volume_limits: Vec<MaterialVolumeLimit>,
    pub materials: BTreeMap<Material, MaterialProperties>,
    pub cost_models: BTreeMap<Process, CostModel>,
    pub default_cost_model: CostModel,
    pub suitability: SuitabilityTables,
    pub lead_times: BTreeMap<Process, LeadTime>,
    pub default_lead_time_days: u32,
    pub candidate_processes: Vec<Process>,
    pub features: FeatureParams,
    pub complexity: ComplexityParams,
    pub recommendations: RecommendationParams,
    /// Score reported when the pipeline fails
    pub degraded_score: f64,
}

impl Default for RuleBook {
    fn default() -> Self {
        let constraints = BTreeMap::from([
            (Process::InjectionMolding, ProcessConstraints::injection_molding()),
            (Process::CncMilling, ProcessConstraints::cnc_milling()),
            (Process::CncTurning, ProcessConstraints::cnc_turning()),
            (Process::FdmPrinting, ProcessConstraints::fdm_printing()),
            (Process::SlaPrinting, ProcessConstraints::sla_printing()),
            (Process::SlsPrinting, ProcessConstraints::sls_printing()),
            (Process::SheetMetal, ProcessConstraints::sheet_metal()),
            (Process::Casting, ProcessConstraints::casting()),
            (Process::Forging, ProcessConstraints::forging()),
            (Process::Extrusion, ProcessConstraints::extrusion()),
        ]);

        let incompatible_pairs = vec![
            IncompatiblePair {
                process: Process::InjectionMolding,
                material: Material::CarbonFiber,
                reason: "Continuous carbon fiber cannot flow through a mold gate".to_string(),
            },
            IncompatiblePair {
                process: Process::CncMilling,
                material: Material::Pla,
                reason: "PLA softens and gums up cutting tools".to_string(),
            },
            IncompatiblePair {
                process: Process::FdmPrinting,
                material: Material::Peek,
                reason: "PEEK needs extrusion temperatures beyond standard FDM printers"
                    .to_string(),
            },
        ];

        let material_volume_limits = vec![MaterialVolumeLimit {
            material: Material::Abs,
            max_volume: 1_000_000.0,
            reason: "Large ABS parts are prone to warping and shrinkage".to_string(),
        }];

        use Process::*;
        let materials = BTreeMap::from([
            (Material::Abs, props(0.05, &[InjectionMolding, FdmPrinting, CncMilling])),
            (Material::Pla, props(0.04, &[FdmPrinting, SlaPrinting])),
            (Material::Petg, props(0.06, &[InjectionMolding, FdmPrinting])),
            (Material::Nylon, props(0.08, &[InjectionMolding, SlsPrinting, CncMilling])),
            (
                Material::Polycarbonate,
                props(0.09, &[InjectionMolding, FdmPrinting, CncMilling]),
            ),
            (Material::Pom, props(0.07, &[InjectionMolding, CncMilling, CncTurning])),
            (Material::Peek, props(0.50, &[InjectionMolding, CncMilling, CncTurning])),
            (
                Material::Aluminum,
                props(
                    0.15,
                    &[CncMilling, CncTurning, Casting, Forging, SheetMetal, Extrusion],
                ),
            ),
            (
                Material::Steel,
                props(0.10, &[CncMilling, CncTurning, Forging, SheetMetal, Casting]),
            ),
            (
                Material::StainlessSteel,
                props(0.20, &[CncMilling, CncTurning, SheetMetal]),
            ),
            (Material::Titanium, props(0.80, &[CncMilling, CncTurning, Forging])),
            (
                Material::Copper,
                props(0.25, &[CncMilling, CncTurning, Casting, Extrusion]),
            ),
            (Material::Brass, props(0.20, &[CncMilling, CncTurning, Casting])),
            (Material::CarbonFiber, props(0.40, &[CncMilling, FdmPrinting])),
            (Material::GlassFiber, props(0.15, &[InjectionMolding, CncMilling])),
        ]);

        let cost_models = BTreeMap::from([
            (InjectionMolding, CostModel::injection_molding()),
            (CncMilling, CostModel::cnc()),
            (CncTurning, CostModel::cnc()),
            (FdmPrinting, CostModel::fdm()),
        ]);

        let lead_times = BTreeMap::from([
            (InjectionMolding, lead(28, 10_000)),
            (CncMilling, lead(3, 20)),
            (CncTurning, lead(3, 30)),
            (FdmPrinting, lead(1, 10)),
            (SlaPrinting, lead(2, 15)),
            (SlsPrinting, lead(3, 50)),
            (SheetMetal, lead(7, 200)),
            (Casting, lead(21, 500)),
            (Forging, lead(28, 500)),
            (Extrusion, lead(14, 1000)),
        ]);

        Self {
            version: RULEBOOK_VERSION,
            severity_weights: SeverityWeights::default(),
            rating_thresholds: RatingThresholds::default(),
            check_defaults: CheckDefaults::default(),
            constraints,
            process_checks: ProcessCheckThresholds::default(),
            advanced: AdvancedThresholds::default(),
            incompatible_pairs,
            material_volume_limits,
            materials,
            cost_models,
            default_cost_model: CostModel::default(),
            suitability: SuitabilityTables::default(),
            lead_times,
            default_lead_time_days: 14,
            candidate_processes: vec![InjectionMolding, CncMilling, FdmPrinting],
            features: FeatureParams::default(),
            complexity: ComplexityParams::default(),
            recommendations: RecommendationParams::default(),
            degraded_score: 70.0,
        }
    }
}

fn props(cost_per_cm3: f64, processes: &[Process]) -> MaterialProperties {
    MaterialProperties {
        cost_per_cm3,
        compatible_processes: processes.to_vec(),
    }
}

fn lead(base_days: u32, parts_per_day: u32) -> LeadTime {
    LeadTime {
        base_days,
        parts_per_day,
    }
}

impl RuleBook {
    /// Load a rule book file; omitted sections keep their defaults
    pub fn load(path: &Path) -> Result<Self, YamlError> {
        read_yaml(path)
    }

    pub fn to_yaml(&self) -> String {
        serde_yml::to_string(self).unwrap_or_default()
    }

    /// Constraint table of a process
    pub fn constraints_for(&self, process: Process) -> DfmResult<&ProcessConstraints> {
        self.constraints.get(&process).ok_or_else(|| {
            DfmError::rules(format!("no constraint table for process {}", process))
        })
    }

    pub fn cost_model(&self, process: Process) -> &CostModel {
        self.cost_models
            .get(&process)
            .unwrap_or(&self.default_cost_model)
    }

    /// Material rate in USD per cm³, zero when the material is not listed
    pub fn material_rate(&self, material: Material) -> f64 {
        self.materials
            .get(&material)
            .map(|m| m.cost_per_cm3)
            .unwrap_or(0.0)
    }

    /// Materials without a table entry are treated as compatible
    pub fn is_compatible(&self, material: Material, process: Process) -> bool {
        self.materials
            .get(&material)
            .map(|m| m.compatible_processes.contains(&process))
            .unwrap_or(true)
    }

    pub fn compatible_processes(&self, material: Material) -> Vec<Process> {
        self.materials
            .get(&material)
            .map(|m| m.compatible_processes.clone())
            .unwrap_or_default()
    }

    pub fn disallowed_pair(&self, process: Process, material: Material) -> Option<&IncompatiblePair> {
        self.incompatible_pairs
            .iter()
            .find(|p| p.process == process && p.material == material)
    }

    pub fn lead_time_days(&self, process: Process, production_volume: u32) -> u32 {
        match self.lead_times.get(&process) {
            Some(lt) if lt.parts_per_day > 0 => {
                lt.base_days + production_volume.div_ceil(lt.parts_per_day)
            }
            Some(lt) => lt.base_days,
            None => self.default_lead_time_days,
        }
    }

    /// Consistency problems in a hand-edited rule book
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.version > RULEBOOK_VERSION {
            problems.push(format!(
                "version {} is newer than supported version {}",
                self.version, RULEBOOK_VERSION
            ));
        }

        let w = &self.severity_weights;
        for (name, value) in [
            ("info", w.info),
            ("low", w.low),
            ("medium", w.medium),
            ("high", w.high),
            ("critical", w.critical),
        ] {
            if value < 0.0 {
                problems.push(format!("severity weight '{}' is negative", name));
            }
        }
        if !(w.info <= w.low && w.low <= w.medium && w.medium <= w.high && w.high <= w.critical) {
            problems.push("severity weights should not decrease with severity".to_string());
        }

        let r = &self.rating_thresholds;
        if !(r.excellent >= r.good && r.good >= r.fair) {
            problems.push("rating thresholds must satisfy excellent >= good >= fair".to_string());
        }

        for process in &self.candidate_processes {
            if !self.constraints.contains_key(process) {
                problems.push(format!(
                    "candidate process {} has no constraint table",
                    process
                ));
            }
        }

        for (process, model) in &self.cost_models {
            let mut last = 0;
            for tier in &model.volume_discounts {
                if tier.min_volume < last {
                    problems.push(format!(
                        "volume discounts for {} are not sorted by min_volume",
                        process
                    ));
                    break;
                }
                last = tier.min_volume;
            }
        }

        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_rulebook_is_consistent() {
        let rules = RuleBook::default();
        assert!(rules.problems().is_empty(), "{:?}", rules.problems());
        assert_eq!(rules.version, RULEBOOK_VERSION);
        for process in Process::ALL {
            assert!(rules.constraints_for(process).is_ok());
        }
    }

    #[test]
    fn test_severity_weights() {
        let w = SeverityWeights::default();
        assert_eq!(w.weight(Severity::Info), 0.0);
        assert_eq!(w.weight(Severity::Medium), 10.0);
        assert_eq!(w.weight(Severity::Critical), 40.0);
    }

    #[test]
    fn test_rating_buckets() {
        let r = RatingThresholds::default();
        assert_eq!(r.rate(100.0), Rating::Excellent);
        assert_eq!(r.rate(90.0), Rating::Excellent);
        assert_eq!(r.rate(89.9), Rating::Good);
        assert_eq!(r.rate(75.0), Rating::Good);
        assert_eq!(r.rate(50.0), Rating::Fair);
        assert_eq!(r.rate(49.9), Rating::Poor);
    }

    #[test]
    fn test_volume_suitability_steps() {
        let tables = SuitabilityTables::default();
        let im = &tables.volume[&Process::InjectionMolding];
        assert_eq!(im.factor(50), 0.5);
        assert_eq!(im.factor(100), 0.7);
        assert_eq!(im.factor(5000), 0.9);
        assert_eq!(im.factor(10_000), 1.0);

        let fdm = &tables.volume[&Process::FdmPrinting];
        assert_eq!(fdm.factor(1), 1.0);
        assert_eq!(fdm.factor(500), 0.4);
    }

    #[test]
    fn test_lead_time() {
        let rules = RuleBook::default();
        assert_eq!(rules.lead_time_days(Process::InjectionMolding, 1000), 29);
        assert_eq!(rules.lead_time_days(Process::CncMilling, 100), 8);
        assert_eq!(rules.lead_time_days(Process::FdmPrinting, 25), 4);
    }

    #[test]
    fn test_compatibility_tables_agree() {
        let rules = RuleBook::default();
        for pair in &rules.incompatible_pairs {
            assert!(
                !rules.is_compatible(pair.material, pair.process),
                "{} listed as compatible with {}",
                pair.material,
                pair.process
            );
        }
        assert!(rules.is_compatible(Material::Abs, Process::InjectionMolding));
        assert!(rules
            .disallowed_pair(Process::InjectionMolding, Material::CarbonFiber)
            .is_some());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("rules.yaml");
        std::fs::write(
            &path,
            "severity_weights:\n  info: 0\n  low: 5\n  medium: 10\n  high: 20\n  critical: 30\n",
        )
        .unwrap();

        let rules = RuleBook::load(&path).unwrap();
        assert_eq!(rules.severity_weights.critical, 30.0);
        assert_eq!(rules.rating_thresholds, RatingThresholds::default());
        assert_eq!(rules.constraints.len(), Process::ALL.len());
    }

    #[test]
    fn test_yaml_round_trip() {
        let rules = RuleBook::default();
        let yaml = rules.to_yaml();
        let parsed: RuleBook = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(parsed, rules);
    }

    #[test]
    fn test_problems_detects_bad_thresholds() {
        let mut rules = RuleBook::default();
        rules.rating_thresholds.good = 95.0;
        rules.severity_weights.low = -1.0;
        let problems = rules.problems();
        assert_eq!(problems.len(), 3);
    }
}
