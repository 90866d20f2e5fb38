//! Manufacturing issues raised by the rule evaluator

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Issue severity, ordered from least to most severe
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Info,
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// The check that produced an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    WallTooThin,
    WallTooThick,
    InvalidDimensions,
    HighAspectRatio,
    HoleTooSmall,
    DeepHole,
    PartTooLarge,
    PartTooSmall,
    DraftAngle,
    SinkMarks,
    DeepPocket,
    SharpInternalCorner,
    ThinFeature,
    SupportStructure,
    WeldLine,
    NonUniformWall,
    ThinWallMachining,
    DeepHoleDrilling,
    WarpingRisk,
    LayerAdhesion,
    MaterialProcessIncompatibility,
    MaterialSizeCompatibility,
}

impl IssueKind {
    /// Title shown to users and matched by API clients
    pub fn title(&self) -> &'static str {
        match self {
            IssueKind::WallTooThin => "Wall Thickness Too Thin",
            IssueKind::WallTooThick => "Wall Thickness Too Thick",
            IssueKind::InvalidDimensions => "Invalid Dimensions",
            IssueKind::HighAspectRatio => "High Aspect Ratio",
            IssueKind::HoleTooSmall => "Hole Diameter Too Small",
            IssueKind::DeepHole => "Deep Hole Issue",
            IssueKind::PartTooLarge => "Part Too Large",
            IssueKind::PartTooSmall => "Part Too Small",
            IssueKind::DraftAngle => "Potential Draft Angle Issue",
            IssueKind::SinkMarks => "Potential Sink Marks",
            IssueKind::DeepPocket => "Deep Pocket Machining Issue",
            IssueKind::SharpInternalCorner => "Sharp Internal Corner Issue",
            IssueKind::ThinFeature => "Thin Feature Issue",
            IssueKind::SupportStructure => "Potential Support Structure Needed",
            IssueKind::WeldLine => "Potential Weld Line Issue",
            IssueKind::NonUniformWall => "Non-uniform Wall Thickness",
            IssueKind::ThinWallMachining => "Thin Wall Machining Issue",
            IssueKind::DeepHoleDrilling => "Deep Hole Drilling Issue",
            IssueKind::WarpingRisk => "Warping Risk",
            IssueKind::LayerAdhesion => "Layer Adhesion Risk",
            IssueKind::MaterialProcessIncompatibility => "Material-Process Incompatibility",
            IssueKind::MaterialSizeCompatibility => "Material-Size Compatibility Issue",
        }
    }

    /// Whether this issue concerns wall thickness
    pub fn is_wall_related(&self) -> bool {
        matches!(
            self,
            IssueKind::WallTooThin
                | IssueKind::WallTooThick
                | IssueKind::NonUniformWall
                | IssueKind::ThinWallMachining
                | IssueKind::ThinFeature
        )
    }
}

/// A single DFM finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManufacturingIssue {
    pub kind: IssueKind,

    pub title: String,

    pub severity: Severity,

    pub description: String,

    pub recommendation: String,

    /// Location on the part, when the check is tied to one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point3<f64>>,

    /// Expected cost increase as a fraction (0.15 = +15%)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_impact: Option<f64>,
}

impl ManufacturingIssue {
    /// Create a new issue titled after its kind
    #[must_use]
    pub fn new(
        kind: IssueKind,
        severity: Severity,
        description: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            title: kind.title().to_string(),
            severity,
            description: description.into(),
            recommendation: recommendation.into(),
            position: None,
            cost_impact: None,
        }
    }

    #[must_use]
    pub fn with_position(mut self, position: Point3<f64>) -> Self {
        self.position = Some(position);
        self
    }

    #[must_use]
    pub fn with_cost_impact(mut self, fraction: f64) -> Self {
        self.cost_impact = Some(fraction);
        self
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}
