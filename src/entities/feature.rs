//! Feature candidates detected on a shape
//!
//! Detection is best-effort: a face may carry several kinds at once and
//! duplicates across faces of one physical feature are expected.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::entities::request::{CadFeatures, HoleSpec, WallSpec};

/// Feature classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Hole,
    Fillet,
    Chamfer,
    ThinWall,
    Rib,
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureKind::Hole => write!(f, "hole"),
            FeatureKind::Fillet => write!(f, "fillet"),
            FeatureKind::Chamfer => write!(f, "chamfer"),
            FeatureKind::ThinWall => write!(f, "thin_wall"),
            FeatureKind::Rib => write!(f, "rib"),
        }
    }
}

/// Hole termination; geometry heuristics never resolve it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoleType {
    #[default]
    Unknown,
    Blind,
    Through,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoleCandidate {
    pub face: usize,
    pub radius: f64,
    pub axis: Vector3<f64>,
    pub location: Point3<f64>,
    /// Face extent along the axis
    pub depth: f64,
    pub hole_type: HoleType,
}

impl HoleCandidate {
    pub fn diameter(&self) -> f64 {
        self.radius * 2.0
    }
}

/// Which fillet heuristic accepted the face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilletDetector {
    SmallRadius,
    Tangent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilletCandidate {
    pub face: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    pub location: Point3<f64>,
    pub detector: FilletDetector,
}

/// Which chamfer heuristic accepted the face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChamferDetector {
    EdgeDisparity,
    Conical,
    Elongated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChamferCandidate {
    pub face: usize,
    pub location: Point3<f64>,
    pub detector: ChamferDetector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinWallCandidate {
    pub face: usize,
    pub thickness: f64,
    pub location: Point3<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RibCandidate {
    pub face: usize,
    pub thickness: f64,
    /// Longest extent of the face bounds
    pub length: f64,
    pub location: Point3<f64>,
}

/// All candidates found on one shape, plus the face-id to kinds mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub holes: Vec<HoleCandidate>,
    pub fillets: Vec<FilletCandidate>,
    pub chamfers: Vec<ChamferCandidate>,
    pub thin_walls: Vec<ThinWallCandidate>,
    pub ribs: Vec<RibCandidate>,
    pub map: BTreeMap<usize, BTreeSet<FeatureKind>>,
}

/// Per-kind counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureCounts {
    pub holes: usize,
    pub fillets: usize,
    pub chamfers: usize,
    pub thin_walls: usize,
    pub ribs: usize,
}

impl FeatureCounts {
    pub fn total(&self) -> usize {
        self.holes + self.fillets + self.chamfers + self.thin_walls + self.ribs
    }
}

impl FeatureSet {
    /// Record that `face` was classified as `kind`
    pub fn tag(&mut self, face: usize, kind: FeatureKind) {
        self.map.entry(face).or_default().insert(kind);
    }

    /// Kinds assigned to a face (empty if none)
    pub fn kinds_of(&self, face: usize) -> Vec<FeatureKind> {
        self.map
            .get(&face)
            .map(|k| k.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn counts(&self) -> FeatureCounts {
        FeatureCounts {
            holes: self.holes.len(),
            fillets: self.fillets.len(),
            chamfers: self.chamfers.len(),
            thin_walls: self.thin_walls.len(),
            ribs: self.ribs.len(),
        }
    }

    /// Candidate wall thickness: the minimum over all measured faces
    pub fn min_wall_thickness(&self) -> Option<f64> {
        self.thin_walls
            .iter()
            .map(|w| w.thickness)
            .min_by(|a, b| a.total_cmp(b))
    }

    pub fn average_wall_thickness(&self) -> Option<f64> {
        if self.thin_walls.is_empty() {
            return None;
        }
        let sum: f64 = self.thin_walls.iter().map(|w| w.thickness).sum();
        Some(sum / self.thin_walls.len() as f64)
    }

    /// Convert to the feature block of an analysis request
    pub fn to_cad_features(&self) -> CadFeatures {
        CadFeatures {
            holes: self
                .holes
                .iter()
                .map(|h| HoleSpec {
                    diameter: h.diameter(),
                    depth: h.depth,
                    position: Some(h.location),
                })
                .collect(),
            thin_walls: self
                .thin_walls
                .iter()
                .map(|w| WallSpec {
                    thickness: w.thickness,
                    position: Some(w.location),
                })
                .collect(),
            ribs: self.ribs.len(),
            fillets: self.fillets.len(),
            chamfers: self.chamfers.len(),
            ..Default::default()
        }
    }
}
