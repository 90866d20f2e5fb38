//! The `/analyze` request contract

use nalgebra::Point3;
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::error::{DfmError, DfmResult};
use crate::entities::feature::FeatureSet;
use crate::entities::geometry::{Dimensions, GeometrySummary};
use crate::entities::process::{Material, Process};

pub const DEFAULT_PART_NAME: &str = "Unknown Part";

fn default_production_volume() -> u32 {
    1000
}

fn default_true() -> bool {
    true
}

/// Accept either a count or a list of items and keep the count
fn count_or_list<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum CountOrList {
        Count(usize),
        List(Vec<serde::de::IgnoredAny>),
    }

    Ok(match CountOrList::deserialize(deserializer)? {
        CountOrList::Count(n) => n,
        CountOrList::List(items) => items.len(),
    })
}

/// A hole as measured by the client or by feature detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoleSpec {
    pub diameter: f64,
    #[serde(default)]
    pub depth: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point3<f64>>,
}

/// A measured wall
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallSpec {
    pub thickness: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point3<f64>>,
}

/// Feature block of a request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadFeatures {
    pub holes: Vec<HoleSpec>,
    pub thin_walls: Vec<WallSpec>,
    #[serde(deserialize_with = "count_or_list")]
    pub ribs: usize,
    #[serde(deserialize_with = "count_or_list")]
    pub undercuts: usize,
    #[serde(deserialize_with = "count_or_list")]
    pub sharp_corners: usize,
    #[serde(deserialize_with = "count_or_list")]
    pub fillets: usize,
    #[serde(deserialize_with = "count_or_list")]
    pub chamfers: usize,
}

impl CadFeatures {
    pub fn min_wall_thickness(&self) -> Option<f64> {
        self.thin_walls
            .iter()
            .map(|w| w.thickness)
            .min_by(|a, b| a.total_cmp(b))
    }

    pub fn max_wall_thickness(&self) -> Option<f64> {
        self.thin_walls
            .iter()
            .map(|w| w.thickness)
            .max_by(|a, b| a.total_cmp(b))
    }

    pub fn average_wall_thickness(&self) -> Option<f64> {
        if self.thin_walls.is_empty() {
            return None;
        }
        let sum: f64 = self.thin_walls.iter().map(|w| w.thickness).sum();
        Some(sum / self.thin_walls.len() as f64)
    }

    /// Number of detected features of any kind
    pub fn total(&self) -> usize {
        self.holes.len()
            + self.thin_walls.len()
            + self.ribs
            + self.undercuts
            + self.sharp_corners
            + self.fillets
            + self.chamfers
    }
}

/// Geometry as supplied by the client; missing scalars are derived from
/// the bounding box
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadData {
    #[serde(alias = "name", skip_serializing_if = "Option::is_none")]
    pub part_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surface_area: Option<f64>,
    pub dimensions: Dimensions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center_of_mass: Option<Point3<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertex_count: Option<usize>,
    pub features: CadFeatures,
}

impl CadData {
    pub fn part_name(&self) -> &str {
        self.part_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(DEFAULT_PART_NAME)
    }

    /// Summary with box-derived defaults for missing volume, area and centre
    pub fn summary(&self) -> GeometrySummary {
        let dims = self.dimensions;
        GeometrySummary {
            volume: self.volume.unwrap_or_else(|| dims.box_volume()),
            surface_area: self.surface_area.unwrap_or_else(|| dims.box_area()),
            bounding_box: dims,
            center_of_mass: self.center_of_mass.unwrap_or_else(|| {
                Point3::new(dims.length / 2.0, dims.width / 2.0, dims.height / 2.0)
            }),
            face_count: self.face_count.unwrap_or(6),
            edge_count: self.edge_count.unwrap_or(12),
            vertex_count: self.vertex_count.unwrap_or(8),
        }
    }
}

/// Body of an analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub cad_data: CadData,
    #[serde(default)]
    pub material: Material,
    #[serde(default)]
    pub process: Process,
    #[serde(default = "default_production_volume")]
    pub production_volume: u32,
    #[serde(default = "default_true")]
    pub advanced_analysis: bool,
}

impl AnalyzeRequest {
    pub fn new(cad_data: CadData, material: Material, process: Process) -> Self {
        Self {
            cad_data,
            material,
            process,
            production_volume: default_production_volume(),
            advanced_analysis: true,
        }
    }

    #[must_use]
    pub fn with_production_volume(mut self, volume: u32) -> Self {
        self.production_volume = volume;
        self
    }

    /// Build a request from a locally summarised shape
    pub fn from_geometry(
        part_name: impl Into<String>,
        summary: &GeometrySummary,
        features: &FeatureSet,
        material: Material,
        process: Process,
    ) -> Self {
        let cad_data = CadData {
            part_name: Some(part_name.into()),
            volume: Some(summary.volume),
            surface_area: Some(summary.surface_area),
            dimensions: summary.bounding_box,
            center_of_mass: Some(summary.center_of_mass),
            face_count: Some(summary.face_count),
            edge_count: Some(summary.edge_count),
            vertex_count: Some(summary.vertex_count),
            features: features.to_cad_features(),
        };
        Self::new(cad_data, material, process)
    }

    /// Reject values no heuristic can make sense of
    pub fn validate(&self) -> DfmResult<()> {
        let dims = self.cad_data.dimensions;
        for (name, value) in [
            ("length", dims.length),
            ("width", dims.width),
            ("height", dims.height),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(DfmError::InvalidRequest(format!(
                    "dimension {} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [
            ("volume", self.cad_data.volume),
            ("surface_area", self.cad_data.surface_area),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(DfmError::InvalidRequest(format!(
                        "{} must be a non-negative number, got {}",
                        name, v
                    )));
                }
            }
        }
        if self.production_volume == 0 {
            return Err(DfmError::InvalidRequest(
                "production_volume must be at least 1".to_string(),
            ));
        }
        if let Some(hole) = self
            .cad_data
            .features
            .holes
            .iter()
            .find(|h| !h.diameter.is_finite() || h.diameter < 0.0)
        {
            return Err(DfmError::InvalidRequest(format!(
                "hole diameter must be a non-negative number, got {}",
                hole.diameter
            )));
        }
        Ok(())
    }
}
