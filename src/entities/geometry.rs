//! Scalar geometry summary of a part

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Bounding-box dimensions in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(length: f64, width: f64, height: f64) -> Self {
        Self {
            length,
            width,
            height,
        }
    }

    pub fn max(&self) -> f64 {
        self.length.max(self.width).max(self.height)
    }

    pub fn min(&self) -> f64 {
        self.length.min(self.width).min(self.height)
    }

    /// Longest over shortest dimension; `None` when the shortest is not positive
    pub fn aspect_ratio(&self) -> Option<f64> {
        let min = self.min();
        if min > 0.0 {
            Some(self.max() / min)
        } else {
            None
        }
    }

    /// Volume of the box itself
    pub fn box_volume(&self) -> f64 {
        self.length * self.width * self.height
    }

    /// Surface area of the box itself
    pub fn box_area(&self) -> f64 {
        2.0 * (self.length * self.width + self.length * self.height + self.width * self.height)
    }

    /// Name of the longest and shortest axis, for messages
    pub fn extreme_axes(&self) -> (&'static str, &'static str) {
        let named = [
            ("length", self.length),
            ("width", self.width),
            ("height", self.height),
        ];
        let longest = named
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|n| n.0)
            .unwrap_or("length");
        let shortest = named
            .iter()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|n| n.0)
            .unwrap_or("height");
        (longest, shortest)
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.1} x {:.1} x {:.1} mm",
            self.length, self.width, self.height
        )
    }
}

/// Immutable scalar metrics of a shape, produced once per analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometrySummary {
    /// Volume in mm³
    pub volume: f64,
    /// Surface area in mm²
    pub surface_area: f64,
    pub bounding_box: Dimensions,
    pub center_of_mass: Point3<f64>,
    pub face_count: usize,
    pub edge_count: usize,
    pub vertex_count: usize,
}

impl Default for GeometrySummary {
    fn default() -> Self {
        Self {
            volume: 0.0,
            surface_area: 0.0,
            bounding_box: Dimensions::default(),
            center_of_mass: Point3::origin(),
            face_count: 0,
            edge_count: 0,
            vertex_count: 0,
        }
    }
}

impl GeometrySummary {
    pub fn volume_cm3(&self) -> f64 {
        self.volume / 1000.0
    }

    /// Average wall thickness of a solid plate, `2V/A`.
    /// `None` when either quantity is zero or negative.
    pub fn estimated_wall_thickness(&self) -> Option<f64> {
        if self.volume > 0.0 && self.surface_area > 0.0 {
            Some(2.0 * self.volume / self.surface_area)
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.volume == 0.0 && self.face_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimated_wall_thickness() {
        let summary = GeometrySummary {
            volume: 125_000.0,
            surface_area: 17_500.0,
            bounding_box: Dimensions::new(100.0, 50.0, 25.0),
            ..Default::default()
        };
        let t = summary.estimated_wall_thickness().unwrap();
        assert!((t - 14.285714).abs() < 1e-4);
    }

    #[test]
    fn test_zero_volume_has_no_thickness() {
        let summary = GeometrySummary {
            volume: 0.0,
            surface_area: 100.0,
            ..Default::default()
        };
        assert_eq!(summary.estimated_wall_thickness(), None);

        let summary = GeometrySummary {
            volume: 100.0,
            surface_area: 0.0,
            ..Default::default()
        };
        assert_eq!(summary.estimated_wall_thickness(), None);
    }

    #[test]
    fn test_dimension_helpers() {
        let dims = Dimensions::new(500.0, 10.0, 20.0);
        assert_eq!(dims.max(), 500.0);
        assert_eq!(dims.min(), 10.0);
        assert_eq!(dims.aspect_ratio(), Some(50.0));
        assert_eq!(dims.extreme_axes(), ("length", "width"));
        assert_eq!(Dimensions::new(1.0, 0.0, 1.0).aspect_ratio(), None);
    }

    #[test]
    fn test_box_metrics() {
        let dims = Dimensions::new(100.0, 50.0, 25.0);
        assert_eq!(dims.box_volume(), 125_000.0);
        assert_eq!(dims.box_area(), 17_500.0);
    }
}
