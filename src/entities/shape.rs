//! Shape documents exported by the host CAD kernel
//!
//! A document lists objects; each object may carry a boundary
//! representation summarised per face: surface type, area, centre,
//! outward normal, bounds and edge adjacency. Nothing here computes
//! geometry from scratch, it only describes what the kernel reported.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{DfmError, DfmResult};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Default for Aabb {
    fn default() -> Self {
        Self {
            min: Point3::origin(),
            max: Point3::origin(),
        }
    }
}

impl Aabb {
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Size along x, y and z
    pub fn extents(&self) -> Vector3<f64> {
        self.max - self.min
    }

    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Smallest box containing both
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: Point3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Point3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    /// Point containment with a tolerance on every side
    pub fn contains(&self, point: &Point3<f64>, tolerance: f64) -> bool {
        (0..3).all(|i| point[i] >= self.min[i] - tolerance && point[i] <= self.max[i] + tolerance)
    }

    /// Slab test; returns the entry distance along `direction`
    pub fn ray_entry(&self, origin: &Point3<f64>, direction: &Vector3<f64>) -> Option<f64> {
        let mut t_min = f64::NEG_INFINITY;
        let mut t_max = f64::INFINITY;

        for i in 0..3 {
            if direction[i].abs() < 1e-12 {
                if origin[i] < self.min[i] || origin[i] > self.max[i] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / direction[i];
            let mut t0 = (self.min[i] - origin[i]) * inv;
            let mut t1 = (self.max[i] - origin[i]) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }

        if t_max < 0.0 {
            None
        } else {
            Some(t_min.max(0.0))
        }
    }
}

/// Mathematical surface underlying a face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Surface {
    Plane,
    Cylinder {
        radius: f64,
        axis: Vector3<f64>,
        location: Point3<f64>,
    },
    Cone {
        half_angle: f64,
        axis: Vector3<f64>,
        apex: Point3<f64>,
    },
    Torus {
        major_radius: f64,
        minor_radius: f64,
        axis: Vector3<f64>,
        center: Point3<f64>,
    },
    Other,
}

impl Surface {
    pub fn is_plane(&self) -> bool {
        matches!(self, Surface::Plane)
    }

    pub fn is_curved(&self) -> bool {
        !self.is_plane()
    }

    /// Blend radius for surfaces that have one
    pub fn radius(&self) -> Option<f64> {
        match self {
            Surface::Cylinder { radius, .. } => Some(*radius),
            Surface::Torus { minor_radius, .. } => Some(*minor_radius),
            _ => None,
        }
    }
}

/// A bounded face of the shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub surface: Surface,
    pub area: f64,
    pub center: Point3<f64>,
    /// Outward normal at the face centre
    pub normal: Vector3<f64>,
    pub bounds: Aabb,
    /// Indices into the shape's edge list
    #[serde(default)]
    pub edges: Vec<usize>,
}

impl Face {
    /// Unit outward normal, failing for degenerate faces
    pub fn unit_normal(&self, index: usize) -> DfmResult<Vector3<f64>> {
        if !self.normal.iter().all(|c| c.is_finite()) {
            return Err(DfmError::geometry(index, "normal is not finite"));
        }
        self.normal
            .try_normalize(1e-12)
            .ok_or_else(|| DfmError::geometry(index, "normal has zero length"))
    }

    /// Face bounds sorted from shortest to longest extent
    pub fn sorted_extents(&self) -> [f64; 3] {
        let e = self.bounds.extents();
        let mut dims = [e.x.abs(), e.y.abs(), e.z.abs()];
        dims.sort_by(|a, b| a.total_cmp(b));
        dims
    }
}

/// An edge with the faces it borders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub length: f64,
    #[serde(default)]
    pub faces: Vec<usize>,
    /// Normals of the adjacent faces sampled at the edge midpoint,
    /// in the same order as `faces`
    #[serde(default)]
    pub normals: Vec<Vector3<f64>>,
}

fn origin() -> Point3<f64> {
    Point3::origin()
}

/// Boundary representation summary of a solid
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Shape {
    pub volume: f64,
    pub area: f64,
    #[serde(default = "origin")]
    pub center_of_mass: Point3<f64>,
    #[serde(default)]
    pub vertex_count: usize,
    #[serde(default)]
    pub faces: Vec<Face>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Shape {
    /// Union of all face bounds; zero-sized when there are no faces
    pub fn bounding_box(&self) -> Aabb {
        let mut faces = self.faces.iter();
        match faces.next() {
            Some(first) => faces.fold(first.bounds, |acc, f| acc.union(&f.bounds)),
            None => Aabb::default(),
        }
    }

    /// Sum of face areas, falling back to the reported area
    pub fn total_face_area(&self) -> f64 {
        let sum: f64 = self.faces.iter().map(|f| f.area).sum();
        if sum > 0.0 {
            sum
        } else {
            self.area
        }
    }

    /// Edges of a face, skipping dangling indices
    pub fn face_edges<'a>(&'a self, face: &'a Face) -> impl Iterator<Item = &'a Edge> + 'a {
        face.edges.iter().filter_map(move |&i| self.edges.get(i))
    }
}

/// A named object in a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeObject {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Shape>,
}

/// A CAD document as exported by the host kernel
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShapeDocument {
    pub name: String,
    /// Object selected in the host application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_object: Option<String>,
    #[serde(default)]
    pub objects: Vec<ShapeObject>,
}

impl ShapeDocument {
    /// Load a document from JSON, or YAML when the extension says so
    pub fn load(path: &Path) -> DfmResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
            .unwrap_or(false);

        if is_yaml {
            serde_yml::from_str(&contents).map_err(|e| {
                DfmError::InvalidRequest(format!("{}: {}", path.display(), e))
            })
        } else {
            Ok(serde_json::from_str(&contents)?)
        }
    }

    /// The selected object, or the first object carrying a shape
    pub fn active(&self) -> Option<&ShapeObject> {
        if let Some(ref name) = self.active_object {
            if let Some(obj) = self.objects.iter().find(|o| &o.name == name) {
                return Some(obj);
            }
        }
        self.objects
            .iter()
            .find(|o| o.shape.is_some())
            .or_else(|| self.objects.first())
    }

    /// Part name used in analysis requests
    pub fn part_name(&self) -> String {
        self.active()
            .map(|o| o.label.clone().unwrap_or_else(|| o.name.clone()))
            .unwrap_or_else(|| self.name.clone())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Hand-built shapes shared by unit tests

    use super::*;

    fn plane(center: Point3<f64>, normal: Vector3<f64>, min: Point3<f64>, max: Point3<f64>) -> Face {
        let e = max - min;
        let dims = [e.x, e.y, e.z];
        let mut sorted = dims;
        sorted.sort_by(|a, b| a.total_cmp(b));
        Face {
            surface: Surface::Plane,
            area: sorted[1] * sorted[2],
            center,
            normal,
            bounds: Aabb::new(min, max),
            edges: Vec::new(),
        }
    }

    /// Axis-aligned box with six planar faces
    pub fn box_shape(l: f64, w: f64, h: f64) -> Shape {
        let faces = vec![
            plane(Point3::new(0.0, w / 2.0, h / 2.0), -Vector3::x(), Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, w, h)),
            plane(Point3::new(l, w / 2.0, h / 2.0), Vector3::x(), Point3::new(l, 0.0, 0.0), Point3::new(l, w, h)),
            plane(Point3::new(l / 2.0, 0.0, h / 2.0), -Vector3::y(), Point3::new(0.0, 0.0, 0.0), Point3::new(l, 0.0, h)),
            plane(Point3::new(l / 2.0, w, h / 2.0), Vector3::y(), Point3::new(0.0, w, 0.0), Point3::new(l, w, h)),
            plane(Point3::new(l / 2.0, w / 2.0, 0.0), -Vector3::z(), Point3::new(0.0, 0.0, 0.0), Point3::new(l, w, 0.0)),
            plane(Point3::new(l / 2.0, w / 2.0, h), Vector3::z(), Point3::new(0.0, 0.0, h), Point3::new(l, w, h)),
        ];
        Shape {
            volume: l * w * h,
            area: 2.0 * (l * w + l * h + w * h),
            center_of_mass: Point3::new(l / 2.0, w / 2.0, h / 2.0),
            vertex_count: 8,
            faces,
            edges: Vec::new(),
        }
    }

    /// Box with a vertical through hole of the given radius at its centre
    pub fn box_with_hole(l: f64, w: f64, h: f64, radius: f64) -> Shape {
        let mut shape = box_shape(l, w, h);
        let c = Point3::new(l / 2.0, w / 2.0, h / 2.0);
        shape.faces.push(Face {
            surface: Surface::Cylinder {
                radius,
                axis: Vector3::z(),
                location: Point3::new(c.x, c.y, 0.0),
            },
            area: 2.0 * std::f64::consts::PI * radius * h,
            center: Point3::new(c.x + radius, c.y, c.z),
            normal: -Vector3::x(),
            bounds: Aabb::new(
                Point3::new(c.x - radius, c.y - radius, 0.0),
                Point3::new(c.x + radius, c.y + radius, h),
            ),
            edges: Vec::new(),
        });
        shape.volume -= std::f64::consts::PI * radius * radius * h;
        shape
    }

    pub fn document(shape: Shape) -> ShapeDocument {
        ShapeDocument {
            name: "TestDoc".to_string(),
            active_object: Some("Body".to_string()),
            objects: vec![ShapeObject {
                name: "Body".to_string(),
                label: Some("Bracket".to_string()),
                shape: Some(shape),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_bounding_box_is_union_of_faces() {
        let shape = box_shape(100.0, 50.0, 25.0);
        let bb = shape.bounding_box();
        let e = bb.extents();
        assert_eq!((e.x, e.y, e.z), (100.0, 50.0, 25.0));
    }

    #[test]
    fn test_empty_shape_has_zero_box() {
        let shape = Shape::default();
        assert_eq!(shape.bounding_box().extents(), Vector3::zeros());
    }

    #[test]
    fn test_ray_entry_slab() {
        let bb = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let t = bb.ray_entry(&Point3::new(-2.0, 0.5, 0.5), &Vector3::x());
        assert_eq!(t, Some(2.0));
        assert!(bb
            .ray_entry(&Point3::new(-2.0, 5.0, 0.5), &Vector3::x())
            .is_none());
        assert!(bb
            .ray_entry(&Point3::new(3.0, 0.5, 0.5), &Vector3::x())
            .is_none());
    }

    #[test]
    fn test_unit_normal_rejects_zero() {
        let mut shape = box_shape(1.0, 1.0, 1.0);
        shape.faces[0].normal = Vector3::zeros();
        assert!(shape.faces[0].unit_normal(0).is_err());
        assert!(shape.faces[1].unit_normal(1).is_ok());
    }

    #[test]
    fn test_active_object_selection() {
        let mut doc = document(box_shape(10.0, 10.0, 10.0));
        assert_eq!(doc.active().map(|o| o.name.as_str()), Some("Body"));
        assert_eq!(doc.part_name(), "Bracket");

        doc.active_object = Some("Missing".to_string());
        assert_eq!(doc.active().map(|o| o.name.as_str()), Some("Body"));
    }

    #[test]
    fn test_load_json_and_yaml() {
        let tmp = tempdir().unwrap();
        let doc = document(box_shape(20.0, 10.0, 5.0));

        let json_path = tmp.path().join("part.json");
        std::fs::write(&json_path, serde_json::to_string(&doc).unwrap()).unwrap();
        assert_eq!(ShapeDocument::load(&json_path).unwrap(), doc);

        let yaml_path = tmp.path().join("part.yaml");
        std::fs::write(&yaml_path, serde_yml::to_string(&doc).unwrap()).unwrap();
        let loaded = ShapeDocument::load(&yaml_path).unwrap();
        assert_eq!(loaded.objects.len(), 1);
        assert_eq!(loaded.objects[0].shape.as_ref().map(|s| s.faces.len()), Some(6));
    }

    #[test]
    fn test_surface_tagging() {
        let json = r#"{"type":"cylinder","radius":2.5,"axis":[0,0,1],"location":[0,0,0]}"#;
        let surface: Surface = serde_json::from_str(json).unwrap();
        assert_eq!(surface.radius(), Some(2.5));
        assert!(surface.is_curved());
    }
}
