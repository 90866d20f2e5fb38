//! Feature heuristics: best-effort face classification
//!
//! Each detector runs independently and tags faces in the feature map.
//! A face may end up with several kinds; nothing is reconciled.

use std::collections::HashSet;

use nalgebra::Point3;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::analysis::raycast::{BruteForceCaster, Ray, RayCaster};
use crate::core::error::DfmError;
use crate::core::rulebook::FeatureParams;
use crate::entities::feature::{
    ChamferCandidate, ChamferDetector, FeatureKind, FeatureSet, FilletCandidate, FilletDetector,
    HoleCandidate, HoleType, RibCandidate, ThinWallCandidate,
};
use crate::entities::geometry::GeometrySummary;
use crate::entities::shape::{Face, Shape, Surface};

/// Runs every face classifier over a shape
pub struct FeatureDetector<'a, C: RayCaster = BruteForceCaster> {
    params: &'a FeatureParams,
    caster: C,
}

impl<'a> FeatureDetector<'a, BruteForceCaster> {
    pub fn new(params: &'a FeatureParams) -> Self {
        Self {
            params,
            caster: BruteForceCaster,
        }
    }
}

impl<'a, C: RayCaster> FeatureDetector<'a, C> {
    /// Use a different intersection strategy for wall thickness
    pub fn with_caster(params: &'a FeatureParams, caster: C) -> Self {
        Self { params, caster }
    }

    pub fn detect(&self, shape: &Shape, summary: &GeometrySummary) -> FeatureSet {
        info!(faces = shape.faces.len(), "Detecting features");
        let mut set = FeatureSet::default();

        self.detect_holes(shape, &mut set);
        self.detect_fillets(shape, summary, &mut set);
        self.detect_chamfers(shape, &mut set);
        self.detect_thin_walls(shape, &mut set);
        self.detect_ribs(shape, &mut set);

        let counts = set.counts();
        debug!(
            holes = counts.holes,
            fillets = counts.fillets,
            chamfers = counts.chamfers,
            thin_walls = counts.thin_walls,
            ribs = counts.ribs,
            "Feature detection complete"
        );
        set
    }

    /// Every cylindrical face is a hole candidate
    fn detect_holes(&self, shape: &Shape, set: &mut FeatureSet) {
        for (i, face) in shape.faces.iter().enumerate() {
            let Surface::Cylinder {
                radius,
                axis,
                location,
            } = &face.surface
            else {
                continue;
            };

            let Some(axis) = axis.try_normalize(1e-12) else {
                log_skip(&DfmError::geometry(i, "cylinder axis has zero length"));
                continue;
            };

            let extents = face.bounds.extents();
            let depth = axis.x.abs() * extents.x.abs()
                + axis.y.abs() * extents.y.abs()
                + axis.z.abs() * extents.z.abs();

            set.holes.push(HoleCandidate {
                face: i,
                radius: *radius,
                axis,
                location: *location,
                depth,
                hole_type: HoleType::Unknown,
            });
            set.tag(i, FeatureKind::Hole);
        }
    }

    /// Small-radius blends and tangent blends, unioned by face centre
    fn detect_fillets(&self, shape: &Shape, summary: &GeometrySummary, set: &mut FeatureSet) {
        let mut seen = HashSet::new();
        let threshold = self.params.fillet_radius_ratio * summary.bounding_box.max();

        for (i, face) in shape.faces.iter().enumerate() {
            if let Some(radius) = face.surface.radius() {
                if radius > 0.0 && radius < threshold && seen.insert(self.dedup_key(&face.center)) {
                    set.fillets.push(FilletCandidate {
                        face: i,
                        radius: Some(radius),
                        location: face.center,
                        detector: FilletDetector::SmallRadius,
                    });
                    set.tag(i, FeatureKind::Fillet);
                }
            }
        }

        for (i, face) in shape.faces.iter().enumerate() {
            if !matches!(face.surface, Surface::Cylinder { .. } | Surface::Torus { .. }) {
                continue;
            }
            if self.is_tangent_to_neighbour(shape, face) && seen.insert(self.dedup_key(&face.center))
            {
                set.fillets.push(FilletCandidate {
                    face: i,
                    radius: face.surface.radius(),
                    location: face.center,
                    detector: FilletDetector::Tangent,
                });
                set.tag(i, FeatureKind::Fillet);
            }
        }
    }

    fn is_tangent_to_neighbour(&self, shape: &Shape, face: &Face) -> bool {
        shape.face_edges(face).any(|edge| {
            if edge.faces.len() != 2 || edge.normals.len() != 2 {
                return false;
            }
            match (
                edge.normals[0].try_normalize(1e-12),
                edge.normals[1].try_normalize(1e-12),
            ) {
                (Some(a), Some(b)) => 1.0 - a.dot(&b).abs() < self.params.tangent_tolerance,
                _ => false,
            }
        })
    }

    /// Edge-length disparity, conical faces and elongated small faces
    fn detect_chamfers(&self, shape: &Shape, set: &mut FeatureSet) {
        let total_area = shape.total_face_area();
        let mut seen = HashSet::new();

        let mut accept = |set: &mut FeatureSet, i: usize, face: &Face, detector| {
            if seen.insert(self.dedup_key(&face.center)) {
                set.chamfers.push(ChamferCandidate {
                    face: i,
                    location: face.center,
                    detector,
                });
                set.tag(i, FeatureKind::Chamfer);
            }
        };

        for (i, face) in shape.faces.iter().enumerate() {
            if !face.surface.is_plane() || face.area >= self.params.chamfer_area_fraction * total_area
            {
                continue;
            }
            let mut lengths: Vec<f64> = shape.face_edges(face).map(|e| e.length).collect();
            if lengths.len() != 4 {
                continue;
            }
            lengths.sort_by(|a, b| a.total_cmp(b));
            if lengths[0] < self.params.chamfer_edge_ratio * lengths[2] {
                accept(set, i, face, ChamferDetector::EdgeDisparity);
            }
        }

        for (i, face) in shape.faces.iter().enumerate() {
            if matches!(face.surface, Surface::Cone { .. }) {
                accept(set, i, face, ChamferDetector::Conical);
            }
        }

        for (i, face) in shape.faces.iter().enumerate() {
            if !face.surface.is_plane() || face.area >= self.params.chamfer_max_area {
                continue;
            }
            if elongation(face).is_some_and(|e| e > self.params.chamfer_aspect_ratio) {
                accept(set, i, face, ChamferDetector::Elongated);
            }
        }
    }

    /// Ray cast from every face into the material
    fn detect_thin_walls(&self, shape: &Shape, set: &mut FeatureSet) {
        let min_area = self.params.min_face_area_fraction * shape.total_face_area();
        let min_distance = self.params.min_ray_distance;

        let walls: Vec<ThinWallCandidate> = shape
            .faces
            .par_iter()
            .enumerate()
            .filter(|(_, face)| face.area >= min_area)
            .filter_map(|(i, face)| {
                let normal = match face.unit_normal(i) {
                    Ok(n) => n,
                    Err(e) => {
                        log_skip(&e);
                        return None;
                    }
                };
                let ray = Ray::new(face.center, -normal);
                self.caster
                    .cast(shape, &ray, i, min_distance)
                    .map(|hit| ThinWallCandidate {
                        face: i,
                        thickness: hit.distance,
                        location: face.center,
                    })
            })
            .collect();

        for wall in &walls {
            set.tag(wall.face, FeatureKind::ThinWall);
        }
        set.thin_walls = walls;
    }

    /// Walls much thinner than average on long narrow faces; hole bores
    /// are never ribs
    fn detect_ribs(&self, shape: &Shape, set: &mut FeatureSet) {
        let Some(average) = set.average_wall_thickness() else {
            return;
        };

        let ribs: Vec<RibCandidate> = set
            .thin_walls
            .iter()
            .filter(|w| !set.kinds_of(w.face).contains(&FeatureKind::Hole))
            .filter(|w| w.thickness < self.params.rib_thickness_ratio * average)
            .filter_map(|w| {
                let face = shape.faces.get(w.face)?;
                let [shortest, _, longest] = face.sorted_extents();
                let is_rib = longest > self.params.rib_length_ratio * shortest
                    && longest > self.params.rib_thickness_multiple * w.thickness;
                is_rib.then(|| RibCandidate {
                    face: w.face,
                    thickness: w.thickness,
                    length: longest,
                    location: w.location,
                })
            })
            .collect();

        for rib in &ribs {
            set.tag(rib.face, FeatureKind::Rib);
        }
        set.ribs = ribs;
    }

    fn dedup_key(&self, point: &Point3<f64>) -> (i64, i64, i64) {
        let step = if self.params.dedup_precision > 0.0 {
            self.params.dedup_precision
        } else {
            0.1
        };
        let q = |v: f64| (v / step).round() as i64;
        (q(point.x), q(point.y), q(point.z))
    }
}

/// Longest over smallest non-zero extent of a face's bounds
fn elongation(face: &Face) -> Option<f64> {
    let extents: Vec<f64> = face
        .sorted_extents()
        .into_iter()
        .filter(|e| *e > 1e-9)
        .collect();
    match extents.as_slice() {
        [smallest, .., longest] => Some(longest / smallest),
        _ => None,
    }
}

fn log_skip(err: &DfmError) {
    warn!(error = %err, "Skipping feature candidate");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::raycast::Hit;
    use crate::analysis::summarizer::summarize_shape;
    use crate::entities::shape::fixtures::{box_shape, box_with_hole};
    use crate::entities::shape::{Aabb, Edge};
    use nalgebra::Vector3;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn detect(shape: &Shape) -> FeatureSet {
        let params = FeatureParams::default();
        FeatureDetector::new(&params).detect(shape, &summarize_shape(shape))
    }

    #[test]
    fn test_plain_box_walls() {
        let shape = box_shape(100.0, 50.0, 25.0);
        let set = detect(&shape);

        assert!(set.holes.is_empty());
        assert_eq!(set.thin_walls.len(), 6);
        assert_eq!(set.min_wall_thickness(), Some(25.0));
        assert!(set.ribs.is_empty());
    }

    #[test]
    fn test_cylinder_is_hole_candidate() {
        let shape = box_with_hole(100.0, 100.0, 10.0, 5.0);
        let set = detect(&shape);

        assert_eq!(set.holes.len(), 1);
        let hole = &set.holes[0];
        assert_eq!(hole.face, 6);
        assert_eq!(hole.diameter(), 10.0);
        assert!((hole.depth - 10.0).abs() < 1e-9);
        assert_eq!(hole.hole_type, HoleType::Unknown);
        assert!(set.kinds_of(6).contains(&FeatureKind::Hole));
    }

    #[test]
    fn test_small_cylinder_is_also_fillet() {
        // Radius 2 is below 10% of the 100mm box, so the face is both
        let shape = box_with_hole(100.0, 100.0, 10.0, 2.0);
        let set = detect(&shape);

        assert_eq!(set.fillets.len(), 1);
        assert_eq!(set.fillets[0].detector, FilletDetector::SmallRadius);
        let kinds = set.kinds_of(6);
        assert!(kinds.contains(&FeatureKind::Hole));
        assert!(kinds.contains(&FeatureKind::Fillet));
    }

    #[test]
    fn test_tangent_blend_detected_once() {
        let mut shape = box_with_hole(100.0, 100.0, 10.0, 20.0);
        shape.edges.push(Edge {
            length: 10.0,
            faces: vec![0, 6],
            normals: vec![Vector3::x(), -Vector3::x()],
        });
        shape.faces[6].edges = vec![0];

        let set = detect(&shape);
        assert_eq!(set.fillets.len(), 1);
        assert_eq!(set.fillets[0].detector, FilletDetector::Tangent);
    }

    #[test]
    fn test_conical_face_is_chamfer() {
        let mut shape = box_shape(50.0, 50.0, 50.0);
        shape.faces.push(Face {
            surface: Surface::Cone {
                half_angle: 45.0,
                axis: Vector3::z(),
                apex: Point3::new(25.0, 25.0, 60.0),
            },
            area: 30.0,
            center: Point3::new(25.0, 25.0, 49.0),
            normal: Vector3::new(0.7, 0.0, 0.7),
            bounds: Aabb::new(Point3::new(22.0, 22.0, 48.0), Point3::new(28.0, 28.0, 50.0)),
            edges: Vec::new(),
        });

        let set = detect(&shape);
        assert_eq!(set.chamfers.len(), 1);
        assert_eq!(set.chamfers[0].detector, ChamferDetector::Conical);
    }

    #[test]
    fn test_edge_disparity_chamfer() {
        let mut shape = box_shape(100.0, 100.0, 100.0);
        let first_edge = shape.edges.len();
        for length in [1.0, 1.0, 40.0, 40.0] {
            shape.edges.push(Edge {
                length,
                faces: Vec::new(),
                normals: Vec::new(),
            });
        }
        shape.faces.push(Face {
            surface: Surface::Plane,
            area: 40.0,
            center: Point3::new(50.0, 99.5, 99.5),
            normal: Vector3::new(0.0, 0.7071, 0.7071),
            bounds: Aabb::new(Point3::new(30.0, 99.0, 99.0), Point3::new(70.0, 100.0, 100.0)),
            edges: (first_edge..first_edge + 4).collect(),
        });

        let set = detect(&shape);
        // Same face also satisfies the elongation detector; the union keeps one
        assert_eq!(set.chamfers.len(), 1);
        assert_eq!(set.chamfers[0].detector, ChamferDetector::EdgeDisparity);
        // Too small to be ray cast
        assert_eq!(set.kinds_of(6), vec![FeatureKind::Chamfer]);
    }

    #[test]
    fn test_small_elongated_plane_is_chamfer() {
        let mut shape = box_shape(100.0, 100.0, 100.0);
        shape.faces.push(Face {
            surface: Surface::Plane,
            area: 20.0,
            center: Point3::new(50.0, 99.5, 100.0),
            normal: Vector3::z(),
            bounds: Aabb::new(Point3::new(30.0, 99.0, 100.0), Point3::new(70.0, 100.0, 100.0)),
            edges: Vec::new(),
        });

        let set = detect(&shape);
        assert_eq!(set.chamfers.len(), 1);
        assert_eq!(set.chamfers[0].face, 6);
        assert_eq!(set.chamfers[0].detector, ChamferDetector::Elongated);
    }

    #[test]
    fn test_small_square_plane_is_not_chamfer() {
        let mut shape = box_shape(100.0, 100.0, 100.0);
        shape.faces.push(Face {
            surface: Surface::Plane,
            area: 50.0,
            center: Point3::new(50.0, 50.0, 100.0),
            normal: Vector3::z(),
            bounds: Aabb::new(Point3::new(45.0, 45.0, 100.0), Point3::new(55.0, 55.0, 100.0)),
            edges: Vec::new(),
        });

        assert!(detect(&shape).chamfers.is_empty());
    }

    #[test]
    fn test_hole_bore_is_not_rib() {
        let shape = box_with_hole(100.0, 100.0, 10.0, 1.0);
        let params = FeatureParams::default();
        let wall = |face: usize, thickness: f64| ThinWallCandidate {
            face,
            thickness,
            location: shape.faces[face].center,
        };
        let mut set = FeatureSet {
            thin_walls: vec![wall(0, 1.0), wall(6, 1.0), wall(4, 20.0)],
            ..Default::default()
        };
        set.tag(6, FeatureKind::Hole);

        FeatureDetector::new(&params).detect_ribs(&shape, &mut set);
        let faces: Vec<usize> = set.ribs.iter().map(|r| r.face).collect();
        assert_eq!(faces, vec![0]);
    }

    #[test]
    fn test_degenerate_normal_is_skipped() {
        let mut shape = box_shape(10.0, 10.0, 10.0);
        shape.faces[2].normal = Vector3::zeros();
        let set = detect(&shape);
        // Face 2 is skipped, and face 3 no longer has anything opposite it
        assert_eq!(set.thin_walls.len(), 4);
        assert!(set.thin_walls.iter().all(|w| w.face != 2 && w.face != 3));
    }

    #[test]
    fn test_rib_detection() {
        // A 2mm wide, 40mm long fin standing on a plate: its side faces are
        // much closer together than the plate's outer faces
        let mut shape = box_shape(200.0, 200.0, 50.0);
        let fin = |x: f64, normal: Vector3<f64>| Face {
            surface: Surface::Plane,
            area: 40.0 * 40.0,
            center: Point3::new(x, 100.0, 25.0),
            normal,
            bounds: Aabb::new(Point3::new(x, 80.0, 5.0), Point3::new(x, 120.0, 45.0)),
            edges: Vec::new(),
        };
        shape.faces.push(fin(99.0, -Vector3::x()));
        shape.faces.push(fin(101.0, Vector3::x()));

        let set = detect(&shape);
        assert_eq!(set.ribs.len(), 2);
        assert!(set.ribs.iter().all(|r| (r.thickness - 2.0).abs() < 1e-9));
        assert!(set.kinds_of(6).contains(&FeatureKind::Rib));
    }

    #[test]
    fn test_custom_caster_is_used() {
        struct CountingCaster(AtomicUsize);
        impl RayCaster for CountingCaster {
            fn cast(&self, _: &Shape, _: &Ray, exclude: usize, _: f64) -> Option<Hit> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Some(Hit {
                    face: exclude,
                    distance: 3.0,
                })
            }
        }

        let shape = box_shape(10.0, 10.0, 10.0);
        let params = FeatureParams::default();
        let detector = FeatureDetector::with_caster(&params, CountingCaster(AtomicUsize::new(0)));
        let set = detector.detect(&shape, &summarize_shape(&shape));

        assert_eq!(detector.caster.0.load(Ordering::SeqCst), 6);
        assert!(set.thin_walls.iter().all(|w| w.thickness == 3.0));
    }
}
