//! Ray casting against shape faces
//!
//! Wall thickness is measured by shooting a ray from each face into the
//! material. The intersection test sits behind [`RayCaster`] so that an
//! accelerated implementation can replace the brute-force one without
//! touching the feature heuristics.

use nalgebra::{Point3, Vector3};

use crate::entities::shape::{Face, Shape, Surface};

/// Tolerance when checking that an intersection lies inside face bounds
const BOUNDS_TOLERANCE: f64 = 1e-6;

/// A half-line with unit direction
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point3<f64>,
    pub direction: Vector3<f64>,
}

impl Ray {
    pub fn new(origin: Point3<f64>, direction: Vector3<f64>) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, t: f64) -> Point3<f64> {
        self.origin + self.direction * t
    }
}

/// Nearest face hit by a ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub face: usize,
    pub distance: f64,
}

/// Face intersection strategy
pub trait RayCaster: Send + Sync {
    /// Nearest hit on any face except `exclude`, ignoring hits closer than
    /// `min_distance`
    fn cast(&self, shape: &Shape, ray: &Ray, exclude: usize, min_distance: f64) -> Option<Hit>;
}

/// Tests every face; O(faces) per ray, O(faces²) per shape
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForceCaster;

impl RayCaster for BruteForceCaster {
    fn cast(&self, shape: &Shape, ray: &Ray, exclude: usize, min_distance: f64) -> Option<Hit> {
        shape
            .faces
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != exclude)
            .filter_map(|(i, face)| {
                intersect_face(face, ray, min_distance).map(|distance| Hit { face: i, distance })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

/// Distance along the ray to a face, if it is hit beyond `min_distance`
pub fn intersect_face(face: &Face, ray: &Ray, min_distance: f64) -> Option<f64> {
    match &face.surface {
        Surface::Plane => intersect_plane(face, ray)
            .filter(|&t| t >= min_distance && face.bounds.contains(&ray.at(t), BOUNDS_TOLERANCE)),
        Surface::Cylinder {
            radius,
            axis,
            location,
        } => intersect_cylinder(*radius, axis, location, ray)
            .into_iter()
            .flatten()
            .filter(|&t| t >= min_distance && face.bounds.contains(&ray.at(t), BOUNDS_TOLERANCE))
            .min_by(|a, b| a.total_cmp(b)),
        // Cones, tori and free-form faces are approximated by their bounds
        _ => face
            .bounds
            .ray_entry(&ray.origin, &ray.direction)
            .filter(|&t| t >= min_distance),
    }
}

fn intersect_plane(face: &Face, ray: &Ray) -> Option<f64> {
    let denom = ray.direction.dot(&face.normal);
    if denom.abs() < 1e-12 {
        return None;
    }
    let t = (face.center - ray.origin).dot(&face.normal) / denom;
    (t.is_finite() && t >= 0.0).then_some(t)
}

/// Both roots of the ray/infinite-cylinder quadratic
fn intersect_cylinder(
    radius: f64,
    axis: &Vector3<f64>,
    location: &Point3<f64>,
    ray: &Ray,
) -> [Option<f64>; 2] {
    let Some(axis) = axis.try_normalize(1e-12) else {
        return [None, None];
    };
    let offset = ray.origin - location;
    let d = ray.direction - axis * ray.direction.dot(&axis);
    let m = offset - axis * offset.dot(&axis);

    let a = d.dot(&d);
    if a < 1e-12 {
        // Ray parallel to the axis
        return [None, None];
    }
    let b = 2.0 * m.dot(&d);
    let c = m.dot(&m) - radius * radius;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return [None, None];
    }
    let sqrt = disc.sqrt();
    let root = |t: f64| (t >= 0.0).then_some(t);
    [root((-b - sqrt) / (2.0 * a)), root((-b + sqrt) / (2.0 * a))]
}
