//! Geometry summarizer: reduce a shape to scalar metrics

use crate::core::error::{DfmError, DfmResult};
use crate::entities::geometry::{Dimensions, GeometrySummary};
use crate::entities::shape::{Shape, ShapeDocument};

/// Summarize the active object of a document.
///
/// A missing document is an error; a document without a shape yields an
/// all-zero summary.
pub fn summarize(document: Option<&ShapeDocument>) -> DfmResult<GeometrySummary> {
    let document = document.ok_or(DfmError::NoActiveDocument)?;

    match document.active().and_then(|o| o.shape.as_ref()) {
        Some(shape) => Ok(summarize_shape(shape)),
        None => {
            tracing::warn!(document = %document.name, "Document has no shape to summarize");
            Ok(GeometrySummary::default())
        }
    }
}

/// Summarize a single shape
pub fn summarize_shape(shape: &Shape) -> GeometrySummary {
    let extents = shape.bounding_box().extents();
    GeometrySummary {
        volume: shape.volume.max(0.0),
        surface_area: shape.area.max(0.0),
        bounding_box: Dimensions::new(extents.x.abs(), extents.y.abs(), extents.z.abs()),
        center_of_mass: shape.center_of_mass,
        face_count: shape.faces.len(),
        edge_count: shape.edges.len(),
        vertex_count: shape.vertex_count,
    }
}
