//! Complexity indicators: geometric complexity, feature complexity and moldability

use crate::core::rulebook::ComplexityParams;
use crate::entities::geometry::GeometrySummary;
use crate::entities::request::CadFeatures;
use crate::entities::response::ComplexityReport;

/// Geometric complexity score with the factors that produced it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometricComplexity {
    pub score: f64,
    pub surface_to_volume_ratio: f64,
    pub feature_density: f64,
    pub aspect_ratio: f64,
    pub feature_count: usize,
}

pub fn geometric_complexity(
    summary: &GeometrySummary,
    features: &CadFeatures,
    params: &ComplexityParams,
) -> GeometricComplexity {
    let sv = summary.surface_area / summary.volume.max(0.001);
    let feature_count = features.holes.len() + features.thin_walls.len();
    let density = feature_count as f64 / summary.face_count.max(1) as f64;
    let dims = summary.bounding_box;
    let aspect = dims.max() / dims.min().max(0.001);
    let aspect_term = (aspect / params.aspect_divisor).min(params.aspect_cap);

    let score = (sv * params.surface_ratio_weight
        + density * params.feature_density_weight
        + aspect_term * params.aspect_weight
        + feature_count as f64 * params.feature_weight)
        .min(100.0);

    GeometricComplexity {
        score,
        surface_to_volume_ratio: sv,
        feature_density: density,
        aspect_ratio: aspect,
        feature_count,
    }
}

pub fn complexity_rating(score: f64, params: &ComplexityParams) -> &'static str {
    let [very_high, high, medium, low] = params.rating_bounds;
    if score >= very_high {
        "Very High"
    } else if score >= high {
        "High"
    } else if score >= medium {
        "Medium"
    } else if score >= low {
        "Low"
    } else {
        "Very Low"
    }
}

pub fn implications(rating: &str) -> &'static [&'static str] {
    match rating {
        "Very High" => &[
            "Likely to require advanced manufacturing techniques",
            "Higher tooling and setup costs expected",
            "May require multiple manufacturing operations",
            "Consider design simplification to reduce costs",
            "Detailed quality control procedures recommended",
        ],
        "High" => &[
            "May require specialized tooling",
            "Higher than average setup time",
            "Consider design optimization for manufacturing",
            "Multiple machining operations likely required",
        ],
        "Medium" => &[
            "Standard manufacturing processes applicable",
            "Moderate tooling requirements",
            "Average setup and production time expected",
        ],
        "Low" => &[
            "Simple manufacturing processes sufficient",
            "Minimal tooling requirements",
            "Quick setup and production time",
            "Good candidate for high-volume production",
        ],
        "Very Low" => &[
            "Extremely simple to manufacture",
            "Minimal processing required",
            "Excellent candidate for high-volume production",
            "Low production costs expected",
        ],
        _ => &["Standard manufacturing considerations apply"],
    }
}

/// Weighted feature count bucketed into Low, Medium, High or Very High
pub fn feature_complexity_rating(features: &CadFeatures, params: &ComplexityParams) -> &'static str {
    let points = features.holes.len() as f64 * params.hole_points
        + features.ribs as f64 * params.rib_points
        + features.undercuts as f64 * params.undercut_points
        + features.thin_walls.len() as f64 * params.thin_wall_points
        + features.sharp_corners as f64 * params.sharp_corner_points;

    let [low, medium, high] = params.feature_rating_bounds;
    if points < low {
        "Low"
    } else if points < medium {
        "Medium"
    } else if points < high {
        "High"
    } else {
        "Very High"
    }
}

/// 1 (hard to mold) to 10 (easy to mold), one decimal
pub fn moldability_score(
    summary: &GeometrySummary,
    features: &CadFeatures,
    params: &ComplexityParams,
) -> f64 {
    let mut score = 10.0
        - features.undercuts as f64 * params.undercut_penalty
        - features.thin_walls.len() as f64 * params.thin_wall_penalty
        - features.sharp_corners as f64 * params.sharp_corner_penalty
        - features.holes.len() as f64 * params.hole_penalty;

    let thinnest = features
        .min_wall_thickness()
        .or_else(|| summary.estimated_wall_thickness());
    if thinnest.is_some_and(|t| t < params.thin_section_limit) {
        score -= params.thin_section_penalty;
    }

    let dims = summary.bounding_box;
    let planar_aspect = dims.length.max(dims.width) / dims.length.min(dims.width).max(1.0);
    if planar_aspect > params.aspect_limit {
        score -= params.aspect_penalty;
    }

    ((score * 10.0).round() / 10.0).max(1.0)
}

/// All complexity indicators for one part
pub fn assess(
    summary: &GeometrySummary,
    features: &CadFeatures,
    params: &ComplexityParams,
) -> ComplexityReport {
    let geometric = geometric_complexity(summary, features, params);
    let rating = complexity_rating(geometric.score, params);

    ComplexityReport {
        score: (geometric.score * 10.0).round() / 10.0,
        rating: rating.to_string(),
        implications: implications(rating).iter().map(|s| s.to_string()).collect(),
        surface_to_volume_ratio: (geometric.surface_to_volume_ratio * 100.0).round() / 100.0,
        feature_density: (geometric.feature_density * 100.0).round() / 100.0,
        feature_complexity_rating: feature_complexity_rating(features, params).to_string(),
        moldability_score: moldability_score(summary, features, params),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::geometry::Dimensions;
    use crate::entities::request::{HoleSpec, WallSpec};

    fn summary(l: f64, w: f64, h: f64) -> GeometrySummary {
        let dims = Dimensions::new(l, w, h);
        GeometrySummary {
            volume: dims.box_volume(),
            surface_area: dims.box_area(),
            bounding_box: dims,
            face_count: 6,
            ..Default::default()
        }
    }

    fn hole() -> HoleSpec {
        HoleSpec {
            diameter: 5.0,
            depth: 10.0,
            position: None,
        }
    }

    fn wall(thickness: f64) -> WallSpec {
        WallSpec {
            thickness,
            position: None,
        }
    }

    #[test]
    fn test_simple_box_is_very_low() {
        let params = ComplexityParams::default();
        let report = assess(&summary(100.0, 50.0, 25.0), &CadFeatures::default(), &params);

        // sv 0.14 × 5 + aspect 4/3 × 3 = 4.7
        assert_eq!(report.score, 4.7);
        assert_eq!(report.rating, "Very Low");
        assert_eq!(report.feature_complexity_rating, "Low");
        assert_eq!(report.moldability_score, 10.0);
        assert_eq!(report.implications.len(), 4);
    }

    #[test]
    fn test_score_is_capped() {
        let params = ComplexityParams::default();
        let features = CadFeatures {
            holes: vec![hole(); 60],
            ..Default::default()
        };
        let g = geometric_complexity(&summary(10.0, 10.0, 10.0), &features, &params);
        assert_eq!(g.score, 100.0);
        assert_eq!(complexity_rating(g.score, &params), "Very High");
    }

    #[test]
    fn test_zero_volume_does_not_divide_by_zero() {
        let params = ComplexityParams::default();
        let g = geometric_complexity(&GeometrySummary::default(), &CadFeatures::default(), &params);
        assert!(g.score.is_finite());
        assert_eq!(g.feature_density, 0.0);
    }

    #[test]
    fn test_feature_complexity_buckets() {
        let params = ComplexityParams::default();
        let mut features = CadFeatures {
            holes: vec![hole(); 4],
            ..Default::default()
        };
        assert_eq!(feature_complexity_rating(&features, &params), "Low");

        features.holes = vec![hole(); 5];
        assert_eq!(feature_complexity_rating(&features, &params), "Medium");

        features.undercuts = 4;
        assert_eq!(feature_complexity_rating(&features, &params), "High");

        features.thin_walls = vec![wall(2.0); 10];
        assert_eq!(feature_complexity_rating(&features, &params), "Very High");
    }

    #[test]
    fn test_moldability_deductions() {
        let params = ComplexityParams::default();
        let features = CadFeatures {
            holes: vec![hole(); 2],
            thin_walls: vec![wall(1.0)],
            undercuts: 1,
            ..Default::default()
        };
        // 10 − 1.5 − 0.8 − 0.6 − 2 (thin section)
        assert_eq!(moldability_score(&summary(50.0, 40.0, 10.0), &features, &params), 5.1);

        // Long flat part loses a further 1.5
        assert_eq!(moldability_score(&summary(300.0, 20.0, 10.0), &features, &params), 3.6);
    }

    #[test]
    fn test_moldability_floor() {
        let params = ComplexityParams::default();
        let features = CadFeatures {
            undercuts: 20,
            ..Default::default()
        };
        assert_eq!(moldability_score(&summary(50.0, 50.0, 50.0), &features, &params), 1.0);
    }

    #[test]
    fn test_pure_functions_are_deterministic() {
        let params = ComplexityParams::default();
        let s = summary(120.0, 30.0, 8.0);
        let features = CadFeatures {
            holes: vec![hole(); 3],
            sharp_corners: 12,
            ..Default::default()
        };
        assert_eq!(assess(&s, &features, &params), assess(&s, &features, &params));
    }
}
