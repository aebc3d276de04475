//! Corner detection from pairs of extracted lines

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Point2;

use super::{line_fit::Line, CornerGeom, Feature, FeatureKind, LineGeom, Params};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Determinant below which two lines are treated as parallel.
const MIN_DET: f64 = 1e-9;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Promote pairs of lines to corners.
///
/// `lines` holds the accepted line features in extraction order, the
/// returned corners refer to them by position.
pub(crate) fn find_corners(lines: &[Feature], params: &Params) -> Vec<Feature> {
    let mut corners = Vec::new();

    let geoms: Vec<(usize, &LineGeom, usize)> = lines
        .iter()
        .enumerate()
        .filter_map(|(i, f)| f.line().map(|l| (i, l, f.support)))
        .collect();

    for (a, &(i, li, si)) in geoms.iter().enumerate() {
        for &(j, lj, sj) in geoms.iter().skip(a + 1) {
            if let Some(c) = corner_between(li, lj, params) {
                corners.push(Feature {
                    kind: FeatureKind::Corner(CornerGeom {
                        angle_rad: c.1,
                        line_indices: [i, j],
                    }),
                    x_m: c.0.x,
                    y_m: c.0.y,
                    support: si + sj,
                });
            }
        }
    }

    corners
}

/// Intersection point and angle of two segments, if they form a corner.
fn corner_between(a: &LineGeom, b: &LineGeom, params: &Params) -> Option<(Point2<f64>, f64)> {
    let la = Line::from_signed(a.bearing_rad, a.range_m);
    let lb = Line::from_signed(b.bearing_rad, b.range_m);

    let cos_ang = la.direction().dot(&lb.direction()).abs().min(1.0);
    let angle_rad = cos_ang.acos();

    if angle_rad < params.min_corner_angle_rad || angle_rad > params.max_corner_angle_rad {
        return None;
    }

    // Solve n_a . p = r_a, n_b . p = r_b
    let det = (lb.normal_rad - la.normal_rad).sin();
    if det.abs() < MIN_DET {
        return None;
    }

    let (ca, sa) = (la.normal_rad.cos(), la.normal_rad.sin());
    let (cb, sb) = (lb.normal_rad.cos(), lb.normal_rad.sin());
    let p = Point2::new(
        (la.range_m * sb - lb.range_m * sa) / det,
        (ca * lb.range_m - cb * la.range_m) / det,
    );

    if endpoint_gap(a, &p) > params.max_corner_gap_m
        || endpoint_gap(b, &p) > params.max_corner_gap_m
    {
        return None;
    }

    Some((p, angle_rad))
}

/// Distance from a point to the nearest endpoint of a segment.
fn endpoint_gap(line: &LineGeom, p: &Point2<f64>) -> f64 {
    line.endpoints_m_rb
        .iter()
        .map(|e| (Point2::new(e[0], e[1]) - p).norm())
        .fold(f64::INFINITY, f64::min)
}
