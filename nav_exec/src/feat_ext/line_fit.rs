//! Total least squares line fitting

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Point2, Vector2};

use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Spread below which a point set is treated as a single point.
const MIN_SCATTER_M2: f64 = 1e-12;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A line in normal form, `x cos(normal) + y sin(normal) = range`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Line {
    /// Angle of the normal pointing from the origin to the line, in
    /// `[-pi, pi)`.
    pub normal_rad: f64,

    /// Distance from the origin to the line, never negative.
    pub range_m: f64,
}

/// The result of fitting a line to a set of points.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LineFit {
    pub line: Line,

    /// RMS perpendicular distance of the points from the line.
    pub residual_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Line {
    /// Build a line from any normal angle and signed range, flipping the
    /// normal so the range is not negative.
    pub fn from_signed(normal_rad: f64, range_m: f64) -> Self {
        if range_m < 0.0 {
            Self {
                normal_rad: wrap_pi(normal_rad + std::f64::consts::PI),
                range_m: -range_m,
            }
        }
        else {
            Self {
                normal_rad: wrap_pi(normal_rad),
                range_m,
            }
        }
    }

    pub fn normal(&self) -> Vector2<f64> {
        Vector2::new(self.normal_rad.cos(), self.normal_rad.sin())
    }

    /// Unit vector along the line.
    pub fn direction(&self) -> Vector2<f64> {
        Vector2::new(-self.normal_rad.sin(), self.normal_rad.cos())
    }

    /// Signed distance of a point from the line, positive on the far side
    /// from the origin.
    pub fn signed_dist(&self, point: &Point2<f64>) -> f64 {
        point.coords.dot(&self.normal()) - self.range_m
    }

    pub fn dist(&self, point: &Point2<f64>) -> f64 {
        self.signed_dist(point).abs()
    }

    /// Orthogonal projection of a point onto the line.
    pub fn project(&self, point: &Point2<f64>) -> Point2<f64> {
        point - self.normal() * self.signed_dist(point)
    }
}

/// Fit a line to the points by minimising the perpendicular distances.
///
/// Returns `None` for fewer than two points or if all the points coincide.
pub(crate) fn fit<'a, I>(points: I) -> Option<LineFit>
where
    I: IntoIterator<Item = &'a Point2<f64>> + Clone,
{
    let mut n = 0usize;
    let mut sum = Vector2::zeros();
    for p in points.clone() {
        sum += p.coords;
        n += 1;
    }

    if n < 2 {
        return None;
    }

    let centroid = Point2::from(sum / n as f64);

    let (mut cxx, mut cyy, mut cxy) = (0.0, 0.0, 0.0);
    for p in points.clone() {
        let d = p - centroid;
        cxx += d.x * d.x;
        cyy += d.y * d.y;
        cxy += d.x * d.y;
    }

    if cxx + cyy < MIN_SCATTER_M2 {
        return None;
    }

    // Principal axis of the scatter is the line direction
    let dir_rad = 0.5 * (2.0 * cxy).atan2(cxx - cyy);
    let normal_rad = dir_rad + std::f64::consts::FRAC_PI_2;
    let signed_range = centroid.x * normal_rad.cos() + centroid.y * normal_rad.sin();

    let line = Line::from_signed(normal_rad, signed_range);

    let sum_sq: f64 = points
        .into_iter()
        .map(|p| line.signed_dist(p).powi(2))
        .sum();

    Some(LineFit {
        line,
        residual_m: (sum_sq / n as f64).sqrt(),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_fit_vertical_line() {
        let points: Vec<Point2<f64>> =
            (0..10).map(|i| Point2::new(2.0, -1.0 + 0.2 * i as f64)).collect();

        let fit = fit(&points).unwrap();
        assert!((fit.line.range_m - 2.0).abs() < 1e-9);
        assert!(fit.line.normal_rad.abs() < 1e-9);
        assert!(fit.residual_m < 1e-9);
    }

    #[test]
    fn test_fit_flips_to_positive_range() {
        let points: Vec<Point2<f64>> =
            (0..10).map(|i| Point2::new(-3.0 + 0.5 * i as f64, -1.5)).collect();

        let fit = fit(&points).unwrap();
        assert!((fit.line.range_m - 1.5).abs() < 1e-9);
        assert!((fit.line.normal_rad + PI / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_residual() {
        // Alternating +/- 0.01 about y = 1
        let points: Vec<Point2<f64>> = (0..20)
            .map(|i| Point2::new(0.1 * i as f64, 1.0 + if i % 2 == 0 { 0.01 } else { -0.01 }))
            .collect();

        let fit = fit(&points).unwrap();
        assert!((fit.line.range_m - 1.0).abs() < 1e-3);
        assert!((fit.residual_m - 0.01).abs() < 1e-3);
    }

    #[test]
    fn test_fit_degenerate() {
        let one = [Point2::new(1.0, 1.0)];
        assert!(fit(&one).is_none());

        let same = [Point2::new(1.0, 1.0); 5];
        assert!(fit(&same).is_none());
    }

    #[test]
    fn test_project() {
        let line = Line::from_signed(0.0, 2.0);
        let p = line.project(&Point2::new(3.0, 1.0));
        assert!((p.x - 2.0).abs() < 1e-12);
        assert!((p.y - 1.0).abs() < 1e-12);
        assert!((line.signed_dist(&Point2::new(1.0, 0.0)) + 1.0).abs() < 1e-12);
    }
}
