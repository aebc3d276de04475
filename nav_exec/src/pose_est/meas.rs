//! Measurement and motion inputs to PoseEst, with the measurement models

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Matrix2, Matrix2x3, Vector2, Vector3};
use serde::Serialize;

use crate::feat_ext::{Feature, FeatureKind};
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Body velocities used to propagate the estimate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Odometry {
    /// Units: meters/second
    pub lin_vel_ms: f64,

    /// Units: radians/second
    pub ang_vel_rads: f64,
}

/// A known line of the world in normal form,
/// `x cos(normal) + y sin(normal) = range`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WorldLine {
    /// Units: meters
    pub range_m: f64,

    /// Units: radians
    pub normal_rad: f64,
}

/// A measured feature, in the robot body frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Observation {
    /// Perpendicular range and normal bearing of a line.
    Line { range_m: f64, bearing_rad: f64 },

    /// Position of a point.
    Point { x_m: f64, y_m: f64 },
}

/// A known landmark of the world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Landmark {
    Line(WorldLine),
    Point([f64; 2]),
}

/// An observation paired with the landmark it corresponds to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub obs: Observation,
    pub landmark: Landmark,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Odometry {
    pub fn new(lin_vel_ms: f64, ang_vel_rads: f64) -> Self {
        Self { lin_vel_ms, ang_vel_rads }
    }

    pub fn is_finite(&self) -> bool {
        self.lin_vel_ms.is_finite() && self.ang_vel_rads.is_finite()
    }
}

impl WorldLine {
    pub fn new(range_m: f64, normal_rad: f64) -> Self {
        Self { range_m, normal_rad }
    }
}

impl Observation {
    /// The observation made by an extracted feature.
    pub fn from_feature(feature: &Feature) -> Self {
        match feature.kind {
            FeatureKind::Line(ref l) => Observation::Line {
                range_m: l.range_m,
                bearing_rad: l.bearing_rad,
            },
            FeatureKind::Corner(_) => Observation::Point {
                x_m: feature.x_m,
                y_m: feature.y_m,
            },
        }
    }

    pub fn as_vector(&self) -> Vector2<f64> {
        match *self {
            Observation::Line { range_m, bearing_rad } => Vector2::new(range_m, bearing_rad),
            Observation::Point { x_m, y_m } => Vector2::new(x_m, y_m),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.as_vector().iter().all(|v| v.is_finite())
    }
}

impl Landmark {
    /// Predicted observation of this landmark from `state = [x, y, phi]` and
    /// the measurement Jacobian with respect to the state.
    pub fn predict(&self, state: &Vector3<f64>) -> (Vector2<f64>, Matrix2x3<f64>) {
        let (x, y, phi) = (state[0], state[1], state[2]);

        match *self {
            Landmark::Line(l) => {
                let (c, s) = (l.normal_rad.cos(), l.normal_rad.sin());
                let rho = l.range_m - (x * c + y * s);
                let bearing = l.normal_rad - phi;

                // The robot is on the far side of the line from the world
                // origin, so it sees the opposite normal
                if rho < 0.0 {
                    (
                        Vector2::new(-rho, wrap_pi(bearing + std::f64::consts::PI)),
                        Matrix2x3::new(c, s, 0.0, 0.0, 0.0, -1.0),
                    )
                }
                else {
                    (
                        Vector2::new(rho, wrap_pi(bearing)),
                        Matrix2x3::new(-c, -s, 0.0, 0.0, 0.0, -1.0),
                    )
                }
            }
            Landmark::Point(m) => {
                let (c, s) = (phi.cos(), phi.sin());
                let (dx, dy) = (m[0] - x, m[1] - y);
                let h1 = c * dx + s * dy;
                let h2 = -s * dx + c * dy;

                (
                    Vector2::new(h1, h2),
                    Matrix2x3::new(-c, -s, h2, s, -c, -h1),
                )
            }
        }
    }

    /// True if `obs` is of the kind this landmark produces.
    pub fn matches_kind(&self, obs: &Observation) -> bool {
        matches!(
            (self, obs),
            (Landmark::Line(_), Observation::Line { .. }) | (Landmark::Point(_), Observation::Point { .. })
        )
    }
}

impl Measurement {
    /// Innovation (observed minus predicted, bearings wrapped into
    /// `[-pi, pi)`) and measurement Jacobian at `state`.
    ///
    /// Returns `None` if the observation and landmark kinds differ.
    pub fn innovation(&self, state: &Vector3<f64>) -> Option<(Vector2<f64>, Matrix2x3<f64>)> {
        if !self.landmark.matches_kind(&self.obs) {
            return None;
        }

        let (z_hat, h) = self.landmark.predict(state);
        let mut nu = self.obs.as_vector() - z_hat;

        if let Observation::Line { .. } = self.obs {
            nu[1] = wrap_pi(nu[1]);
        }

        Some((nu, h))
    }
}

/// A diagonal 2x2 matrix.
pub fn diag2(d: [f64; 2]) -> Matrix2<f64> {
    Matrix2::new(d[0], 0.0, 0.0, d[1])
}

/// Convert landmark parameter pairs into landmarks.
pub fn landmarks_from_params(lines: &[[f64; 2]], points: &[[f64; 2]]) -> Vec<Landmark> {
    lines
        .iter()
        .map(|l| Landmark::Line(WorldLine::new(l[0], l[1])))
        .chain(points.iter().map(|p| Landmark::Point(*p)))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    /// Central difference Jacobian of the predicted observation.
    fn numeric_jacobian(lm: &Landmark, state: &Vector3<f64>) -> Matrix2x3<f64> {
        let eps = 1e-6;
        let mut j = Matrix2x3::zeros();
        for k in 0..3 {
            let mut a = *state;
            let mut b = *state;
            a[k] += eps;
            b[k] -= eps;
            let d = lm.predict(&a).0 - lm.predict(&b).0;
            j[(0, k)] = d[0] / (2.0 * eps);
            j[(1, k)] = wrap_pi(d[1]) / (2.0 * eps);
        }
        j
    }

    #[test]
    fn test_line_prediction() {
        let lm = Landmark::Line(WorldLine::new(5.0, 0.0));

        // Wall straight ahead
        let (z, _) = lm.predict(&Vector3::new(3.0, 0.0, 0.0));
        assert!((z[0] - 2.0).abs() < 1e-12);
        assert!(z[1].abs() < 1e-12);

        // Facing along +y the wall is to the right
        let (z, _) = lm.predict(&Vector3::new(3.0, 0.0, FRAC_PI_2));
        assert!((z[1] + FRAC_PI_2).abs() < 1e-12);

        // Beyond the wall the normal flips
        let (z, _) = lm.predict(&Vector3::new(6.0, 0.0, 0.0));
        assert!((z[0] - 1.0).abs() < 1e-12);
        assert!((z[1].abs() - PI).abs() < 1e-12);
    }

    #[test]
    fn test_jacobians_match_numeric() {
        let state = Vector3::new(1.2, -0.4, 0.7);
        let landmarks = [
            Landmark::Line(WorldLine::new(5.0, 0.0)),
            Landmark::Line(WorldLine::new(2.0, 3.0 * FRAC_PI_2)),
            Landmark::Line(WorldLine::new(1.0, 0.3)),
            Landmark::Point([5.0, 2.0]),
            Landmark::Point([-1.0, -2.0]),
        ];

        for lm in landmarks.iter() {
            let (_, h) = lm.predict(&state);
            let n = numeric_jacobian(lm, &state);
            assert!((h - n).abs().max() < 1e-6, "{:?}: {} vs {}", lm, h, n);
        }
    }

    #[test]
    fn test_innovation_wraps_bearing() {
        let meas = Measurement {
            obs: Observation::Line { range_m: 1.0, bearing_rad: -PI + 0.01 },
            landmark: Landmark::Line(WorldLine::new(1.0, PI)),
        };
        let (nu, _) = meas.innovation(&Vector3::new(0.0, 0.0, 0.02)).unwrap();
        assert!((nu[1] - 0.03).abs() < 1e-9);

        let mismatched = Measurement {
            obs: Observation::Point { x_m: 1.0, y_m: 0.0 },
            landmark: Landmark::Line(WorldLine::new(1.0, 0.0)),
        };
        assert!(mismatched.innovation(&Vector3::zeros()).is_none());
    }
}
