//! Implementation of the PoseEst filter

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace, warn};
use nalgebra::{Matrix2, Matrix2x3, Matrix3, Matrix3x2, Vector3};
use serde::Serialize;

// Internal
use super::{Measurement, Odometry, Params, PoseEstError};
use robot_if::pose::Pose2D;
use util::maths::wrap_2pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Pose estimator state.
#[derive(Debug, Clone)]
pub struct PoseEst {
    params: Params,

    /// `[x, y, phi]`, with `phi` in `[0, 2pi)`.
    state: Vector3<f64>,

    cov: Matrix3<f64>,
}

/// Report of one propagation.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PropReport {
    /// Time step actually used.
    ///
    /// Units: seconds
    pub dt_s: f64,

    /// The requested time step exceeded the maximum.
    pub dt_clamped: bool,

    /// At least one variance hit its ceiling.
    pub var_capped: bool,

    /// The covariance was invalid and has been reset.
    pub cov_reset: bool,
}

/// Report of one accepted update.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct UpdateReport {
    pub innovation: [f64; 2],

    /// Squared Mahalanobis distance of the innovation.
    pub mahalanobis_sq: f64,

    /// The covariance was invalid and has been reset.
    pub cov_reset: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PoseEst {
    /// Create the estimator at the configured initial pose and prior.
    pub fn new(params: Params) -> Self {
        let ip = params.initial_pose;
        let state = Vector3::new(ip[0], ip[1], wrap_2pi(ip[2]));
        let cov = Matrix3::from_diagonal(&Vector3::from(params.initial_cov_diag));

        let mut est = Self { params, state, cov };
        est.check_health();
        est
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn pose(&self) -> Pose2D {
        Pose2D::new(self.state[0], self.state[1], self.state[2])
    }

    /// The state vector `[x, y, phi]`.
    pub fn state(&self) -> &Vector3<f64> {
        &self.state
    }

    pub fn covariance(&self) -> &Matrix3<f64> {
        &self.cov
    }

    /// Advance the estimate by `dt_s` under the given odometry.
    ///
    /// A non-finite or non-positive `dt_s` is zero elapsed time and leaves
    /// the estimate untouched. Steps longer than `max_dt_s` are clamped.
    pub fn propagate(&mut self, dt_s: f64, odom: &Odometry) -> PropReport {
        let mut report = PropReport::default();

        if !dt_s.is_finite() || dt_s <= 0.0 {
            trace!("PoseEst: ignoring propagation with dt = {}", dt_s);
            return report;
        }

        let dt = if dt_s > self.params.max_dt_s {
            warn!(
                "PoseEst: dt of {:.3} s exceeds the maximum, clamping to {:.3} s",
                dt_s, self.params.max_dt_s
            );
            report.dt_clamped = true;
            self.params.max_dt_s
        }
        else {
            dt_s
        };
        report.dt_s = dt;

        let odom = if odom.is_finite() {
            *odom
        }
        else {
            debug!("PoseEst: non-finite odometry {:?}, assuming stationary", odom);
            Odometry::default()
        };

        let d = odom.lin_vel_ms * dt;
        let dtheta = odom.ang_vel_rads * dt;
        let mid = self.state[2] + 0.5 * dtheta;
        let (cm, sm) = (mid.cos(), mid.sin());

        self.state[0] += d * cm;
        self.state[1] += d * sm;
        self.state[2] = wrap_2pi(self.state[2] + dtheta);

        #[rustfmt::skip]
        let f = Matrix3::new(
            1.0, 0.0, -d * sm,
            0.0, 1.0,  d * cm,
            0.0, 0.0,  1.0,
        );

        // Jacobian with respect to the (distance, rotation) increments
        #[rustfmt::skip]
        let l = Matrix3x2::new(
            cm, -0.5 * d * sm,
            sm,  0.5 * d * cm,
            0.0, 1.0,
        );

        let p = &self.params;
        let m = Matrix2::new(
            p.dist_noise_m2_per_m * d.abs(),
            0.0,
            0.0,
            p.rot_noise_rad2_per_rad * dtheta.abs() + p.rot_noise_rad2_per_m * d.abs(),
        );
        let q = Matrix3::from_diagonal(&Vector3::from(p.q_floor_diag)) * dt;

        self.cov = f * self.cov * f.transpose() + l * m * l.transpose() + q;
        self.symmetrise();

        report.var_capped = self.apply_ceiling();
        report.cov_reset = self.check_health();

        report
    }

    /// Correct the estimate with one measurement of known correspondence.
    ///
    /// On error the estimate is left unchanged.
    pub fn update(
        &mut self,
        meas: &Measurement,
        r: &Matrix2<f64>,
    ) -> Result<UpdateReport, PoseEstError> {
        validate_noise(r)?;

        if !meas.obs.is_finite() {
            return Err(PoseEstError::NonFiniteMeasurement);
        }

        let (nu, h) = match meas.innovation(&self.state) {
            Some(v) => v,
            None => return Err(PoseEstError::NonFiniteMeasurement),
        };

        let s = self.innovation_cov(&h, r);
        let s_inv = s.try_inverse().ok_or(PoseEstError::SingularInnovation)?;

        let k = self.cov * h.transpose() * s_inv;
        let dx = k * nu;
        if !dx.iter().all(|v| v.is_finite()) {
            return Err(PoseEstError::NonFiniteCorrection);
        }

        self.state += dx;
        self.state[2] = wrap_2pi(self.state[2]);

        // Joseph form
        let ikh = Matrix3::identity() - k * h;
        self.cov = ikh * self.cov * ikh.transpose() + k * r * k.transpose();
        self.symmetrise();

        let report = UpdateReport {
            innovation: [nu[0], nu[1]],
            mahalanobis_sq: (nu.transpose() * s_inv * nu)[0],
            cov_reset: self.check_health(),
        };

        trace!(
            "PoseEst: update innovation ({:.4}, {:.4}), pose ({:.3}, {:.3}, {:.3})",
            nu[0],
            nu[1],
            self.state[0],
            self.state[1],
            self.state[2]
        );

        Ok(report)
    }

    /// Squared Mahalanobis distance of a measurement's innovation, or `None`
    /// if it cannot be computed.
    pub fn mahalanobis_sq(&self, meas: &Measurement, r: &Matrix2<f64>) -> Option<f64> {
        let (nu, h) = meas.innovation(&self.state)?;

        let s_inv = self.innovation_cov(&h, r).try_inverse()?;
        let d2 = (nu.transpose() * s_inv * nu)[0];

        if d2.is_finite() {
            Some(d2)
        }
        else {
            None
        }
    }

    fn innovation_cov(&self, h: &Matrix2x3<f64>, r: &Matrix2<f64>) -> Matrix2<f64> {
        h * self.cov * h.transpose() + r
    }

    fn symmetrise(&mut self) {
        self.cov = 0.5 * (self.cov + self.cov.transpose());
    }

    /// Scale rows and columns so no variance exceeds its ceiling.
    fn apply_ceiling(&mut self) -> bool {
        let mut capped = false;

        for i in 0..3 {
            let var = self.cov[(i, i)];
            let max = self.params.max_var_diag[i];

            if var.is_finite() && var > max {
                let scale = (max / var).sqrt();
                for j in 0..3 {
                    self.cov[(i, j)] *= scale;
                    self.cov[(j, i)] *= scale;
                }
                capped = true;
            }
        }

        capped
    }

    /// Reset the covariance to the safe bound if it is not a valid
    /// covariance. Returns true if a reset happened.
    fn check_health(&mut self) -> bool {
        let finite = self.cov.iter().all(|v| v.is_finite());
        let valid = finite
            && (0..3).all(|i| self.cov[(i, i)] >= 0.0)
            && self.cov.symmetric_eigenvalues().min() >= -self.params.psd_tol;

        if !valid {
            warn!("PoseEst: covariance lost positive semi-definiteness, resetting to the safe bound");
            self.cov = Matrix3::from_diagonal(&Vector3::from(self.params.safe_cov_diag));
        }

        !valid
    }
}

/// Check `r` is finite, symmetric and has a positive diagonal.
fn validate_noise(r: &Matrix2<f64>) -> Result<(), PoseEstError> {
    let finite = r.iter().all(|v| v.is_finite());
    let scale = r.abs().max().max(1.0);
    let symmetric = (r[(0, 1)] - r[(1, 0)]).abs() <= 1e-12 * scale;

    if finite && symmetric && r[(0, 0)] > 0.0 && r[(1, 1)] > 0.0 {
        Ok(())
    }
    else {
        Err(PoseEstError::InvalidMeasNoise([
            [r[(0, 0)], r[(0, 1)]],
            [r[(1, 0)], r[(1, 1)]],
        ]))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pose_est::{diag2, Landmark, Observation, WorldLine};

    const TAU: f64 = std::f64::consts::TAU;

    fn assert_valid_cov(est: &PoseEst) {
        let p = est.covariance();
        assert!((p - p.transpose()).abs().max() < 1e-12);
        assert!(p.symmetric_eigenvalues().min() >= -1e-9);
    }

    fn wall_ahead() -> Measurement {
        Measurement {
            obs: Observation::Line { range_m: 2.0, bearing_rad: 0.0 },
            landmark: Landmark::Line(WorldLine::new(2.0, 0.0)),
        }
    }

    #[test]
    fn test_propagate_straight_and_turning() {
        let mut est = PoseEst::new(Params::default());

        for _ in 0..100 {
            est.propagate(0.01, &Odometry::new(1.0, 0.0));
        }
        assert!((est.pose().x_m - 1.0).abs() < 1e-9);
        assert!(est.pose().y_m.abs() < 1e-12);

        // Half circle of radius 1
        let mut est = PoseEst::new(Params::default());
        for _ in 0..1000 {
            est.propagate(0.01, &Odometry::new(std::f64::consts::PI / 10.0, std::f64::consts::PI / 10.0));
        }
        let pose = est.pose();
        assert!(pose.x_m.abs() < 1e-5);
        assert!((pose.y_m - 2.0).abs() < 1e-5);
        assert!((pose.phi_rad - std::f64::consts::PI).abs() < 1e-9);
        assert_valid_cov(&est);
    }

    #[test]
    fn test_heading_normalised() {
        let mut est = PoseEst::new(Params::default());

        for _ in 0..500 {
            est.propagate(0.05, &Odometry::new(0.2, -3.0));
            let phi = est.pose().phi_rad;
            assert!(phi >= 0.0 && phi < TAU, "phi = {}", phi);
        }
        for _ in 0..500 {
            est.propagate(0.05, &Odometry::new(0.2, 7.0));
            let phi = est.pose().phi_rad;
            assert!(phi >= 0.0 && phi < TAU, "phi = {}", phi);
        }

        let mut est = PoseEst::new(Params {
            initial_pose: [0.0, 0.0, -0.5],
            ..Params::default()
        });
        assert!(est.pose().phi_rad > 0.0);
        est.update(&wall_ahead(), &diag2([0.000625, 0.000625])).unwrap();
        let phi = est.pose().phi_rad;
        assert!(phi >= 0.0 && phi < TAU);
    }

    #[test]
    fn test_propagate_deterministic() {
        let mut a = PoseEst::new(Params::default());
        let mut b = PoseEst::new(Params::default());

        for i in 0..200 {
            let odom = Odometry::new(0.3, 0.01 * i as f64);
            a.propagate(0.02, &odom);
            b.propagate(0.02, &odom);
        }

        assert_eq!(a.state(), b.state());
        assert_eq!(a.covariance(), b.covariance());
    }

    #[test]
    fn test_propagate_only_stability() {
        let mut est = PoseEst::new(Params::default());
        let start = *est.state();

        for _ in 0..10_000 {
            est.propagate(0.01, &Odometry::default());
            assert_valid_cov(&est);
        }

        assert!((est.state() - start).abs().max() < 1e-12);
        let max = Params::default().max_var_diag;
        for i in 0..3 {
            assert!(est.covariance()[(i, i)].is_finite());
            assert!(est.covariance()[(i, i)] <= max[i]);
        }

        // Long noisy drive still hits the ceiling rather than diverging
        for _ in 0..10_000 {
            est.propagate(0.5, &Odometry::new(1.0, 1.0));
        }
        for i in 0..3 {
            assert!(est.covariance()[(i, i)] <= max[i] * (1.0 + 1e-9));
        }
        assert_valid_cov(&est);
    }

    #[test]
    fn test_dt_clamp() {
        let mut est = PoseEst::new(Params::default());
        let before = est.clone();

        for dt in [0.0, -1.0, f64::NAN, f64::INFINITY].iter() {
            let r = est.propagate(*dt, &Odometry::new(1.0, 0.0));
            assert_eq!(r.dt_s, 0.0);
        }
        assert_eq!(est.state(), before.state());
        assert_eq!(est.covariance(), before.covariance());

        let r = est.propagate(10.0, &Odometry::new(1.0, 0.0));
        assert!(r.dt_clamped);
        assert!((est.pose().x_m - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_wall_scenario() {
        // Stationary, truth at the origin, a wall 2 m ahead. The estimate
        // starts 0.1 m off in x.
        let mut est = PoseEst::new(Params {
            initial_pose: [0.1, 0.0, 0.0],
            ..Params::default()
        });

        est.propagate(0.02, &Odometry::default());
        let x_before = est.pose().x_m;
        let pxx_before = est.covariance()[(0, 0)];

        let report = est.update(&wall_ahead(), &diag2([0.000625, 0.000625])).unwrap();

        assert!(report.innovation[0] > 0.0);
        assert!(est.pose().x_m.abs() < x_before.abs());
        assert!(est.covariance()[(0, 0)] < pxx_before);
        assert_valid_cov(&est);
    }

    #[test]
    fn test_covariance_valid_over_mixed_sequence() {
        let mut est = PoseEst::new(Params::default());
        let r = diag2([0.000625, 0.000625]);

        let corner = Measurement {
            obs: Observation::Point { x_m: 5.0, y_m: 2.0 },
            landmark: Landmark::Point([5.0, 2.0]),
        };

        for i in 0..500 {
            est.propagate(0.02, &Odometry::new(0.1, 0.05 * (i as f64).sin()));
            if i % 5 == 0 {
                est.update(&wall_ahead(), &r).unwrap();
            }
            if i % 7 == 0 {
                est.update(&corner, &r).unwrap();
            }
            assert_valid_cov(&est);
            let phi = est.pose().phi_rad;
            assert!(phi >= 0.0 && phi < TAU);
        }
    }

    #[test]
    fn test_invalid_noise_rejected() {
        let mut est = PoseEst::new(Params::default());
        let before = est.clone();

        let bad = [
            diag2([0.0, 1.0]),
            diag2([f64::NAN, 1.0]),
            Matrix2::new(1.0, 0.5, 0.0, 1.0),
        ];
        for r in bad.iter() {
            assert!(matches!(
                est.update(&wall_ahead(), r),
                Err(PoseEstError::InvalidMeasNoise(_))
            ));
        }

        let nan_meas = Measurement {
            obs: Observation::Line { range_m: f64::NAN, bearing_rad: 0.0 },
            ..wall_ahead()
        };
        assert!(est.update(&nan_meas, &diag2([0.1, 0.1])).is_err());

        assert_eq!(est.state(), before.state());
        assert_eq!(est.covariance(), before.covariance());
    }

    #[test]
    fn test_invalid_prior_reset() {
        let est = PoseEst::new(Params {
            initial_cov_diag: [-1.0, 0.01, 0.01],
            ..Params::default()
        });
        assert_eq!(est.covariance()[(0, 0)], Params::default().safe_cov_diag[0]);
        assert_valid_cov(&est);
    }
}
