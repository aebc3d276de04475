//! Parameters structure for PoseEst

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the pose estimator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {

    // ---- INITIALISATION ----

    /// Initial pose `[x, y, phi]`.
    ///
    /// Units: meters, meters, radians
    pub initial_pose: [f64; 3],

    /// Diagonal of the prior covariance.
    ///
    /// Units: meters^2, meters^2, radians^2
    pub initial_cov_diag: [f64; 3],

    // ---- PROCESS NOISE ----

    /// Variance of the travelled distance per meter travelled.
    ///
    /// Units: meters^2/meter
    pub dist_noise_m2_per_m: f64,

    /// Variance of the heading change per radian turned.
    ///
    /// Units: radians^2/radian
    pub rot_noise_rad2_per_rad: f64,

    /// Variance of the heading change per meter travelled.
    ///
    /// Units: radians^2/meter
    pub rot_noise_rad2_per_m: f64,

    /// Process noise added regardless of motion, per second.
    ///
    /// Units: meters^2/second, meters^2/second, radians^2/second
    pub q_floor_diag: [f64; 3],

    // ---- LIMITS ----

    /// Largest time step used in one propagation.
    ///
    /// Units: seconds
    pub max_dt_s: f64,

    /// Ceiling of each diagonal variance.
    ///
    /// Units: meters^2, meters^2, radians^2
    pub max_var_diag: [f64; 3],

    /// Covariance diagonal used when the covariance has to be reset.
    ///
    /// Units: meters^2, meters^2, radians^2
    pub safe_cov_diag: [f64; 3],

    /// Eigenvalues below `-psd_tol` mark the covariance as invalid.
    pub psd_tol: f64,

    // ---- MEASUREMENTS ----

    /// Default measurement noise diagonal for line features `(range, bearing)`.
    ///
    /// Units: meters^2, radians^2
    pub line_noise_diag: [f64; 2],

    /// Default measurement noise diagonal for corner features `(x, y)`.
    ///
    /// Units: meters^2
    pub point_noise_diag: [f64; 2],

    /// Mahalanobis gate for association, squared. The default is the 99%
    /// point of the chi-squared distribution with two degrees of freedom.
    pub gate_chi2: f64,

    /// Known world lines as `[range, normal]` pairs.
    ///
    /// Units: meters, radians,
    /// Frame: World
    pub landmark_lines: Vec<[f64; 2]>,

    /// Known world points (corners) as `[x, y]`.
    ///
    /// Units: meters,
    /// Frame: World
    pub landmark_points: Vec<[f64; 2]>,
}

impl Default for Params {
    fn default() -> Self {
        use std::f64::consts::{FRAC_PI_2, PI};

        Self {
            initial_pose: [0.0, 0.0, 0.0],
            initial_cov_diag: [0.01, 0.01, 0.01],
            dist_noise_m2_per_m: 0.001,
            rot_noise_rad2_per_rad: 0.001,
            rot_noise_rad2_per_m: 0.001,
            q_floor_diag: [1e-6, 1e-6, 1e-6],
            max_dt_s: 0.5,
            max_var_diag: [100.0, 100.0, 10.0],
            safe_cov_diag: [1.0, 1.0, 1.0],
            psd_tol: 1e-9,
            line_noise_diag: [0.000625, 0.000625],
            point_noise_diag: [0.000625, 0.000625],
            gate_chi2: 9.21,
            landmark_lines: vec![
                [5.0, 0.0],
                [1.0, PI],
                [2.0, FRAC_PI_2],
                [2.0, 3.0 * FRAC_PI_2],
            ],
            landmark_points: vec![
                [5.0, 2.0],
                [5.0, -2.0],
                [-1.0, 2.0],
                [-1.0, -2.0],
            ],
        }
    }
}
