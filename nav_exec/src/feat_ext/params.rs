//! Parameters structure for FeatExt

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for feature extraction.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {

    // ---- GEOMETRY ----

    /// Position of the laser origin in the robot body frame.
    ///
    /// Units: meters,
    /// Frame: Robot body
    pub laser_pos_m_rb: [f64; 2],

    /// Yaw of the laser's forward axis relative to the robot's forward axis.
    ///
    /// Units: radians
    pub laser_yaw_rad_rb: f64,

    /// Readings closer than this to the laser are the robot's own structure.
    ///
    /// Units: meters
    pub exclusion_radius_m: f64,

    /// Readings further than this from the laser are not used.
    ///
    /// Units: meters
    pub max_feature_range_m: f64,

    // ---- HOUGH ACCUMULATOR ----

    /// Angular resolution of the accumulator.
    ///
    /// Units: radians
    pub theta_res_rad: f64,

    /// Range resolution of the accumulator.
    ///
    /// Units: meters
    pub rho_res_m: f64,

    // ---- LINE ACCEPTANCE ----

    /// Minimum number of points supporting a line.
    pub min_support: usize,

    /// Maximum perpendicular distance of a point from a line to count as
    /// supporting it.
    ///
    /// Units: meters
    pub member_tol_m: f64,

    /// Maximum distance between consecutive points of one segment.
    ///
    /// Units: meters
    pub max_gap_m: f64,

    /// Maximum RMS perpendicular residual of an accepted line fit.
    ///
    /// Units: meters
    pub max_residual_m: f64,

    /// Maximum number of lines extracted from one scan.
    pub max_lines: usize,

    // ---- CORNERS ----

    /// Minimum angle between two lines for them to form a corner. Lines
    /// closer to parallel than this never form a corner.
    ///
    /// Units: radians
    pub min_corner_angle_rad: f64,

    /// Maximum angle between two lines for them to form a corner, at most
    /// `pi/2`.
    ///
    /// Units: radians
    pub max_corner_angle_rad: f64,

    /// Maximum distance between the lines' intersection and the nearest
    /// endpoint of each segment.
    ///
    /// Units: meters
    pub max_corner_gap_m: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            laser_pos_m_rb: [0.0, 0.0],
            laser_yaw_rad_rb: 0.0,
            exclusion_radius_m: 0.1,
            max_feature_range_m: 8.0,
            theta_res_rad: 1f64.to_radians(),
            rho_res_m: 0.02,
            min_support: 10,
            member_tol_m: 0.05,
            max_gap_m: 0.3,
            max_residual_m: 0.02,
            max_lines: 8,
            min_corner_angle_rad: 45f64.to_radians(),
            max_corner_angle_rad: std::f64::consts::FRAC_PI_2,
            max_corner_gap_m: 0.15,
        }
    }
}
