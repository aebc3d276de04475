//! Parameters structure for MovCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for motion control.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {

    // ---- CAPABILITIES ----

    /// Maximum magnitude of the linear velocity command.
    ///
    /// Units: meters/second
    pub max_lin_vel_ms: f64,

    /// Maximum magnitude of the angular velocity command.
    ///
    /// Units: radians/second
    pub max_ang_vel_rads: f64,

    // ---- SENSING ----

    /// Scans older than this are ignored.
    ///
    /// Units: seconds
    pub max_scan_age_s: f64,

    /// Position of the laser in the robot body frame.
    ///
    /// Units: meters,
    /// Frame: Robot body
    pub laser_pos_m_rb: [f64; 2],

    /// Units: radians
    pub laser_yaw_rad_rb: f64,

    /// Distance from the body origin to the front of the robot. Obstacle
    /// distances are measured from here.
    ///
    /// Units: meters
    pub front_offset_m: f64,

    // ---- BEHAVIOURS ----

    pub stall_recover: StallRecoverParams,

    pub bumpers: BumpersParams,

    pub avoid_near: AvoidParams,

    pub avoid_far: AvoidParams,

    /// Forward speed of the constant velocity behaviour.
    ///
    /// Units: meters/second
    pub constant_vel_ms: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StallRecoverParams {
    /// Units: meters/second
    pub back_off_speed_ms: f64,

    /// Units: seconds
    pub back_off_time_s: f64,

    /// Units: radians/second
    pub turn_rate_rads: f64,

    /// Units: seconds
    pub turn_time_s: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BumpersParams {
    /// Units: meters/second
    pub back_off_speed_ms: f64,

    /// Units: seconds
    pub back_off_time_s: f64,

    /// Units: radians/second
    pub turn_rate_rads: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AvoidParams {
    /// Obstacles closer than this trigger avoidance.
    ///
    /// Units: meters
    pub obstacle_dist_m: f64,

    /// Forward speed while avoiding.
    ///
    /// Units: meters/second
    pub avoid_speed_ms: f64,

    /// Units: radians/second
    pub turn_rate_rads: f64,

    /// Half width of the forward cone searched for obstacles.
    ///
    /// Units: radians
    pub cone_half_angle_rad: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            max_lin_vel_ms: 0.75,
            max_ang_vel_rads: 1.75,
            max_scan_age_s: 0.5,
            laser_pos_m_rb: [0.0, 0.0],
            laser_yaw_rad_rb: 0.0,
            front_offset_m: 0.2,
            stall_recover: StallRecoverParams {
                back_off_speed_ms: 0.15,
                back_off_time_s: 1.0,
                turn_rate_rads: 0.8,
                turn_time_s: 1.0,
            },
            bumpers: BumpersParams {
                back_off_speed_ms: 0.1,
                back_off_time_s: 1.5,
                turn_rate_rads: 0.5,
            },
            avoid_near: AvoidParams {
                obstacle_dist_m: 0.225,
                avoid_speed_ms: 0.0,
                turn_rate_rads: 0.6,
                cone_half_angle_rad: 30f64.to_radians(),
            },
            avoid_far: AvoidParams {
                obstacle_dist_m: 0.45,
                avoid_speed_ms: 0.2,
                turn_rate_rads: 0.6,
                cone_half_angle_rad: 30f64.to_radians(),
            },
            constant_vel_ms: 0.4,
        }
    }
}
