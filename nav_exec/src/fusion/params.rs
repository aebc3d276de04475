//! Parameters for the fusion loop

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Where propagation takes its odometry from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum OdomSource {
    /// The body velocities reported by the robot.
    Velocity,

    /// Left and right wheel speeds combined over the track width.
    WheelVelocity,

    /// Encoder count differences between cycles.
    Encoders,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Units: seconds
    pub cycle_period_s: f64,

    pub odom_source: OdomSource,

    /// Distance between the wheels.
    ///
    /// Units: meters
    pub track_width_m: f64,

    /// Encoder resolution.
    ///
    /// Units: ticks/meter
    pub ticks_per_m: f64,

    /// Log the pose every this many cycles, zero to disable.
    pub log_tm_every: usize,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            cycle_period_s: 0.02,
            odom_source: OdomSource::Velocity,
            track_width_m: 0.33,
            ticks_per_m: 10_000.0,
            log_tm_every: 50,
        }
    }
}
