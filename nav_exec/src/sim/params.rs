//! Parameters for the simulated driver

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Integration step of the simulation thread.
    ///
    /// Units: seconds
    pub step_period_s: f64,

    /// Wall segments as `[x_start, y_start, x_end, y_end]`.
    ///
    /// Units: meters,
    /// Frame: World
    pub walls_m: Vec<[f64; 4]>,

    /// Starting pose `[x, y, phi]`.
    ///
    /// Units: meters, meters, radians
    pub initial_pose: [f64; 3],

    /// Seed of the sensor noise generator.
    pub seed: u64,

    // ---- ROBOT ----

    /// Radius of the robot's circular footprint.
    ///
    /// Units: meters
    pub robot_radius_m: f64,

    /// Distance between the wheels.
    ///
    /// Units: meters
    pub track_width_m: f64,

    /// Encoder resolution.
    ///
    /// Units: ticks/meter
    pub ticks_per_m: f64,

    /// Units: meters/second
    pub max_lin_vel_ms: f64,

    /// Units: radians/second
    pub max_ang_vel_rads: f64,

    /// Commands older than this are replaced by a stop.
    ///
    /// Units: seconds
    pub watchdog_timeout_s: f64,

    /// Relative standard deviation of the reported wheel speeds.
    pub odom_noise_frac: f64,

    // ---- LASER ----

    /// Period between scans.
    ///
    /// Units: seconds
    pub scan_period_s: f64,

    /// Position of the laser in the robot body frame.
    ///
    /// Units: meters,
    /// Frame: Robot body
    pub laser_pos_m_rb: [f64; 2],

    /// Units: radians
    pub laser_start_angle_rad: f64,

    /// Units: radians
    pub laser_increment_rad: f64,

    pub laser_num_readings: usize,

    /// Units: meters
    pub laser_max_range_m: f64,

    /// Standard deviation of the range noise.
    ///
    /// Units: meters
    pub range_noise_std_m: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            step_period_s: 0.01,
            walls_m: vec![
                [5.0, -2.0, 5.0, 2.0],
                [5.0, 2.0, -1.0, 2.0],
                [-1.0, 2.0, -1.0, -2.0],
                [-1.0, -2.0, 5.0, -2.0],
            ],
            initial_pose: [0.0, 0.0, 0.0],
            seed: 0,
            robot_radius_m: 0.2,
            track_width_m: 0.33,
            ticks_per_m: 10_000.0,
            max_lin_vel_ms: 1.0,
            max_ang_vel_rads: 2.0,
            watchdog_timeout_s: 0.5,
            odom_noise_frac: 0.01,
            scan_period_s: 0.1,
            laser_pos_m_rb: [0.0, 0.0],
            laser_start_angle_rad: -std::f64::consts::FRAC_PI_2,
            laser_increment_rad: 1f64.to_radians(),
            laser_num_readings: 181,
            laser_max_range_m: 8.0,
            range_noise_std_m: 0.005,
        }
    }
}

impl Params {
    /// Check the parameters describe a runnable simulation.
    pub fn validate(&self) -> Result<(), String> {
        let positive = [
            ("step_period_s", self.step_period_s),
            ("scan_period_s", self.scan_period_s),
            ("track_width_m", self.track_width_m),
            ("ticks_per_m", self.ticks_per_m),
            ("watchdog_timeout_s", self.watchdog_timeout_s),
            ("laser_increment_rad", self.laser_increment_rad),
            ("laser_max_range_m", self.laser_max_range_m),
        ];

        for (name, value) in positive.iter() {
            if !(value.is_finite() && *value > 0.0) {
                return Err(format!("{} must be positive, got {}", name, value));
            }
        }

        if self.range_noise_std_m < 0.0 || self.odom_noise_frac < 0.0 {
            return Err("Noise levels must not be negative".into());
        }

        Ok(())
    }
}
