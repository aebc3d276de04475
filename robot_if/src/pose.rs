//! Planar pose

use serde::{Deserialize, Serialize};

/// A pose on the ground plane of the world frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    /// Position along world X
    ///
    /// Units: meters
    pub x_m: f64,

    /// Position along world Y
    ///
    /// Units: meters
    pub y_m: f64,

    /// Heading, angle of the robot's forward axis to world X.
    ///
    /// Units: radians
    pub phi_rad: f64,
}

impl Pose2D {
    pub fn new(x_m: f64, y_m: f64, phi_rad: f64) -> Self {
        Self { x_m, y_m, phi_rad }
    }
}
