//! # Telemetry
//!
//! The fusion loop emits one `PoseTm` per cycle. Sinks are one-way, no
//! acknowledgement is expected and a failing sink never stops the loop.

use serde::Serialize;

use crate::pose::Pose2D;

/// Pose telemetry emitted once per fusion cycle.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PoseTm {
    /// Time since the fusion loop started at which the estimate was produced.
    ///
    /// Units: seconds
    pub time_s: f64,

    /// Estimated pose
    pub est: Pose2D,

    /// Ground truth pose, when the driver provides one (simulation only).
    pub truth: Option<Pose2D>,

    /// Number of feature updates applied during this cycle.
    pub num_updates: usize,
}

impl PoseTm {
    /// The pose as the plain ordered `(x, y, phi)` tuple.
    pub fn as_tuple(&self) -> (f64, f64, f64) {
        (self.est.x_m, self.est.y_m, self.est.phi_rad)
    }
}

/// Destination for pose telemetry.
pub trait TelemetrySink: Send {
    /// Publish one telemetry item.
    fn send(&mut self, tm: &PoseTm);
}
