//! Conversion of robot state into propagation odometry

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;

use super::{OdomSource, Params};
use crate::pose_est::Odometry;
use robot_if::eqpt::RobotState;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Turns successive robot states into body velocities.
#[derive(Debug, Clone)]
pub struct OdomReader {
    source: OdomSource,
    track_width_m: f64,
    ticks_per_m: f64,

    /// Encoder counts at the previous read.
    last_ticks: Option<(i64, i64)>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl OdomReader {
    pub fn new(params: &Params) -> Self {
        Self {
            source: params.odom_source,
            track_width_m: params.track_width_m,
            ticks_per_m: params.ticks_per_m,
            last_ticks: None,
        }
    }

    /// Odometry over the last `dt_s` seconds, zero if there is no state.
    pub fn read(&mut self, state: Option<&RobotState>, dt_s: f64) -> Odometry {
        let state = match state {
            Some(s) => s,
            None => {
                trace!("Fusion: no robot state, assuming stationary");
                return Odometry::default();
            }
        };

        match self.source {
            OdomSource::Velocity => Odometry::new(state.lin_vel_ms, state.ang_vel_rads),
            OdomSource::WheelVelocity => {
                self.wheels_to_body(state.left_vel_ms, state.right_vel_ms)
            }
            OdomSource::Encoders => {
                let ticks = (state.left_enc_ticks, state.right_enc_ticks);
                let last = self.last_ticks.replace(ticks);

                match last {
                    Some(prev) if dt_s > 0.0 && dt_s.is_finite() => {
                        let left = (ticks.0 - prev.0) as f64 / self.ticks_per_m / dt_s;
                        let right = (ticks.1 - prev.1) as f64 / self.ticks_per_m / dt_s;
                        self.wheels_to_body(left, right)
                    }
                    _ => Odometry::default(),
                }
            }
        }
    }

    fn wheels_to_body(&self, left_ms: f64, right_ms: f64) -> Odometry {
        Odometry::new(
            0.5 * (left_ms + right_ms),
            (right_ms - left_ms) / self.track_width_m,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn reader(source: OdomSource) -> OdomReader {
        OdomReader::new(&Params {
            odom_source: source,
            track_width_m: 0.5,
            ticks_per_m: 1000.0,
            ..Params::default()
        })
    }

    #[test]
    fn test_velocity_sources() {
        let state = RobotState {
            lin_vel_ms: 0.3,
            ang_vel_rads: 0.1,
            left_vel_ms: 0.2,
            right_vel_ms: 0.4,
            ..Default::default()
        };

        assert_eq!(reader(OdomSource::Velocity).read(Some(&state), 0.02), Odometry::new(0.3, 0.1));

        let o = reader(OdomSource::WheelVelocity).read(Some(&state), 0.02);
        assert!((o.lin_vel_ms - 0.3).abs() < 1e-12);
        assert!((o.ang_vel_rads - 0.4).abs() < 1e-12);

        assert_eq!(reader(OdomSource::Velocity).read(None, 0.02), Odometry::default());
    }

    #[test]
    fn test_encoders() {
        let mut r = reader(OdomSource::Encoders);

        let mut state = RobotState {
            left_enc_ticks: 100,
            right_enc_ticks: 100,
            ..Default::default()
        };

        // First read has nothing to difference against
        assert_eq!(r.read(Some(&state), 0.1), Odometry::default());

        state.left_enc_ticks += 10;
        state.right_enc_ticks += 30;
        let o = r.read(Some(&state), 0.1);
        assert!((o.lin_vel_ms - 0.2).abs() < 1e-12);
        assert!((o.ang_vel_rads - 0.4).abs() < 1e-12);
    }
}
