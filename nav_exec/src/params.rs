//! # Navigation Executable Parameters
//!
//! Parameters of the executable itself. Each module loads its own file.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NavExecParams {
    /// Period of the motion control task.
    ///
    /// Units: seconds
    pub mov_ctrl_cycle_period_s: f64,

    /// Directory, relative to the software root, in which sessions are created
    pub sessions_dir: String,

    /// Minimum log level, one of `info`, `debug` or `trace`
    pub log_level: String,
}

impl Default for NavExecParams {
    fn default() -> Self {
        Self {
            mov_ctrl_cycle_period_s: 0.1,
            sessions_dir: "sessions".into(),
            log_level: "info".into(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{feat_ext, fusion, mov_ctrl, pose_est, sim};
    use util::params::from_str;

    /// The shipped parameter files parse and agree with the defaults.
    #[test]
    fn test_shipped_params() {
        let exec: NavExecParams = from_str(include_str!("../../params/nav_exec.toml")).unwrap();
        assert_eq!(exec.mov_ctrl_cycle_period_s, NavExecParams::default().mov_ctrl_cycle_period_s);

        let fe: feat_ext::Params = from_str(include_str!("../../params/feat_ext.toml")).unwrap();
        assert_eq!(fe.min_support, feat_ext::Params::default().min_support);
        assert!((fe.theta_res_rad - feat_ext::Params::default().theta_res_rad).abs() < 1e-15);

        let pe: pose_est::Params = from_str(include_str!("../../params/pose_est.toml")).unwrap();
        assert_eq!(pe.landmark_points, pose_est::Params::default().landmark_points);
        assert_eq!(pe.landmark_lines.len(), 4);

        let mc: mov_ctrl::Params = from_str(include_str!("../../params/mov_ctrl.toml")).unwrap();
        assert_eq!(mc.avoid_near.obstacle_dist_m, 0.225);
        assert_eq!(mc.stall_recover.turn_time_s, 1.0);

        let fu: fusion::Params = from_str(include_str!("../../params/fusion.toml")).unwrap();
        assert_eq!(fu.odom_source, fusion::OdomSource::Encoders);

        let si: sim::Params = from_str(include_str!("../../params/sim.toml")).unwrap();
        assert!(si.validate().is_ok());
        assert_eq!(si.walls_m, sim::Params::default().walls_m);
    }
}
