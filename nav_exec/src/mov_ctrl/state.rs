//! Implementations for the MovCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use serde::Serialize;
use std::sync::Arc;

// Internal
use super::{Behaviour, BehaviourInput, BehaviourKind, MovCtrlError, Obstacles, Params};
use robot_if::eqpt::{BumpEvent, RangeScan, RobotState, VelCmd};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    maths::clamp,
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Motion control module state
#[derive(Default)]
pub struct MovCtrl {
    params: Params,

    /// Behaviours in priority order.
    behaviours: Vec<Behaviour>,

    report: StatusReport,
    arch_report: Archiver,

    output: Option<VelCmd>,
    arch_output: Archiver,
}

/// Input data to motion control.
#[derive(Debug, Default)]
pub struct InputData {
    /// Time since the controller started.
    ///
    /// Units: seconds
    pub time_s: f64,

    pub robot: Option<RobotState>,

    /// Bump events since the last cycle, oldest first.
    pub bump_events: Vec<BumpEvent>,

    /// The latest scan if it is fresh, `None` if missing or stale.
    pub scan: Option<Arc<RangeScan>>,
}

/// Status report for MovCtrl processing.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct StatusReport {
    pub time_s: f64,

    /// The behaviour whose command was selected.
    pub active: Option<BehaviourKind>,

    /// Nearest obstacle ahead, from the front of the robot.
    ///
    /// Units: meters
    pub nearest_obstacle_m: Option<f64>,

    pub lin_vel_limited: bool,
    pub ang_vel_limited: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MovCtrl {
    /// Create a controller without archives.
    pub fn new(params: Params) -> Self {
        Self {
            behaviours: Behaviour::default_set(&params),
            params,
            ..Default::default()
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The last command produced.
    pub fn output(&self) -> Option<VelCmd> {
        self.output
    }

    /// Clamp a command to the robot's limits, flagging any limit reached.
    fn enforce_limits(&mut self, cmd: VelCmd) -> VelCmd {
        let p = &self.params;

        let lin = clamp(&cmd.lin_ms, &-p.max_lin_vel_ms, &p.max_lin_vel_ms);
        let ang = clamp(&cmd.ang_rads, &-p.max_ang_vel_rads, &p.max_ang_vel_rads);

        self.report.lin_vel_limited = lin != cmd.lin_ms;
        self.report.ang_vel_limited = ang != cmd.ang_rads;

        // NaN demands clamp to themselves, stop instead
        if lin.is_finite() && ang.is_finite() {
            VelCmd::new(lin, ang)
        }
        else {
            VelCmd::stop()
        }
    }
}

impl State for MovCtrl {
    type InitData = &'static str;
    type InitError = MovCtrlError;

    type InputData = InputData;
    type OutputData = VelCmd;
    type StatusReport = StatusReport;
    type ProcError = MovCtrlError;

    /// Initialise the MovCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        let params: Params = params::load(init_data)
            .map_err(MovCtrlError::ParamLoadError)?;

        *self = Self::new(params);

        self.arch_report = Archiver::from_path(session, "mov_ctrl/status_report.csv")
            .map_err(MovCtrlError::ArchiveError)?;
        self.arch_output = Archiver::from_path(session, "mov_ctrl/output.csv")
            .map_err(MovCtrlError::ArchiveError)?;

        Ok(())
    }

    /// Select and limit the command for this cycle.
    ///
    /// Bad or missing sensor data never fails processing, the behaviours
    /// which need it abstain instead.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let prev_active = self.report.active;
        self.report = StatusReport {
            time_s: input_data.time_s,
            ..Default::default()
        };

        let obstacles = input_data.scan.as_ref().map(|s| {
            Obstacles::from_scan(
                s,
                self.params.laser_pos_m_rb,
                self.params.laser_yaw_rad_rb,
                self.params.front_offset_m,
            )
        });
        if let Some(ref o) = obstacles {
            self.report.nearest_obstacle_m =
                o.nearest_in_cone(self.params.avoid_far.cone_half_angle_rad);
        }

        let input = BehaviourInput {
            time_s: input_data.time_s,
            robot: input_data.robot.as_ref(),
            bump_events: &input_data.bump_events,
            obstacles: obstacles.as_ref(),
        };

        // Evaluate every behaviour, then keep the highest priority proposal
        let proposals: Vec<(BehaviourKind, Option<VelCmd>)> = self
            .behaviours
            .iter_mut()
            .map(|b| (b.kind(), b.evaluate(&input)))
            .collect();

        let selected = proposals
            .into_iter()
            .find_map(|(kind, cmd)| cmd.map(|c| (kind, c)));

        let cmd = match selected {
            Some((kind, cmd)) => {
                if prev_active != Some(kind) {
                    debug!("MovCtrl: {:?} now active", kind);
                }
                trace!("MovCtrl: {:?} proposes {:?}", kind, cmd);
                self.report.active = Some(kind);
                cmd
            }
            None => {
                debug!("MovCtrl: no behaviour proposed a command, stopping");
                VelCmd::stop()
            }
        };

        let cmd = self.enforce_limits(cmd);
        self.output = Some(cmd);

        Ok((cmd, self.report))
    }
}

impl Archived for MovCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        self.arch_report.serialise(self.report)?;
        self.arch_output.serialise(self.output)?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn scan_ahead(range_m: f64) -> Arc<RangeScan> {
        // 181 readings over the front half plane, obstacle dead ahead
        let mut ranges_m = vec![8.0; 181];
        ranges_m[90] = range_m;

        Arc::new(RangeScan {
            start_angle_rad: -std::f64::consts::FRAC_PI_2,
            increment_rad: 1f64.to_radians(),
            max_range_m: 8.0,
            ranges_m,
        })
    }

    #[test]
    fn test_constant_velocity_when_clear() {
        let mut mc = MovCtrl::new(Params::default());
        let input = InputData {
            robot: Some(RobotState::default()),
            scan: Some(scan_ahead(8.0)),
            ..Default::default()
        };

        let (cmd, report) = mc.proc(&input).unwrap();
        assert_eq!(cmd, VelCmd::new(0.4, 0.0));
        assert_eq!(report.active, Some(BehaviourKind::ConstantVelocity));
    }

    #[test]
    fn test_near_obstacle_beats_constant_velocity() {
        let mut mc = MovCtrl::new(Params::default());

        // 0.35 m from the laser, 0.15 m from the front
        let input = InputData {
            robot: Some(RobotState::default()),
            scan: Some(scan_ahead(0.35)),
            ..Default::default()
        };

        let (cmd, report) = mc.proc(&input).unwrap();
        assert_eq!(report.active, Some(BehaviourKind::AvoidNear));
        assert_eq!(cmd.lin_ms, 0.0);
        assert!(cmd.ang_rads != 0.0);

        // Further away only the far avoidance triggers
        let input = InputData {
            scan: Some(scan_ahead(0.55)),
            ..input
        };
        let (cmd, report) = mc.proc(&input).unwrap();
        assert_eq!(report.active, Some(BehaviourKind::AvoidFar));
        assert_eq!(cmd.lin_ms, 0.2);
    }

    #[test]
    fn test_stale_scan_is_no_obstacle() {
        let mut mc = MovCtrl::new(Params::default());
        let input = InputData {
            robot: Some(RobotState::default()),
            scan: None,
            ..Default::default()
        };

        let (cmd, report) = mc.proc(&input).unwrap();
        assert_eq!(report.active, Some(BehaviourKind::ConstantVelocity));
        assert_eq!(cmd, VelCmd::new(0.4, 0.0));
        assert!(report.nearest_obstacle_m.is_none());
    }

    #[test]
    fn test_stall_beats_everything() {
        let mut mc = MovCtrl::new(Params::default());
        let input = InputData {
            robot: Some(RobotState {
                right_stalled: true,
                ..Default::default()
            }),
            scan: Some(scan_ahead(0.3)),
            ..Default::default()
        };

        let (cmd, report) = mc.proc(&input).unwrap();
        assert_eq!(report.active, Some(BehaviourKind::StallRecover));
        assert!(cmd.lin_ms < 0.0);
    }

    #[test]
    fn test_limits_enforced() {
        let mut mc = MovCtrl::new(Params {
            constant_vel_ms: 2.0,
            ..Params::default()
        });

        let (cmd, report) = mc.proc(&InputData::default()).unwrap();
        assert_eq!(cmd.lin_ms, 0.75);
        assert!(report.lin_vel_limited);
        assert!(!report.ang_vel_limited);
    }
}
