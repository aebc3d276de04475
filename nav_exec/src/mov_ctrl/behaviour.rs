//! Reactive behaviours arbitrated by MovCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use nalgebra::{Rotation2, Vector2};
use serde::Serialize;

use super::{AvoidParams, BumpersParams, StallRecoverParams};
use robot_if::eqpt::{BumpEvent, Bumpers, RangeScan, RobotState, VelCmd};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Everything a behaviour may look at in one cycle.
#[derive(Debug, Clone, Copy)]
pub struct BehaviourInput<'a> {
    /// Time since the controller started.
    ///
    /// Units: seconds
    pub time_s: f64,

    /// Latest robot state, if any has been received.
    pub robot: Option<&'a RobotState>,

    /// Bump events raised since the previous cycle, oldest first.
    pub bump_events: &'a [BumpEvent],

    /// Obstacles from a fresh scan, or `None` if the scan is missing or stale.
    pub obstacles: Option<&'a Obstacles>,
}

/// Laser returns in the robot body frame as `(bearing, distance)` pairs,
/// distances measured from the front of the robot.
#[derive(Debug, Clone, Default)]
pub struct Obstacles {
    points: Vec<(f64, f64)>,
}

/// Behaviour identifiers, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BehaviourKind {
    StallRecover,
    Bumpers,
    AvoidNear,
    AvoidFar,
    ConstantVelocity,
}

/// A reactive behaviour.
#[derive(Debug, Clone)]
pub enum Behaviour {
    StallRecover(StallRecover),
    Bumpers(BumperReact),
    AvoidNear(AvoidFront),
    AvoidFar(AvoidFront),
    ConstantVelocity(ConstantVelocity),
}

/// A timed manouvre: drive at `cmd` until `until_s`.
#[derive(Debug, Clone, Copy)]
struct Timed {
    cmd: VelCmd,
    until_s: f64,
}

/// Backs up, then turns away from the stalled side.
#[derive(Debug, Clone)]
pub struct StallRecover {
    params: StallRecoverParams,
    backing: Option<Timed>,
    turning: Option<Timed>,

    /// Turn direction for the pending turn, +1 counter clockwise.
    turn_dir: f64,
}

/// Reacts to bumper hits by driving away from the hit side.
#[derive(Debug, Clone)]
pub struct BumperReact {
    params: BumpersParams,
    active: Option<Timed>,
}

/// Avoids obstacles in a forward cone.
#[derive(Debug, Clone)]
pub struct AvoidFront {
    params: AvoidParams,

    /// Turn direction held until the cone is clear.
    latched_dir: Option<f64>,
}

/// Drives forward at a fixed speed.
#[derive(Debug, Clone)]
pub struct ConstantVelocity {
    speed_ms: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Obstacles {
    /// Convert the returns of a scan into body frame obstacles.
    pub fn from_scan(
        scan: &RangeScan,
        laser_pos_m_rb: [f64; 2],
        laser_yaw_rad_rb: f64,
        front_offset_m: f64,
    ) -> Self {
        let mount = Vector2::new(laser_pos_m_rb[0], laser_pos_m_rb[1]);
        let yaw = Rotation2::new(laser_yaw_rad_rb);

        let points = scan
            .readings()
            .filter(|(_, r)| scan.is_return(*r))
            .map(|(a, r)| mount + yaw * Vector2::new(r * a.cos(), r * a.sin()))
            .filter(|p| p.x.is_finite() && p.y.is_finite())
            .map(|p| (p.y.atan2(p.x), p.norm() - front_offset_m))
            .collect();

        Self { points }
    }

    /// Nearest obstacle within `half_angle_rad` of straight ahead.
    pub fn nearest_in_cone(&self, half_angle_rad: f64) -> Option<f64> {
        self.points
            .iter()
            .filter(|(b, _)| b.abs() <= half_angle_rad)
            .map(|(_, d)| *d)
            .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.min(d))))
    }

    /// Nearest obstacle on one side of the cone (left for `side > 0`), or
    /// infinity if that side is clear.
    pub fn clearance(&self, half_angle_rad: f64, side: f64) -> f64 {
        self.points
            .iter()
            .filter(|(b, _)| b.abs() <= half_angle_rad && b * side > 0.0)
            .map(|(_, d)| *d)
            .fold(f64::INFINITY, f64::min)
    }
}

impl Behaviour {
    /// The default behaviour set in priority order.
    pub fn default_set(params: &super::Params) -> Vec<Behaviour> {
        vec![
            Behaviour::StallRecover(StallRecover::new(params.stall_recover)),
            Behaviour::Bumpers(BumperReact::new(params.bumpers)),
            Behaviour::AvoidNear(AvoidFront::new(params.avoid_near)),
            Behaviour::AvoidFar(AvoidFront::new(params.avoid_far)),
            Behaviour::ConstantVelocity(ConstantVelocity::new(params.constant_vel_ms)),
        ]
    }

    pub fn kind(&self) -> BehaviourKind {
        match self {
            Behaviour::StallRecover(_) => BehaviourKind::StallRecover,
            Behaviour::Bumpers(_) => BehaviourKind::Bumpers,
            Behaviour::AvoidNear(_) => BehaviourKind::AvoidNear,
            Behaviour::AvoidFar(_) => BehaviourKind::AvoidFar,
            Behaviour::ConstantVelocity(_) => BehaviourKind::ConstantVelocity,
        }
    }

    /// Propose a command, or `None` to abstain.
    pub fn evaluate(&mut self, input: &BehaviourInput) -> Option<VelCmd> {
        match self {
            Behaviour::StallRecover(b) => b.evaluate(input),
            Behaviour::Bumpers(b) => b.evaluate(input),
            Behaviour::AvoidNear(b) | Behaviour::AvoidFar(b) => b.evaluate(input),
            Behaviour::ConstantVelocity(b) => Some(b.command()),
        }
    }
}

impl StallRecover {
    pub fn new(params: StallRecoverParams) -> Self {
        Self {
            params,
            backing: None,
            turning: None,
            turn_dir: 1.0,
        }
    }

    fn evaluate(&mut self, input: &BehaviourInput) -> Option<VelCmd> {
        let t = input.time_s;

        if self.backing.is_none() && self.turning.is_none() {
            if let Some(state) = input.robot.filter(|s| s.stalled()) {
                // Turn away from the stalled side
                self.turn_dir = if state.left_stalled && !state.right_stalled { -1.0 } else { 1.0 };
                self.backing = Some(Timed {
                    cmd: VelCmd::new(-self.params.back_off_speed_ms, 0.0),
                    until_s: t + self.params.back_off_time_s,
                });
                debug!("StallRecover: stall detected, backing off");
            }
        }

        if let Some(b) = self.backing {
            if t < b.until_s {
                return Some(b.cmd);
            }
            self.backing = None;
            self.turning = Some(Timed {
                cmd: VelCmd::new(0.0, self.turn_dir * self.params.turn_rate_rads),
                until_s: b.until_s + self.params.turn_time_s,
            });
        }

        match self.turning {
            Some(m) if t < m.until_s => Some(m.cmd),
            _ => {
                self.turning = None;
                None
            }
        }
    }
}

impl BumperReact {
    pub fn new(params: BumpersParams) -> Self {
        Self { params, active: None }
    }

    fn evaluate(&mut self, input: &BehaviourInput) -> Option<VelCmd> {
        let t = input.time_s;

        // Latest hit wins, currently pressed bumpers count as a hit
        let hit = input
            .bump_events
            .last()
            .map(|e| e.bumpers)
            .or_else(|| input.robot.map(|s| s.bumpers).filter(|b| b.any()));

        if let Some(b) = hit {
            let cmd = self.reaction(&b);
            if self.active.map_or(true, |a| a.cmd != cmd || t >= a.until_s) {
                debug!("Bumpers: hit {:?}, reacting with {:?}", b, cmd);
            }
            self.active = Some(Timed {
                cmd,
                until_s: t + self.params.back_off_time_s,
            });
        }

        match self.active {
            Some(a) if t < a.until_s => Some(a.cmd),
            _ => {
                self.active = None;
                None
            }
        }
    }

    fn reaction(&self, b: &Bumpers) -> VelCmd {
        let p = &self.params;

        let left = b.front_left || b.rear_left;
        let right = b.front_right || b.rear_right;
        let side = match (left, right) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0,
        };

        if b.front() {
            // Backing up, swing the nose away from the hit side
            VelCmd::new(-p.back_off_speed_ms, -side * p.turn_rate_rads)
        }
        else {
            // Pushing forward, swing the tail away from the hit side
            VelCmd::new(p.back_off_speed_ms, side * p.turn_rate_rads)
        }
    }
}

impl AvoidFront {
    pub fn new(params: AvoidParams) -> Self {
        Self {
            params,
            latched_dir: None,
        }
    }

    fn evaluate(&mut self, input: &BehaviourInput) -> Option<VelCmd> {
        let p = &self.params;

        let obstacles = match input.obstacles {
            Some(o) => o,
            None => {
                self.latched_dir = None;
                return None;
            }
        };

        match obstacles.nearest_in_cone(p.cone_half_angle_rad) {
            Some(d) if d < p.obstacle_dist_m => {
                let dir = match self.latched_dir {
                    Some(dir) => dir,
                    None => {
                        let left = obstacles.clearance(p.cone_half_angle_rad, 1.0);
                        let right = obstacles.clearance(p.cone_half_angle_rad, -1.0);
                        if left >= right { 1.0 } else { -1.0 }
                    }
                };
                self.latched_dir = Some(dir);
                Some(VelCmd::new(p.avoid_speed_ms, dir * p.turn_rate_rads))
            }
            _ => {
                self.latched_dir = None;
                None
            }
        }
    }
}

impl ConstantVelocity {
    pub fn new(speed_ms: f64) -> Self {
        Self { speed_ms }
    }

    fn command(&self) -> VelCmd {
        VelCmd::new(self.speed_ms, 0.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mov_ctrl::Params;

    fn scan_with(ranges: Vec<f64>) -> RangeScan {
        let n = ranges.len();
        RangeScan {
            start_angle_rad: -std::f64::consts::FRAC_PI_2,
            increment_rad: std::f64::consts::PI / (n - 1) as f64,
            max_range_m: 8.0,
            ranges_m: ranges,
        }
    }

    fn input<'a>(time_s: f64, robot: Option<&'a RobotState>, obstacles: Option<&'a Obstacles>) -> BehaviourInput<'a> {
        BehaviourInput {
            time_s,
            robot,
            bump_events: &[],
            obstacles,
        }
    }

    #[test]
    fn test_obstacles_cone() {
        // Readings at -90, -45, 0, 45, 90 degrees
        let scan = scan_with(vec![1.0, 8.0, 0.5, 0.3, 8.0]);
        let obs = Obstacles::from_scan(&scan, [0.0, 0.0], 0.0, 0.2);

        assert!((obs.nearest_in_cone(10f64.to_radians()).unwrap() - 0.3).abs() < 1e-9);
        assert!((obs.nearest_in_cone(50f64.to_radians()).unwrap() - 0.1).abs() < 1e-9);
        assert!((obs.clearance(50f64.to_radians(), 1.0) - 0.1).abs() < 1e-9);
        assert!(obs.clearance(50f64.to_radians(), -1.0).is_infinite());
        assert!(Obstacles::default().nearest_in_cone(1.0).is_none());
    }

    #[test]
    fn test_avoid_latches_direction() {
        let mut avoid = AvoidFront::new(AvoidParams {
            cone_half_angle_rad: 50f64.to_radians(),
            ..Params::default().avoid_far
        });

        // Obstacle ahead and to the left, clearer to the right
        let first = Obstacles::from_scan(&scan_with(vec![8.0, 8.0, 0.5, 0.4, 8.0]), [0.0, 0.0], 0.0, 0.2);
        let cmd = avoid.evaluate(&input(0.0, None, Some(&first))).unwrap();
        assert!(cmd.ang_rads < 0.0);
        assert_eq!(cmd.lin_ms, 0.2);

        // Clearance flips sides, but the turn holds until the cone is clear
        let second = Obstacles::from_scan(&scan_with(vec![8.0, 0.4, 0.5, 8.0, 8.0]), [0.0, 0.0], 0.0, 0.2);
        let cmd = avoid.evaluate(&input(0.1, None, Some(&second))).unwrap();
        assert!(cmd.ang_rads < 0.0);

        let clear = Obstacles::default();
        assert!(avoid.evaluate(&input(0.2, None, Some(&clear))).is_none());

        let cmd = avoid.evaluate(&input(0.3, None, Some(&second))).unwrap();
        assert!(cmd.ang_rads > 0.0);

        // No scan is no obstacle
        assert!(avoid.evaluate(&input(0.4, None, None)).is_none());
    }

    #[test]
    fn test_stall_recover_sequence() {
        let params = Params::default().stall_recover;
        let mut sr = StallRecover::new(params);

        let stalled = RobotState {
            left_stalled: true,
            ..Default::default()
        };
        let free = RobotState::default();

        assert!(sr.evaluate(&input(0.0, Some(&free), None)).is_none());

        let cmd = sr.evaluate(&input(1.0, Some(&stalled), None)).unwrap();
        assert!(cmd.lin_ms < 0.0);

        // Still backing after the stall clears
        let cmd = sr.evaluate(&input(1.5, Some(&free), None)).unwrap();
        assert!(cmd.lin_ms < 0.0);

        // Then turns away from the left wheel
        let cmd = sr.evaluate(&input(2.2, Some(&free), None)).unwrap();
        assert_eq!(cmd.lin_ms, 0.0);
        assert!(cmd.ang_rads < 0.0);

        assert!(sr.evaluate(&input(3.1, Some(&free), None)).is_none());
    }

    #[test]
    fn test_bumper_reaction() {
        let mut br = BumperReact::new(Params::default().bumpers);

        let events = [BumpEvent {
            bumpers: Bumpers {
                front_left: true,
                ..Default::default()
            },
            time_s: 0.0,
        }];
        let inp = BehaviourInput {
            time_s: 0.0,
            robot: None,
            bump_events: &events,
            obstacles: None,
        };

        let cmd = br.evaluate(&inp).unwrap();
        assert!(cmd.lin_ms < 0.0);
        assert!(cmd.ang_rads < 0.0);

        // Continues for the back off time without further hits
        assert!(br.evaluate(&input(1.0, None, None)).is_some());
        assert!(br.evaluate(&input(1.6, None, None)).is_none());

        // A rear hit pushes forward
        let rear = RobotState {
            bumpers: Bumpers {
                rear_right: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let cmd = br.evaluate(&input(2.0, Some(&rear), None)).unwrap();
        assert!(cmd.lin_ms > 0.0);
        assert!(cmd.ang_rads < 0.0);
    }
}
