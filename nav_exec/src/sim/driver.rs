//! Simulated robot and its driver thread

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use nalgebra::{Point2, Rotation2, Vector2};
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};

use super::{Params, SimError, World};
use robot_if::{
    eqpt::{Actuator, ActuatorError, BumpEvent, Bumpers, RangeScan, RobotState, VelCmd},
    feed::SensorFeed,
    pose::Pose2D,
};
use util::maths::{clamp, wrap_2pi};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Distance beyond the footprint at which a wall still presses a bumper.
///
/// Units: meters
const CONTACT_TOL_M: f64 = 0.01;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The simulated robot: kinematics, contact and sensors, stepped explicitly.
pub struct SimRobot {
    params: Params,
    world: World,

    pose: Pose2D,
    time_s: f64,

    /// Fractional encoder counts.
    enc_m: [f64; 2],

    bumpers: Bumpers,

    rng: StdRng,
    range_noise: Option<Normal<f64>>,
    odom_noise: Option<Normal<f64>>,
}

/// Output of one simulation step.
#[derive(Debug, Clone, Copy)]
pub struct StepOutput {
    pub state: RobotState,

    /// Raised when a bumper closes on this step.
    pub bump: Option<BumpEvent>,
}

/// Owner of the simulation thread.
pub struct SimDriver {
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
    cmd: Arc<Mutex<CmdSlot>>,
    feed: SensorFeed,
}

/// Actuator handle commanding the simulated robot.
#[derive(Clone)]
pub struct SimActuator {
    cmd: Arc<Mutex<CmdSlot>>,
    max_lin_vel_ms: f64,
    max_ang_vel_rads: f64,
}

#[derive(Debug, Default)]
struct CmdSlot {
    cmd: VelCmd,
    stamp: Option<Instant>,
    connected: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimRobot {
    pub fn new(params: Params) -> Result<Self, SimError> {
        params.validate().map_err(SimError::InvalidParams)?;

        let noise = |std: f64| -> Result<Option<Normal<f64>>, SimError> {
            if std > 0.0 {
                Normal::new(0.0, std)
                    .map(Some)
                    .map_err(|e| SimError::InvalidParams(format!("{:?}", e)))
            }
            else {
                Ok(None)
            }
        };

        Ok(Self {
            world: World::from_segments(&params.walls_m),
            pose: Pose2D::new(
                params.initial_pose[0],
                params.initial_pose[1],
                wrap_2pi(params.initial_pose[2]),
            ),
            time_s: 0.0,
            enc_m: [0.0; 2],
            bumpers: Bumpers::default(),
            rng: StdRng::seed_from_u64(params.seed),
            range_noise: noise(params.range_noise_std_m)?,
            odom_noise: noise(params.odom_noise_frac)?,
            params,
        })
    }

    /// The true pose.
    pub fn pose(&self) -> Pose2D {
        self.pose
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Advance the simulation by `dt_s` under the given command.
    pub fn step(&mut self, cmd: &VelCmd, dt_s: f64) -> StepOutput {
        let p = &self.params;
        let v = clamp(&cmd.lin_ms, &-p.max_lin_vel_ms, &p.max_lin_vel_ms);
        let w = clamp(&cmd.ang_rads, &-p.max_ang_vel_rads, &p.max_ang_vel_rads);

        self.time_s += dt_s;

        // Midpoint integration of the unicycle model
        let mid_phi = self.pose.phi_rad + 0.5 * w * dt_s;
        let next = Point2::new(
            self.pose.x_m + v * dt_s * mid_phi.cos(),
            self.pose.y_m + v * dt_s * mid_phi.sin(),
        );
        let here = Point2::new(self.pose.x_m, self.pose.y_m);

        // Translation into a wall is blocked, rotation in place never is
        let blocked = match (self.world.nearest(&next), self.world.nearest(&here)) {
            (Some((_, d_next)), Some((_, d_here))) => {
                d_next < p.robot_radius_m && d_next < d_here
            }
            _ => false,
        };

        let v_actual = if blocked { 0.0 } else { v };
        if !blocked {
            self.pose.x_m = next.x;
            self.pose.y_m = next.y;
        }
        self.pose.phi_rad = wrap_2pi(self.pose.phi_rad + w * dt_s);

        // Wheel speeds, with noise on the reported values only
        let half_track = 0.5 * p.track_width_m;
        let mut left = v_actual - w * half_track;
        let mut right = v_actual + w * half_track;
        if let Some(n) = self.odom_noise {
            left *= 1.0 + n.sample(&mut self.rng);
            right *= 1.0 + n.sample(&mut self.rng);
        }
        self.enc_m[0] += left * dt_s;
        self.enc_m[1] += right * dt_s;

        let stalled = blocked && v != 0.0;
        let bumpers = self.contact();
        let bump = if bumpers.any() && !self.bumpers.any() {
            Some(BumpEvent {
                bumpers,
                time_s: self.time_s,
            })
        }
        else {
            None
        };
        self.bumpers = bumpers;

        let state = RobotState {
            lin_vel_ms: 0.5 * (left + right),
            ang_vel_rads: (right - left) / p.track_width_m,
            left_vel_ms: left,
            right_vel_ms: right,
            left_enc_ticks: (self.enc_m[0] * p.ticks_per_m).round() as i64,
            right_enc_ticks: (self.enc_m[1] * p.ticks_per_m).round() as i64,
            left_stalled: stalled,
            right_stalled: stalled,
            bumpers,
        };

        StepOutput { state, bump }
    }

    /// Bumpers pressed by the nearest wall, if it touches the footprint.
    fn contact(&self) -> Bumpers {
        let here = Point2::new(self.pose.x_m, self.pose.y_m);

        match self.world.nearest(&here) {
            Some((c, d)) if d <= self.params.robot_radius_m + CONTACT_TOL_M => {
                let rel = Rotation2::new(-self.pose.phi_rad) * (c - here);
                let front = rel.x >= 0.0;
                let left = rel.y >= 0.0;
                Bumpers {
                    front_left: front && left,
                    front_right: front && !left,
                    rear_left: !front && left,
                    rear_right: !front && !left,
                }
            }
            _ => Bumpers::default(),
        }
    }

    /// Ray cast a laser sweep from the current pose.
    pub fn scan(&mut self) -> RangeScan {
        let p = &self.params;
        let origin = Point2::new(self.pose.x_m, self.pose.y_m)
            + Rotation2::new(self.pose.phi_rad)
                * Vector2::new(p.laser_pos_m_rb[0], p.laser_pos_m_rb[1]);

        let mut ranges_m = Vec::with_capacity(p.laser_num_readings);
        for i in 0..p.laser_num_readings {
            let angle = self.pose.phi_rad + p.laser_start_angle_rad + i as f64 * p.laser_increment_rad;
            let r = match self.world.ray_cast(&origin, angle, p.laser_max_range_m) {
                Some(r) => match self.range_noise {
                    Some(n) => (r + n.sample(&mut self.rng)).max(0.0),
                    None => r,
                },
                None => p.laser_max_range_m,
            };
            ranges_m.push(r);
        }

        RangeScan {
            start_angle_rad: p.laser_start_angle_rad,
            increment_rad: p.laser_increment_rad,
            max_range_m: p.laser_max_range_m,
            ranges_m,
        }
    }
}

impl SimDriver {
    /// Start the simulation thread publishing into `feed`.
    ///
    /// Returns the driver and an actuator which commands the simulated
    /// robot. The robot and laser are reported connected until `stop`.
    pub fn start(params: Params, feed: SensorFeed) -> Result<(Self, SimActuator), SimError> {
        let robot = SimRobot::new(params.clone())?;

        let cmd = Arc::new(Mutex::new(CmdSlot {
            connected: true,
            ..Default::default()
        }));
        let bg_run = Arc::new(AtomicBool::new(true));

        feed.publish_true_pose(robot.pose());
        feed.set_robot_connected(true);
        feed.set_laser_connected(true);

        let bg_jh = {
            let cmd = cmd.clone();
            let bg_run = bg_run.clone();
            let feed = feed.clone();
            let params = params.clone();
            thread::Builder::new()
                .name("sim".into())
                .spawn(move || bg_thread(robot, params, feed, cmd, bg_run))
                .map_err(|e| SimError::InvalidParams(format!("Cannot spawn thread: {}", e)))?
        };

        info!("Simulated driver started");

        Ok((
            Self {
                bg_jh: Some(bg_jh),
                bg_run,
                cmd: cmd.clone(),
                feed,
            },
            SimActuator {
                cmd,
                max_lin_vel_ms: params.max_lin_vel_ms,
                max_ang_vel_rads: params.max_ang_vel_rads,
            },
        ))
    }

    /// Stop the simulation and report both devices disconnected.
    pub fn stop(mut self) -> Result<(), SimError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), SimError> {
        self.bg_run.store(false, Ordering::SeqCst);
        self.cmd.lock().expect("Sim command mutex poisoned").connected = false;
        self.feed.set_robot_connected(false);
        self.feed.set_laser_connected(false);

        match self.bg_jh.take() {
            Some(jh) => jh.join().map_err(|_| SimError::ThreadPanicked),
            None => Ok(()),
        }
    }
}

impl Drop for SimDriver {
    fn drop(&mut self) {
        if self.shutdown().is_err() {
            warn!("Simulation thread panicked");
        }
    }
}

impl Actuator for SimActuator {
    fn send_vel(&mut self, cmd: &VelCmd) -> Result<(), ActuatorError> {
        let mut slot = self.cmd.lock().expect("Sim command mutex poisoned");

        if !slot.connected {
            return Err(ActuatorError::NotConnected);
        }

        slot.cmd = VelCmd::new(
            clamp(&cmd.lin_ms, &-self.max_lin_vel_ms, &self.max_lin_vel_ms),
            clamp(&cmd.ang_rads, &-self.max_ang_vel_rads, &self.max_ang_vel_rads),
        );
        slot.stamp = Some(Instant::now());

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Background thread, steps the robot at a fixed period and publishes its
/// sensors.
fn bg_thread(
    mut robot: SimRobot,
    params: Params,
    feed: SensorFeed,
    cmd: Arc<Mutex<CmdSlot>>,
    run: Arc<AtomicBool>,
) {
    let step = Duration::from_secs_f64(params.step_period_s);
    let watchdog = Duration::from_secs_f64(params.watchdog_timeout_s);
    let mut since_scan_s = params.scan_period_s;
    let mut watchdog_tripped = false;

    while run.load(Ordering::Relaxed) {
        let cycle_start = Instant::now();

        let demand = {
            let slot = cmd.lock().expect("Sim command mutex poisoned");
            match slot.stamp {
                Some(s) if cycle_start.duration_since(s) <= watchdog => {
                    watchdog_tripped = false;
                    slot.cmd
                }
                Some(_) => {
                    if !watchdog_tripped {
                        debug!("Sim command watchdog tripped, stopping");
                        watchdog_tripped = true;
                    }
                    VelCmd::stop()
                }
                None => VelCmd::stop(),
            }
        };

        let out = robot.step(&demand, params.step_period_s);

        feed.publish_robot_state(out.state);
        feed.publish_true_pose(robot.pose());
        if let Some(b) = out.bump {
            debug!("Sim bump: {:?}", b.bumpers);
            feed.push_bump_event(b);
        }

        since_scan_s += params.step_period_s;
        if since_scan_s >= params.scan_period_s {
            since_scan_s = 0.0;
            feed.publish_scan(robot.scan());
        }

        if let Some(rem) = step.checked_sub(cycle_start.elapsed()) {
            thread::sleep(rem);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn quiet() -> Params {
        Params {
            range_noise_std_m: 0.0,
            odom_noise_frac: 0.0,
            ..Params::default()
        }
    }

    #[test]
    fn test_drive_straight() {
        let mut robot = SimRobot::new(quiet()).unwrap();

        let mut out = None;
        for _ in 0..100 {
            out = Some(robot.step(&VelCmd::new(0.5, 0.0), 0.01));
        }

        let pose = robot.pose();
        assert!((pose.x_m - 0.5).abs() < 1e-9);
        assert!(pose.y_m.abs() < 1e-9);

        let state = out.unwrap().state;
        assert!((state.lin_vel_ms - 0.5).abs() < 1e-9);
        assert_eq!(state.left_enc_ticks, 5000);
        assert_eq!(state.right_enc_ticks, 5000);
        assert!(!state.stalled());
    }

    #[test]
    fn test_turn_in_place() {
        let mut robot = SimRobot::new(quiet()).unwrap();
        for _ in 0..100 {
            robot.step(&VelCmd::new(0.0, 1.0), 0.01);
        }
        assert!((robot.pose().phi_rad - 1.0).abs() < 1e-9);
        assert!(robot.pose().x_m.abs() < 1e-12);
    }

    #[test]
    fn test_wall_contact_stalls_and_bumps() {
        let mut robot = SimRobot::new(Params {
            initial_pose: [4.5, 0.0, 0.0],
            ..quiet()
        })
        .unwrap();

        let mut bumps = 0;
        let mut last = None;
        for _ in 0..200 {
            let out = robot.step(&VelCmd::new(0.5, 0.0), 0.01);
            if out.bump.is_some() {
                bumps += 1;
            }
            last = Some(out.state);
        }

        // Stopped short of the wall at x = 5
        assert!(robot.pose().x_m < 5.0 - 0.19);
        let state = last.unwrap();
        assert!(state.stalled());
        assert!(state.bumpers.front());
        assert!(!state.bumpers.rear());
        assert_eq!(bumps, 1);

        // Backing off releases the stall
        let out = robot.step(&VelCmd::new(-0.2, 0.0), 0.01);
        assert!(!out.state.stalled());
    }

    #[test]
    fn test_scan_of_room() {
        let mut robot = SimRobot::new(quiet()).unwrap();
        let scan = robot.scan();

        assert_eq!(scan.len(), 181);
        // Readings at -90, 0 and +90 degrees
        assert!((scan.ranges_m[0] - 2.0).abs() < 1e-9);
        assert!((scan.ranges_m[90] - 5.0).abs() < 1e-9);
        assert!((scan.ranges_m[180] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_driver_publishes_and_disconnects() {
        let feed = SensorFeed::new();
        let (driver, mut act) = SimDriver::start(quiet(), feed.clone()).unwrap();

        assert!(feed.robot_connected() && feed.laser_connected());
        act.send_vel(&VelCmd::new(0.2, 0.0)).unwrap();

        thread::sleep(Duration::from_millis(200));
        assert!(feed.robot_state().is_some());
        assert!(feed.latest_scan().is_some());
        assert!(feed.true_pose().unwrap().x_m > 0.0);

        driver.stop().unwrap();
        assert!(!feed.robot_connected());
        assert!(!feed.laser_connected());
        assert!(matches!(
            act.send_vel(&VelCmd::stop()),
            Err(ActuatorError::NotConnected)
        ));
    }
}
