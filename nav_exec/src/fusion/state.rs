//! The fusion loop state and cycle

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    thread,
    time::{Duration, Instant},
};

use log::{debug, error, info, trace, warn};
use nalgebra::Matrix2;

use super::{FusionError, OdomReader, Params};
use crate::{
    feat_ext::FeatExt,
    pose_est::{self, diag2, Assoc, Landmarks, Observation, PoseEst},
    shutdown::Shutdown,
};
use robot_if::{
    feed::SensorFeed,
    tm::{PoseTm, TelemetrySink},
};
use util::time::Clock;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Owns the pose estimator and feeds it from the sensor feed.
pub struct FusionLoop<C: Clock> {
    feat_ext: FeatExt,
    est: PoseEst,
    landmarks: Landmarks,
    odom: OdomReader,

    /// Default noise for line and point observations.
    line_noise: Matrix2<f64>,
    point_noise: Matrix2<f64>,
    gate_chi2: f64,

    feed: SensorFeed,
    clock: C,
    sinks: Vec<Box<dyn TelemetrySink>>,
    shutdown: Shutdown,
    cycle_period: Duration,

    start: Instant,
    last: Instant,

    /// Sequence number of the last scan processed.
    last_scan_seq: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<C: Clock> FusionLoop<C> {
    pub fn new(
        params: &Params,
        feat_ext: FeatExt,
        est_params: pose_est::Params,
        feed: SensorFeed,
        clock: C,
        shutdown: Shutdown,
    ) -> Self {
        let now = clock.now();

        Self {
            feat_ext,
            landmarks: Landmarks::from_params(&est_params),
            line_noise: diag2(est_params.line_noise_diag),
            point_noise: diag2(est_params.point_noise_diag),
            gate_chi2: est_params.gate_chi2,
            est: PoseEst::new(est_params),
            odom: OdomReader::new(params),
            feed,
            clock,
            sinks: Vec::new(),
            shutdown,
            cycle_period: period_from_secs(params.cycle_period_s),
            start: now,
            last: now,
            last_scan_seq: 0,
        }
    }

    /// Add a destination for the per-cycle pose telemetry.
    pub fn add_sink(&mut self, sink: Box<dyn TelemetrySink>) {
        self.sinks.push(sink);
    }

    pub fn estimator(&self) -> &PoseEst {
        &self.est
    }

    /// Run one propagate/update cycle and publish the result.
    pub fn cycle(&mut self) -> Result<PoseTm, FusionError> {
        if !self.feed.robot_connected() {
            return self.connection_lost("robot");
        }
        if !self.feed.laser_connected() {
            return self.connection_lost("laser");
        }

        let now = self.clock.now();
        let dt_s = now.saturating_duration_since(self.last).as_secs_f64();
        self.last = now;

        // Propagate
        let state = self.feed.robot_state().map(|s| s.data);
        let odom = self.odom.read(state.as_ref(), dt_s);
        let prop = self.est.propagate(dt_s, &odom);
        if prop.cov_reset {
            debug!("Fusion: covariance reset during propagation");
        }

        // Update from any new scan
        let mut num_updates = 0;

        if let Some(scan) = self.feed.latest_scan() {
            if scan.seq != self.last_scan_seq {
                self.last_scan_seq = scan.seq;
                num_updates = self.update_from_scan(&scan.data);
            }
        }

        let tm = PoseTm {
            time_s: now.saturating_duration_since(self.start).as_secs_f64(),
            est: self.est.pose(),
            truth: self.feed.true_pose(),
            num_updates,
        };

        for sink in self.sinks.iter_mut() {
            sink.send(&tm);
        }

        Ok(tm)
    }

    /// Cycle until shutdown is requested or a connection is lost.
    pub fn run(&mut self) -> Result<(), FusionError> {
        info!("Fusion task started");

        while !self.shutdown.is_requested() {
            let cycle_start = Instant::now();

            self.cycle()?;

            match self.cycle_period.checked_sub(cycle_start.elapsed()) {
                Some(d) => thread::sleep(d),
                None => warn!(
                    "Fusion cycle overran by {:.06} s",
                    (cycle_start.elapsed() - self.cycle_period).as_secs_f64()
                ),
            }
        }

        info!("Fusion task stopped");

        Ok(())
    }

    /// Extract, associate and apply every feature of a scan. Returns the
    /// number of updates applied.
    fn update_from_scan(&mut self, scan: &robot_if::eqpt::RangeScan) -> usize {
        let mut num_updates = 0;

        for feature in self.feat_ext.extract(scan) {
            let obs = Observation::from_feature(&feature);
            let r = match obs {
                Observation::Line { .. } => self.line_noise,
                Observation::Point { .. } => self.point_noise,
            };

            match self.landmarks.associate(&self.est, &obs, &r, self.gate_chi2) {
                Assoc::Unique(meas) => match self.est.update(&meas, &r) {
                    Ok(_) => num_updates += 1,
                    Err(e) => debug!("Fusion: update rejected: {}", e),
                },
                Assoc::NoMatch => trace!("Fusion: no landmark for {:?}", obs),
                Assoc::Ambiguous(n) => {
                    debug!("Fusion: {:?} matches {} landmarks, skipped", obs, n)
                }
            }
        }

        num_updates
    }

    fn connection_lost(&mut self, device: &'static str) -> Result<PoseTm, FusionError> {
        error!("Fusion: connection to the {} lost", device);
        self.shutdown.request();
        Err(FusionError::ConnectionLost(device))
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// A cycle period, zero if `period_s` is not a usable duration.
fn period_from_secs(period_s: f64) -> Duration {
    if period_s.is_finite() && period_s > 0.0 {
        Duration::from_secs_f64(period_s)
    }
    else {
        warn!("Fusion: invalid cycle period {} s, running unthrottled", period_s);
        Duration::default()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        fusion::OdomSource,
        sim::{self, SimRobot},
    };
    use robot_if::eqpt::{RobotState, VelCmd};
    use std::sync::{Arc, Mutex};
    use util::time::ManualClock;

    #[derive(Clone, Default)]
    struct RecordingSink {
        received: Arc<Mutex<Vec<PoseTm>>>,
    }

    impl TelemetrySink for RecordingSink {
        fn send(&mut self, tm: &PoseTm) {
            self.received.lock().unwrap().push(*tm);
        }
    }

    fn connected_feed() -> SensorFeed {
        let feed = SensorFeed::new();
        feed.set_robot_connected(true);
        feed.set_laser_connected(true);
        feed
    }

    fn fusion(feed: &SensorFeed, clock: &ManualClock, source: OdomSource) -> FusionLoop<ManualClock> {
        FusionLoop::new(
            &Params {
                odom_source: source,
                ..Params::default()
            },
            FeatExt::default(),
            pose_est::Params::default(),
            feed.clone(),
            clock.clone(),
            Shutdown::new(),
        )
    }

    #[test]
    fn test_propagate_from_velocity() {
        let feed = connected_feed();
        let clock = ManualClock::new();
        let mut fl = fusion(&feed, &clock, OdomSource::Velocity);
        let sink = RecordingSink::default();
        fl.add_sink(Box::new(sink.clone()));

        feed.publish_robot_state(RobotState {
            lin_vel_ms: 0.5,
            ..Default::default()
        });

        for _ in 0..10 {
            clock.advance(Duration::from_millis(20));
            fl.cycle().unwrap();
        }

        let tms = sink.received.lock().unwrap();
        assert_eq!(tms.len(), 10);

        let last = tms.last().unwrap();
        assert!((last.est.x_m - 0.1).abs() < 1e-9);
        assert!((last.time_s - 0.2).abs() < 1e-9);
        assert_eq!(last.num_updates, 0);
        assert!(last.truth.is_none());
    }

    #[test]
    fn test_propagate_from_encoders() {
        let feed = connected_feed();
        let clock = ManualClock::new();
        let mut fl = fusion(&feed, &clock, OdomSource::Encoders);

        // 10000 ticks/m, so 200 ticks per 20 ms cycle is 1 m/s
        for i in 0..=5 {
            feed.publish_robot_state(RobotState {
                left_enc_ticks: 200 * i,
                right_enc_ticks: 200 * i,
                ..Default::default()
            });
            clock.advance(Duration::from_millis(20));
            fl.cycle().unwrap();
        }

        assert!((fl.estimator().pose().x_m - 0.1).abs() < 1e-9);
        assert!(fl.estimator().pose().y_m.abs() < 1e-12);
    }

    #[test]
    fn test_scan_updates_once() {
        let feed = connected_feed();
        let clock = ManualClock::new();
        let mut fl = fusion(&feed, &clock, OdomSource::Velocity);

        let mut robot = SimRobot::new(sim::Params::default()).unwrap();
        let out = robot.step(&VelCmd::stop(), 0.01);
        feed.publish_robot_state(out.state);
        feed.publish_true_pose(robot.pose());
        feed.publish_scan(robot.scan());

        clock.advance(Duration::from_millis(20));
        let tm = fl.cycle().unwrap();
        assert!(tm.num_updates > 0);
        assert!(tm.truth.is_some());

        // Updates against the true walls keep the estimate at the origin
        assert!(tm.est.x_m.abs() < 0.05);
        assert!(tm.est.y_m.abs() < 0.05);

        // The same scan is not used twice
        clock.advance(Duration::from_millis(20));
        assert_eq!(fl.cycle().unwrap().num_updates, 0);
    }

    #[test]
    fn test_corrects_offset_prior() {
        let feed = connected_feed();
        let clock = ManualClock::new();
        let mut fl = FusionLoop::new(
            &Params::default(),
            FeatExt::default(),
            pose_est::Params {
                initial_pose: [0.05, -0.05, 0.0],
                ..pose_est::Params::default()
            },
            feed.clone(),
            clock.clone(),
            Shutdown::new(),
        );

        let mut robot = SimRobot::new(sim::Params::default()).unwrap();
        feed.publish_robot_state(RobotState::default());

        let p0 = fl.estimator().covariance()[(0, 0)];
        for _ in 0..5 {
            feed.publish_scan(robot.scan());
            clock.advance(Duration::from_millis(20));
            fl.cycle().unwrap();
        }

        let pose = fl.estimator().pose();
        assert!(pose.x_m.abs() < 0.02);
        assert!(pose.y_m.abs() < 0.02);
        assert!(fl.estimator().covariance()[(0, 0)] < p0);
    }

    #[test]
    fn test_single_wall_correction() {
        let feed = connected_feed();
        let clock = ManualClock::new();

        // One wall at x = 2, with the estimate started 10 cm off
        let mut robot = SimRobot::new(sim::Params {
            walls_m: vec![[2.0, -3.0, 2.0, 3.0]],
            range_noise_std_m: 0.0,
            ..sim::Params::default()
        })
        .unwrap();

        let mut fl = FusionLoop::new(
            &Params::default(),
            FeatExt::default(),
            pose_est::Params {
                initial_pose: [0.1, 0.0, 0.0],
                landmark_lines: vec![[2.0, 0.0]],
                landmark_points: vec![],
                line_noise_diag: [0.000625, 0.000625],
                ..pose_est::Params::default()
            },
            feed.clone(),
            clock.clone(),
            Shutdown::new(),
        );

        feed.publish_robot_state(RobotState::default());
        feed.publish_scan(robot.scan());

        let p0 = fl.estimator().covariance()[(0, 0)];
        clock.advance(Duration::from_millis(20));
        let tm = fl.cycle().unwrap();

        assert_eq!(tm.num_updates, 1);
        assert!(tm.est.x_m.abs() < 0.1);
        assert!(tm.est.x_m.abs() < 0.01);
        assert!(fl.estimator().covariance()[(0, 0)] < p0);
    }

    #[test]
    fn test_connection_loss() {
        let feed = connected_feed();
        let clock = ManualClock::new();
        let shutdown = Shutdown::new();
        let mut fl = FusionLoop::new(
            &Params::default(),
            FeatExt::default(),
            pose_est::Params::default(),
            feed.clone(),
            clock,
            shutdown.clone(),
        );

        assert!(fl.cycle().is_ok());

        feed.set_laser_connected(false);
        match fl.cycle() {
            Err(FusionError::ConnectionLost(d)) => assert_eq!(d, "laser"),
            r => panic!("Expected a connection loss, got {:?}", r),
        }
        assert!(shutdown.is_requested());

        // run exits straight away once shutdown is set
        assert!(fl.run().is_ok());
    }
}
