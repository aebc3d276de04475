//! The motion control task, cycling MovCtrl against the feed and actuator

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    thread,
    time::{Duration, Instant},
};

use log::{error, info, warn};

use super::{InputData, MovCtrl, MovCtrlError};
use crate::shutdown::Shutdown;
use robot_if::{
    eqpt::{Actuator, VelCmd},
    feed::SensorFeed,
};
use util::{archive::Archived, module::State, time::Clock};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Runs MovCtrl at a fixed period.
pub struct MovCtrlTask<A: Actuator, C: Clock> {
    ctrl: MovCtrl,
    actuator: A,
    feed: SensorFeed,
    clock: C,
    shutdown: Shutdown,
    cycle_period: Duration,
    start: Instant,

    /// Set once a disconnect has been observed, after which only stop
    /// commands are sent.
    disconnected: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<A: Actuator, C: Clock> MovCtrlTask<A, C> {
    pub fn new(
        ctrl: MovCtrl,
        actuator: A,
        feed: SensorFeed,
        clock: C,
        shutdown: Shutdown,
        cycle_period: Duration,
    ) -> Self {
        let start = clock.now();
        Self {
            ctrl,
            actuator,
            feed,
            clock,
            shutdown,
            cycle_period,
            start,
            disconnected: false,
        }
    }

    pub fn ctrl(&self) -> &MovCtrl {
        &self.ctrl
    }

    /// Run one control cycle and send the resulting command.
    ///
    /// On a lost connection a stop is sent, shutdown is requested and
    /// `ConnectionLost` returned.
    pub fn cycle(&mut self) -> Result<VelCmd, MovCtrlError> {
        let lost = if !self.feed.robot_connected() {
            Some("robot")
        }
        else if !self.feed.laser_connected() {
            Some("laser")
        }
        else {
            None
        };

        if self.disconnected || lost.is_some() {
            let device = lost.unwrap_or("robot");
            if !self.disconnected {
                error!("MovCtrl: connection to the {} lost, stopping", device);
                self.disconnected = true;
            }
            self.send_stop();
            self.shutdown.request();
            return Err(MovCtrlError::ConnectionLost(device));
        }

        let now = self.clock.now();
        let max_age_s = self.ctrl.params().max_scan_age_s;

        let input = InputData {
            time_s: now.saturating_duration_since(self.start).as_secs_f64(),
            robot: self.feed.robot_state().map(|s| s.data),
            bump_events: self.feed.drain_bump_events(),
            scan: self
                .feed
                .latest_scan()
                .filter(|s| now.saturating_duration_since(s.stamp).as_secs_f64() <= max_age_s)
                .map(|s| s.data),
        };

        let (cmd, _) = self.ctrl.proc(&input)?;

        if let Err(e) = self.actuator.send_vel(&cmd) {
            error!("MovCtrl: could not send the velocity command: {}", e);
            self.disconnected = true;
            self.shutdown.request();
            return Err(MovCtrlError::ActuatorError(e));
        }

        if let Err(e) = self.ctrl.write() {
            warn!("MovCtrl: could not write archives: {}", e);
        }

        Ok(cmd)
    }

    /// Cycle until shutdown is requested or the connection is lost. A stop
    /// command is sent on the way out.
    pub fn run(&mut self) -> Result<(), MovCtrlError> {
        info!("MovCtrl task started");

        while !self.shutdown.is_requested() {
            let cycle_start = Instant::now();

            self.cycle()?;

            match self.cycle_period.checked_sub(cycle_start.elapsed()) {
                Some(d) => thread::sleep(d),
                None => warn!(
                    "MovCtrl cycle overran by {:.06} s",
                    (cycle_start.elapsed() - self.cycle_period).as_secs_f64()
                ),
            }
        }

        self.send_stop();
        info!("MovCtrl task stopped");

        Ok(())
    }

    fn send_stop(&mut self) {
        // A disconnected actuator is already stopped by its watchdog
        if let Err(e) = self.actuator.send_vel(&VelCmd::stop()) {
            warn!("MovCtrl: could not send stop command: {}", e);
        }
    }
}
