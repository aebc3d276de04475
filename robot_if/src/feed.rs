//! # Sensor feed
//!
//! The driver layer publishes decoded sensor data into a `SensorFeed`, and the
//! core's cyclic tasks read it at their own cadence. Every reader gets the most
//! recent snapshot immediately, it never waits for new data.
//!
//! Ordering:
//! - Robot state, laser scans and the true pose are single-slot, last write wins.
//! - Bump events are FIFO, bounded at `BUMP_QUEUE_CAPACITY` (oldest dropped).
//!
//! On a laser disconnect the last scan is retained, consumers detect staleness
//! from the publish stamp.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Instant,
};

use log::warn;

use crate::{
    eqpt::{BumpEvent, RangeScan, RobotState},
    pose::Pose2D,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maximum number of bump events held before the oldest are discarded.
pub const BUMP_QUEUE_CAPACITY: usize = 32;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A published value with its sequence number and publish instant.
#[derive(Debug, Clone)]
pub struct Stamped<T> {
    pub data: T,

    /// Incremented on every publish of this slot, starting at 1.
    pub seq: u64,

    /// Instant at which the value was published.
    pub stamp: Instant,
}

/// Handle to the shared sensor state. Clones refer to the same feed.
#[derive(Clone, Default)]
pub struct SensorFeed {
    inner: Arc<FeedInner>,
}

#[derive(Default)]
struct FeedInner {
    robot_state: Mutex<Option<Stamped<RobotState>>>,
    scan: Mutex<Option<Stamped<Arc<RangeScan>>>>,
    true_pose: Mutex<Option<Pose2D>>,
    bump_events: Mutex<VecDeque<BumpEvent>>,
    robot_connected: AtomicBool,
    laser_connected: AtomicBool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SensorFeed {
    /// Create a new empty feed. Both the robot and laser start disconnected.
    pub fn new() -> Self {
        Self::default()
    }

    // ---- DRIVER SIDE ----

    pub fn publish_robot_state(&self, state: RobotState) {
        self.publish_robot_state_at(state, Instant::now())
    }

    pub fn publish_robot_state_at(&self, state: RobotState, stamp: Instant) {
        let mut slot = self.inner.robot_state.lock().expect("Feed mutex poisoned");
        let seq = slot.as_ref().map(|s| s.seq + 1).unwrap_or(1);
        *slot = Some(Stamped { data: state, seq, stamp });
    }

    pub fn publish_scan(&self, scan: RangeScan) {
        self.publish_scan_at(scan, Instant::now())
    }

    pub fn publish_scan_at(&self, scan: RangeScan, stamp: Instant) {
        let mut slot = self.inner.scan.lock().expect("Feed mutex poisoned");
        let seq = slot.as_ref().map(|s| s.seq + 1).unwrap_or(1);
        *slot = Some(Stamped { data: Arc::new(scan), seq, stamp });
    }

    pub fn publish_true_pose(&self, pose: Pose2D) {
        *self.inner.true_pose.lock().expect("Feed mutex poisoned") = Some(pose);
    }

    /// Queue a bump event, discarding the oldest event if the queue is full.
    pub fn push_bump_event(&self, event: BumpEvent) {
        let mut queue = self.inner.bump_events.lock().expect("Feed mutex poisoned");
        if queue.len() >= BUMP_QUEUE_CAPACITY {
            warn!("Bump event queue full, dropping oldest event");
            queue.pop_front();
        }
        queue.push_back(event);
    }

    pub fn set_robot_connected(&self, connected: bool) {
        self.inner.robot_connected.store(connected, Ordering::SeqCst);
    }

    pub fn set_laser_connected(&self, connected: bool) {
        self.inner.laser_connected.store(connected, Ordering::SeqCst);
    }

    // ---- CORE SIDE ----

    /// Latest robot state, or `None` if nothing has been published yet.
    pub fn robot_state(&self) -> Option<Stamped<RobotState>> {
        self.inner.robot_state.lock().expect("Feed mutex poisoned").clone()
    }

    /// Latest completed scan, which may be stale if the laser has disconnected.
    pub fn latest_scan(&self) -> Option<Stamped<Arc<RangeScan>>> {
        self.inner.scan.lock().expect("Feed mutex poisoned").clone()
    }

    pub fn true_pose(&self) -> Option<Pose2D> {
        *self.inner.true_pose.lock().expect("Feed mutex poisoned")
    }

    /// Remove and return all queued bump events, oldest first.
    pub fn drain_bump_events(&self) -> Vec<BumpEvent> {
        self.inner
            .bump_events
            .lock()
            .expect("Feed mutex poisoned")
            .drain(..)
            .collect()
    }

    pub fn robot_connected(&self) -> bool {
        self.inner.robot_connected.load(Ordering::SeqCst)
    }

    pub fn laser_connected(&self) -> bool {
        self.inner.laser_connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::eqpt::Bumpers;

    #[test]
    fn test_last_write_wins() {
        let feed = SensorFeed::new();
        assert!(feed.robot_state().is_none());

        feed.publish_robot_state(RobotState { lin_vel_ms: 1.0, ..Default::default() });
        feed.publish_robot_state(RobotState { lin_vel_ms: 2.0, ..Default::default() });

        let s = feed.robot_state().unwrap();
        assert_eq!(s.data.lin_vel_ms, 2.0);
        assert_eq!(s.seq, 2);
    }

    #[test]
    fn test_scan_retained_on_disconnect() {
        let feed = SensorFeed::new();
        let reader = feed.clone();

        feed.set_laser_connected(true);
        feed.publish_scan(RangeScan {
            start_angle_rad: 0.0,
            increment_rad: 0.1,
            max_range_m: 5.0,
            ranges_m: vec![1.0; 3],
        });
        feed.set_laser_connected(false);

        assert!(!reader.laser_connected());
        assert_eq!(reader.latest_scan().unwrap().data.len(), 3);
    }

    #[test]
    fn test_bump_events_fifo_bounded() {
        let feed = SensorFeed::new();

        for i in 0..(BUMP_QUEUE_CAPACITY + 3) {
            feed.push_bump_event(BumpEvent {
                bumpers: Bumpers { front_left: true, ..Default::default() },
                time_s: i as f64,
            });
        }

        let events = feed.drain_bump_events();
        assert_eq!(events.len(), BUMP_QUEUE_CAPACITY);
        assert_eq!(events[0].time_s, 3.0);
        assert!(events.windows(2).all(|w| w[0].time_s < w[1].time_s));
        assert!(feed.drain_bump_events().is_empty());
    }
}
