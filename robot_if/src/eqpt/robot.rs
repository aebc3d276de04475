//! # Robot base equipment interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// State of the robot base as reported by the driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RobotState {
    /// Linear velocity of the body along its forward axis.
    ///
    /// Units: meters/second
    pub lin_vel_ms: f64,

    /// Angular velocity of the body about the vertical axis, positive counter clockwise.
    ///
    /// Units: radians/second
    pub ang_vel_rads: f64,

    /// Left wheel ground speed.
    ///
    /// Units: meters/second
    pub left_vel_ms: f64,

    /// Right wheel ground speed.
    ///
    /// Units: meters/second
    pub right_vel_ms: f64,

    /// Cumulative left encoder count since the driver started.
    pub left_enc_ticks: i64,

    /// Cumulative right encoder count since the driver started.
    pub right_enc_ticks: i64,

    /// True if the left wheel motor is stalled.
    pub left_stalled: bool,

    /// True if the right wheel motor is stalled.
    pub right_stalled: bool,

    /// Currently pressed bumpers.
    pub bumpers: Bumpers,
}

/// Bumper contact switches, true when pressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bumpers {
    pub front_left: bool,
    pub front_right: bool,
    pub rear_left: bool,
    pub rear_right: bool,
}

/// A discrete bump, queued by the driver at the moment a bumper closes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BumpEvent {
    /// The bumpers that were pressed when the event was raised.
    pub bumpers: Bumpers,

    /// Driver time of the event.
    ///
    /// Units: seconds
    pub time_s: f64,
}

/// A velocity demand for the robot base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VelCmd {
    /// Linear velocity demand, positive forwards.
    ///
    /// Units: meters/second
    pub lin_ms: f64,

    /// Angular velocity demand, positive counter clockwise.
    ///
    /// Units: radians/second
    pub ang_rads: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    #[error("The robot is not connected")]
    NotConnected,

    #[error("The robot rejected the command: {0}")]
    Rejected(String),
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Accepts velocity commands for the robot base.
///
/// The actuator keeps no memory of previous requests: the robot will stop
/// unless commands are sent continuously.
pub trait Actuator: Send {
    /// Send a velocity command.
    fn send_vel(&mut self, cmd: &VelCmd) -> Result<(), ActuatorError>;
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Bumpers {
    /// True if any front bumper is pressed.
    pub fn front(&self) -> bool {
        self.front_left || self.front_right
    }

    /// True if any rear bumper is pressed.
    pub fn rear(&self) -> bool {
        self.rear_left || self.rear_right
    }

    /// True if any bumper is pressed.
    pub fn any(&self) -> bool {
        self.front() || self.rear()
    }
}

impl RobotState {
    /// True if either wheel is stalled.
    pub fn stalled(&self) -> bool {
        self.left_stalled || self.right_stalled
    }
}

impl VelCmd {
    pub fn new(lin_ms: f64, ang_rads: f64) -> Self {
        Self { lin_ms, ang_rads }
    }

    /// The zero (stop) command.
    pub fn stop() -> Self {
        Self::default()
    }

    /// True if both components are zero.
    pub fn is_stop(&self) -> bool {
        self.lin_ms == 0.0 && self.ang_rads == 0.0
    }
}
