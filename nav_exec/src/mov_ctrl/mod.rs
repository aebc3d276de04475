//! # Motion control module
//!
//! A fixed priority arbiter over reactive behaviours which keeps the robot
//! moving forward and steers it away from obstacles. In priority order:
//!
//! 1. `StallRecover` - back out of and turn away from a stall,
//! 2. `Bumpers` - back away from (or push away from) a bumper hit,
//! 3. `AvoidNear` - stop and turn when an obstacle is close ahead,
//! 4. `AvoidFar` - slow down and turn when an obstacle is further ahead,
//! 5. `ConstantVelocity` - drive forward.
//!
//! Every behaviour is evaluated each cycle so that their timers and latches
//! stay consistent, and the first one which proposes a command wins. The
//! command is clamped to the robot's limits and sent every cycle, the robot's
//! watchdog stops it if commands stop arriving.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod behaviour;
mod params;
mod state;
mod task;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use behaviour::*;
pub use params::*;
pub use state::*;
pub use task::*;

use robot_if::eqpt::ActuatorError;
use util::{archive::ArchiveError, params::LoadError};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during MovCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum MovCtrlError {
    #[error("Cannot load the MovCtrl parameters: {0}")]
    ParamLoadError(LoadError),

    #[error("Cannot create the MovCtrl archives: {0}")]
    ArchiveError(ArchiveError),

    #[error("The connection to the {0} was lost")]
    ConnectionLost(&'static str),

    #[error("The actuator failed: {0}")]
    ActuatorError(ActuatorError),
}
