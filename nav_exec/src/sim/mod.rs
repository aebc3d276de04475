//! # Simulated robot driver
//!
//! Stands in for the robot and laser drivers so the executable can run
//! without hardware. A background thread integrates differential drive
//! kinematics inside a world of wall segments and publishes into a
//! `SensorFeed` exactly as a hardware driver would:
//!
//! - robot state (velocities, encoders, stall flags and bumpers) every step,
//! - a ray cast laser scan every scan period,
//! - bump events when a bumper closes,
//! - the true pose of the robot, for comparison with the estimate.
//!
//! Commands are accepted through `SimActuator`. A command older than the
//! watchdog timeout is replaced by a stop, so the robot halts if its
//! controller stops sending.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod driver;
mod params;
mod world;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use driver::*;
pub use params::*;
pub use world::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur in the simulated driver.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("Invalid simulation parameters: {0}")]
    InvalidParams(String),

    #[error("The simulation thread panicked")]
    ThreadPanicked,
}
