//! # Fusion loop
//!
//! Drives the pose estimator at a fixed cadence. Each cycle measures the
//! elapsed time, propagates with the odometry read from the feed, extracts
//! features from any scan not yet processed, associates them with the known
//! landmarks, applies an update per unique association and publishes the
//! resulting pose to the telemetry sinks.
//!
//! The loop performs no actuation.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod odom;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use odom::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FusionError {
    #[error("The connection to the {0} was lost")]
    ConnectionLost(&'static str),
}
