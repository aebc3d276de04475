//! # Pose estimation module
//!
//! An extended Kalman filter over the planar pose `(x, y, phi)` of the robot
//! in the world frame. Odometry drives propagation, features extracted from
//! laser scans drive updates once they have been associated with one of the
//! known landmarks of the operating area.
//!
//! The covariance is kept symmetric positive semi-definite: updates use the
//! Joseph form, propagation is bounded by a `dt` clamp and a per-axis
//! variance ceiling, and a covariance which still becomes invalid is reset to
//! a configured safe bound.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod assoc;
mod meas;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use assoc::*;
pub use meas::*;
pub use params::Params;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which reject an update. The estimate is unchanged when one is
/// returned.
#[derive(Debug, thiserror::Error)]
pub enum PoseEstError {
    #[error("Measurement noise covariance must be finite and symmetric with a positive diagonal, got {0:?}")]
    InvalidMeasNoise([[f64; 2]; 2]),

    #[error("The measurement is not finite")]
    NonFiniteMeasurement,

    #[error("The innovation covariance is singular")]
    SingularInnovation,

    #[error("The state correction is not finite")]
    NonFiniteCorrection,
}
