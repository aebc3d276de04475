//! # Range feature extraction module
//!
//! Extracts geometric features (line segments and the corners where two of
//! them meet) from a single laser sweep, in the robot body frame.
//!
//! Lines are found with a Hough transform: every usable reading is converted
//! to a cartesian point and votes into a `(theta, rho)` accumulator, the
//! strongest cell is taken as a candidate line, its supporting points are
//! split into spatially contiguous runs and the longest run is refined by a
//! total least squares fit. Accepted or not, a candidate's points are removed
//! before the next vote so extraction always terminates.
//!
//! Extraction never fails. Readings which are unusable (no return, inside the
//! laser mount exclusion zone, not finite) are simply not used, so a bad scan
//! yields fewer or no features.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod corner;
mod feature;
mod hough;
mod line_fit;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use feature::*;
pub use params::Params;
pub use state::*;
