//! # Robot Interface Library
//!
//! Defines the boundary between the robot driver layer (robot base, laser
//! scanner, simulator) and the navigation core: the data each side exchanges,
//! the synchronised feed through which sensor data is published, and the
//! traits through which commands and telemetry leave the core.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Equipment interfaces - robot base and laser scanner
pub mod eqpt;

/// Synchronised latest-value sensor feed shared between the driver and the core
pub mod feed;

/// Planar pose type shared by telemetry and ground truth
pub mod pose;

/// Telemetry - pose output from the core
pub mod tm;
