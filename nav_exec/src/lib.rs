//! # Navigation library.
//!
//! Pose estimation and reactive motion control for a differential drive
//! robot with a planar laser scanner, plus a simulated robot to run them
//! against.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Feature extraction - finds lines and corners in laser scans
pub mod feat_ext;

/// Fusion loop - propagates and updates the pose estimate at a fixed cadence
pub mod fusion;

/// Motion control - arbitrates between reactive behaviours to produce velocity commands
pub mod mov_ctrl;

/// Executable parameters
pub mod params;

/// Pose estimation - extended Kalman filter over the robot's planar pose
pub mod pose_est;

/// Shared shutdown flag
pub mod shutdown;

/// Simulated robot, laser and room
pub mod sim;

/// Pose telemetry sinks
pub mod tm_sink;
