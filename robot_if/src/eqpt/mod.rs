//! # Equipment interfaces

pub mod laser;
pub mod robot;

pub use laser::*;
pub use robot::*;
