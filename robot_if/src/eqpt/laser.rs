//! # Laser scanner equipment interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One completed sweep of the laser scanner.
///
/// Reading `i` was taken at `start_angle_rad + i * increment_rad` in the laser
/// frame, with zero along the laser's forward axis and angles increasing
/// counter clockwise. A reading equal to or greater than `max_range_m` means
/// "no return".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeScan {
    /// Angle of the first reading.
    ///
    /// Units: radians
    pub start_angle_rad: f64,

    /// Angular step between consecutive readings, positive.
    ///
    /// Units: radians
    pub increment_rad: f64,

    /// Maximum measurable range, also the "no return" sentinel.
    ///
    /// Units: meters
    pub max_range_m: f64,

    /// Distances, in sweep order.
    ///
    /// Units: meters
    pub ranges_m: Vec<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RangeScan {
    /// Number of readings in the sweep.
    pub fn len(&self) -> usize {
        self.ranges_m.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges_m.is_empty()
    }

    /// Angle of the reading at `index`.
    pub fn angle(&self, index: usize) -> f64 {
        self.start_angle_rad + index as f64 * self.increment_rad
    }

    /// Angular span covered by the sweep.
    ///
    /// Units: radians
    pub fn fov_rad(&self) -> f64 {
        self.ranges_m.len() as f64 * self.increment_rad
    }

    /// True if the reading is a usable return (finite, non-negative and below the sentinel).
    pub fn is_return(&self, range_m: f64) -> bool {
        range_m.is_finite() && range_m >= 0.0 && range_m < self.max_range_m
    }

    /// Iterate over `(angle_rad, range_m)` pairs in sweep order.
    pub fn readings(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.ranges_m
            .iter()
            .enumerate()
            .map(move |(i, r)| (self.angle(i), *r))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_readings() {
        let scan = RangeScan {
            start_angle_rad: -1.0,
            increment_rad: 0.5,
            max_range_m: 10.0,
            ranges_m: vec![1.0, 10.0, f64::NAN, 2.0],
        };

        let r: Vec<(f64, f64)> = scan.readings().collect();
        assert_eq!(r[0], (-1.0, 1.0));
        assert_eq!(r[3], (0.5, 2.0));

        assert!(scan.is_return(1.0));
        assert!(!scan.is_return(10.0));
        assert!(!scan.is_return(f64::NAN));
        assert!(!scan.is_return(-0.1));
        assert_eq!(scan.fov_rad(), 2.0);
    }
}
