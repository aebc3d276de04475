//! Association of observed features with known landmarks

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Matrix2;

use super::{landmarks_from_params, Landmark, Measurement, Observation, Params, PoseEst};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The fixed set of landmarks expected in the operating area.
#[derive(Debug, Clone, Default)]
pub struct Landmarks {
    landmarks: Vec<Landmark>,
}

/// Outcome of associating one observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Assoc {
    /// Exactly one landmark lies inside the gate.
    Unique(Measurement),

    /// No landmark lies inside the gate.
    NoMatch,

    /// This many landmarks lie inside the gate.
    Ambiguous(usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Landmarks {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    pub fn from_params(params: &Params) -> Self {
        Self::new(landmarks_from_params(&params.landmark_lines, &params.landmark_points))
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// Gate `obs` against every landmark of the same kind.
    ///
    /// `r` is the measurement noise the update would use and `gate_chi2` the
    /// squared Mahalanobis distance bound.
    pub fn associate(&self, est: &PoseEst, obs: &Observation, r: &Matrix2<f64>, gate_chi2: f64) -> Assoc {
        let mut found: Option<Measurement> = None;
        let mut count = 0;

        for lm in self.landmarks.iter().filter(|lm| lm.matches_kind(obs)) {
            let meas = Measurement {
                obs: *obs,
                landmark: *lm,
            };

            match est.mahalanobis_sq(&meas, r) {
                Some(d2) if d2 <= gate_chi2 => {
                    count += 1;
                    found = Some(meas);
                }
                _ => (),
            }
        }

        match (count, found) {
            (1, Some(m)) => Assoc::Unique(m),
            (0, _) => Assoc::NoMatch,
            (n, _) => Assoc::Ambiguous(n),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pose_est::{diag2, WorldLine};

    #[test]
    fn test_unique_match() {
        let est = PoseEst::new(Params::default());
        let lms = Landmarks::from_params(&Params::default());
        let r = diag2([0.000625, 0.000625]);

        // The x = 5 wall seen from the origin
        let obs = Observation::Line { range_m: 5.02, bearing_rad: 0.01 };
        match lms.associate(&est, &obs, &r, 9.21) {
            Assoc::Unique(m) => assert_eq!(m.landmark, Landmark::Line(WorldLine::new(5.0, 0.0))),
            a => panic!("Expected a unique match, got {:?}", a),
        }

        // Corner at (-1, 2)
        let obs = Observation::Point { x_m: -1.01, y_m: 2.0 };
        match lms.associate(&est, &obs, &r, 9.21) {
            Assoc::Unique(m) => assert_eq!(m.landmark, Landmark::Point([-1.0, 2.0])),
            a => panic!("Expected a unique match, got {:?}", a),
        }
    }

    #[test]
    fn test_no_match() {
        let est = PoseEst::new(Params::default());
        let lms = Landmarks::from_params(&Params::default());
        let r = diag2([0.000625, 0.000625]);

        let obs = Observation::Line { range_m: 3.5, bearing_rad: 0.8 };
        assert_eq!(lms.associate(&est, &obs, &r, 9.21), Assoc::NoMatch);
        assert_eq!(Landmarks::default().associate(&est, &obs, &r, 9.21), Assoc::NoMatch);
    }

    #[test]
    fn test_ambiguous_skipped() {
        // Two parallel walls 5 cm apart, both inside the gate
        let lms = Landmarks::new(vec![
            Landmark::Line(WorldLine::new(2.0, 0.0)),
            Landmark::Line(WorldLine::new(2.05, 0.0)),
        ]);
        let est = PoseEst::new(Params::default());
        let r = diag2([0.000625, 0.000625]);

        let obs = Observation::Line { range_m: 2.02, bearing_rad: 0.0 };
        assert_eq!(lms.associate(&est, &obs, &r, 9.21), Assoc::Ambiguous(2));
    }
}
