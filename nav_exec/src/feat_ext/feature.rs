//! Features produced by FeatExt

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A geometric feature extracted from one scan.
///
/// Positions are in the robot body frame at the time the scan was captured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Feature {
    /// The kind of feature and its kind specific geometry.
    pub kind: FeatureKind,

    /// Feature position. For a line this is the midpoint of the segment, for
    /// a corner the intersection of its two lines.
    ///
    /// Units: meters,
    /// Frame: Robot body
    pub x_m: f64,

    /// See `x_m`.
    pub y_m: f64,

    /// Number of range readings supporting the feature.
    pub support: usize,
}

/// Feature kinds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum FeatureKind {
    Line(LineGeom),
    Corner(CornerGeom),
}

/// Geometry of a line feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineGeom {
    /// Perpendicular distance from the robot origin to the supporting line,
    /// never negative.
    ///
    /// Units: meters
    pub range_m: f64,

    /// Angle of the line's normal, pointing from the robot towards the
    /// line, in `[-pi, pi)`.
    ///
    /// Units: radians
    pub bearing_rad: f64,

    /// Scan index of the first supporting reading.
    pub start_index: usize,

    /// Scan index of the last supporting reading.
    pub end_index: usize,

    /// Laser angle of the first supporting reading.
    ///
    /// Units: radians
    pub start_angle_rad: f64,

    /// Laser angle of the last supporting reading.
    ///
    /// Units: radians
    pub end_angle_rad: f64,

    /// Segment endpoints, the first and last supporting points projected
    /// onto the line.
    ///
    /// Units: meters,
    /// Frame: Robot body
    pub endpoints_m_rb: [[f64; 2]; 2],

    /// RMS perpendicular residual of the fit.
    ///
    /// Units: meters
    pub residual_m: f64,
}

/// Geometry of a corner feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CornerGeom {
    /// Angle between the two lines, in `(0, pi/2]`.
    ///
    /// Units: radians
    pub angle_rad: f64,

    /// Positions of the two lines in the extracted feature sequence.
    pub line_indices: [usize; 2],
}

/// The feature sequence returned by a single extraction. It is consumed once,
/// a new extraction is required for every scan.
pub type Features = std::vec::IntoIter<Feature>;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Feature {
    pub fn is_line(&self) -> bool {
        matches!(self.kind, FeatureKind::Line(_))
    }

    pub fn is_corner(&self) -> bool {
        matches!(self.kind, FeatureKind::Corner(_))
    }

    /// The line geometry, if this is a line.
    pub fn line(&self) -> Option<&LineGeom> {
        match self.kind {
            FeatureKind::Line(ref l) => Some(l),
            _ => None,
        }
    }
}
