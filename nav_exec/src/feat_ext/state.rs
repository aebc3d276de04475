//! Implementation of the FeatExt extractor

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{trace, warn};
use nalgebra::{Point2, Rotation2, Vector2};

// Internal
use super::{
    corner,
    hough::Accumulator,
    line_fit::{self, LineFit},
    Feature, FeatureKind, Features, LineGeom, Params,
};
use robot_if::eqpt::RangeScan;
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Feature extractor.
///
/// Holds only its parameters, so one extractor may be shared freely and every
/// extraction is independent of the previous ones.
#[derive(Debug, Clone, Default)]
pub struct FeatExt {
    params: Params,
}

/// A usable reading converted into the robot body frame.
#[derive(Debug, Clone, Copy)]
struct ScanPoint {
    index: usize,
    pos_m_rb: Point2<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FeatExt {
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Extract the features of one scan.
    ///
    /// Lines are returned first in the order they were extracted, followed
    /// by the corners between them. The sequence is empty for an empty or
    /// degenerate scan.
    pub fn extract(&self, scan: &RangeScan) -> Features {
        let points = self.to_points(scan);

        if points.len() < self.params.min_support.max(2) {
            trace!(
                "FeatExt: {} usable points, too few to extract features",
                points.len()
            );
            return Vec::new().into_iter();
        }

        let full_turn = scan.fov_rad() >= std::f64::consts::TAU - 0.5 * scan.increment_rad;

        let lines = self.extract_lines(scan, &points, full_turn);
        let corners = corner::find_corners(&lines, &self.params);

        trace!(
            "FeatExt: {} lines and {} corners from {} points",
            lines.len(),
            corners.len(),
            points.len()
        );

        let mut features = lines;
        features.extend(corners);
        features.into_iter()
    }

    /// Convert the usable readings to robot frame points, in scan order.
    fn to_points(&self, scan: &RangeScan) -> Vec<ScanPoint> {
        if !(scan.increment_rad.is_finite() && scan.increment_rad > 0.0) {
            return Vec::new();
        }

        let mount = Vector2::new(self.params.laser_pos_m_rb[0], self.params.laser_pos_m_rb[1]);
        let yaw = Rotation2::new(self.params.laser_yaw_rad_rb);

        scan.readings()
            .enumerate()
            .filter(|(_, (_, r))| {
                scan.is_return(*r)
                    && *r >= self.params.exclusion_radius_m
                    && *r <= self.params.max_feature_range_m
            })
            .map(|(index, (a, r))| ScanPoint {
                index,
                pos_m_rb: Point2::from(mount + yaw * Vector2::new(r * a.cos(), r * a.sin())),
            })
            .filter(|p| p.pos_m_rb.coords.iter().all(|c| c.is_finite()))
            .collect()
    }

    fn extract_lines(&self, scan: &RangeScan, points: &[ScanPoint], full_turn: bool) -> Vec<Feature> {
        let p = &self.params;

        // Every point lies within range of the laser, which may be offset
        let reach = p.max_feature_range_m
            + Vector2::new(p.laser_pos_m_rb[0], p.laser_pos_m_rb[1]).norm();
        let rho_max = points
            .iter()
            .map(|s| s.pos_m_rb.coords.norm())
            .fold(0.0, f64::max)
            .min(reach);

        let mut acc = match Accumulator::new(p.theta_res_rad, p.rho_res_m, rho_max) {
            Some(acc) => acc,
            None => {
                warn!(
                    "FeatExt: cannot build an accumulator with resolutions ({}, {}) over {} m",
                    p.theta_res_rad, p.rho_res_m, rho_max
                );
                return Vec::new();
            }
        };

        let mut assigned = vec![false; points.len()];
        let mut lines = Vec::new();
        let max_iters = 2 * p.max_lines + 2;

        for _ in 0..max_iters {
            if lines.len() >= p.max_lines {
                break;
            }

            acc.clear();
            for (s, _) in points.iter().zip(assigned.iter()).filter(|(_, a)| !**a) {
                acc.vote(&s.pos_m_rb);
            }

            let peak = match acc.peak() {
                Some(pk) if pk.score as usize >= p.min_support => pk,
                _ => break,
            };

            let members = self.members(points, &assigned, |q| peak.line.dist(q));
            let run = self.longest_run(points, &members, full_turn);

            // Consume the candidate's points whatever the outcome
            for &i in run.iter() {
                assigned[i] = true;
            }

            if run.len() < p.min_support {
                continue;
            }

            let (fit, run) = match self.refine(points, &assigned, &run, full_turn) {
                Some(f) => f,
                None => continue,
            };

            for &i in run.iter() {
                assigned[i] = true;
            }

            if run.len() >= p.min_support && fit.residual_m <= p.max_residual_m {
                lines.push(self.line_feature(scan, points, &fit, &run));
            }
            else {
                trace!(
                    "FeatExt: rejected line (support {}, residual {:.4} m)",
                    run.len(),
                    fit.residual_m
                );
            }
        }

        lines
    }

    /// Fit the run, re-collect members against the fitted line and fit again.
    ///
    /// Points already consumed by `run` remain eligible for the refit.
    fn refine(
        &self,
        points: &[ScanPoint],
        assigned: &[bool],
        run: &[usize],
        full_turn: bool,
    ) -> Option<(LineFit, Vec<usize>)> {
        let first = line_fit::fit(run.iter().map(|&i| &points[i].pos_m_rb))?;

        let mut eligible = assigned.to_vec();
        for &i in run {
            eligible[i] = false;
        }

        let members = self.members(points, &eligible, |q| first.line.dist(q));
        let run = self.longest_run(points, &members, full_turn);

        let fit = line_fit::fit(run.iter().map(|&i| &points[i].pos_m_rb))?;
        Some((fit, run))
    }

    /// Indices of the unassigned points within the member tolerance.
    fn members<F>(&self, points: &[ScanPoint], assigned: &[bool], dist: F) -> Vec<usize>
    where
        F: Fn(&Point2<f64>) -> f64,
    {
        (0..points.len())
            .filter(|&i| !assigned[i] && dist(&points[i].pos_m_rb) <= self.params.member_tol_m)
            .collect()
    }

    /// Split members into spatially contiguous runs and return the longest.
    ///
    /// For a full turn scan the last and first runs are one segment crossing
    /// the seam, so they are joined.
    fn longest_run(&self, points: &[ScanPoint], members: &[usize], full_turn: bool) -> Vec<usize> {
        let mut runs: Vec<Vec<usize>> = Vec::new();

        for &m in members {
            match runs.last_mut() {
                Some(run) if self.adjacent(points, run[run.len() - 1], m) => run.push(m),
                _ => runs.push(vec![m]),
            }
        }

        if full_turn && runs.len() > 1 {
            let last = runs[runs.len() - 1][runs[runs.len() - 1].len() - 1];
            let first = runs[0][0];
            if self.adjacent(points, last, first) {
                let mut tail = runs.pop().unwrap_or_default();
                tail.extend(runs[0].drain(..));
                runs[0] = tail;
            }
        }

        // Earliest run wins ties
        let mut best = Vec::new();
        for run in runs {
            if run.len() > best.len() {
                best = run;
            }
        }
        best
    }

    fn adjacent(&self, points: &[ScanPoint], a: usize, b: usize) -> bool {
        (points[a].pos_m_rb - points[b].pos_m_rb).norm() <= self.params.max_gap_m
    }

    fn line_feature(
        &self,
        scan: &RangeScan,
        points: &[ScanPoint],
        fit: &LineFit,
        run: &[usize],
    ) -> Feature {
        let first = &points[run[0]];
        let last = &points[run[run.len() - 1]];

        let start = fit.line.project(&first.pos_m_rb);
        let end = fit.line.project(&last.pos_m_rb);
        let mid = Point2::from((start.coords + end.coords) * 0.5);

        Feature {
            kind: FeatureKind::Line(LineGeom {
                range_m: fit.line.range_m,
                bearing_rad: wrap_pi(fit.line.normal_rad),
                start_index: first.index,
                end_index: last.index,
                start_angle_rad: scan.angle(first.index),
                end_angle_rad: scan.angle(last.index),
                endpoints_m_rb: [[start.x, start.y], [end.x, end.y]],
                residual_m: fit.residual_m,
            }),
            x_m: mid.x,
            y_m: mid.y,
            support: run.len(),
        }
    }
}
