//! Hough transform accumulator over `(theta, rho)` line space

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Point2;

use super::line_fit::Line;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Largest accumulator that will be allocated.
pub(crate) const MAX_CELLS: usize = 4_000_000;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Vote accumulator.
///
/// Cell `(t, r)` represents the line `x cos(theta_t) + y sin(theta_t) = rho_r`
/// with `theta_t` in `[0, pi)` and signed `rho_r`.
pub(crate) struct Accumulator {
    num_theta: usize,
    num_rho: usize,
    rho_res_m: f64,
    rho_max_m: f64,

    /// Precomputed `(cos, sin)` of every theta bin.
    trig: Vec<(f64, f64)>,

    votes: Vec<u32>,
}

/// The strongest cell of the accumulator.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Peak {
    /// Votes in the cell plus its strongest rho neighbour.
    pub score: u32,

    pub line: Line,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Accumulator {
    /// Create an empty accumulator able to hold lines up to `rho_max_m` from
    /// the origin.
    ///
    /// Returns `None` if the resolutions are not positive and finite, or if
    /// the accumulator would exceed `MAX_CELLS`.
    pub fn new(theta_res_rad: f64, rho_res_m: f64, rho_max_m: f64) -> Option<Self> {
        let usable = |v: f64| v.is_finite() && v > 0.0;
        if !(usable(theta_res_rad) && usable(rho_res_m)) || !(rho_max_m.is_finite() && rho_max_m >= 0.0) {
            return None;
        }

        let theta_bins = (std::f64::consts::PI / theta_res_rad).round().max(1.0);
        let half_rho_bins = (rho_max_m / rho_res_m).ceil() + 1.0;
        if theta_bins * (2.0 * half_rho_bins + 1.0) > MAX_CELLS as f64 {
            return None;
        }

        let num_theta = theta_bins as usize;
        let half_rho = half_rho_bins as usize;
        let num_rho = 2 * half_rho + 1;

        let trig = (0..num_theta)
            .map(|t| {
                let theta = Self::theta_of(t, num_theta);
                (theta.cos(), theta.sin())
            })
            .collect();

        Some(Self {
            num_theta,
            num_rho,
            rho_res_m,
            rho_max_m: half_rho as f64 * rho_res_m,
            trig,
            votes: vec![0; num_theta * num_rho],
        })
    }

    /// Zero every cell.
    pub fn clear(&mut self) {
        for v in self.votes.iter_mut() {
            *v = 0;
        }
    }

    /// Add the votes of one point, one per theta bin.
    pub fn vote(&mut self, point: &Point2<f64>) {
        for t in 0..self.num_theta {
            let (c, s) = self.trig[t];
            let rho = point.x * c + point.y * s;

            if let Some(r) = self.rho_index(rho) {
                let i = self.index(t, r);
                self.votes[i] += 1;
            }
        }
    }

    /// Find the cell with the highest score, or `None` if no votes have been
    /// cast. Ties resolve to the first cell in `(theta, rho)` order.
    pub fn peak(&self) -> Option<Peak> {
        let mut best: Option<(u32, usize, usize)> = None;

        for t in 0..self.num_theta {
            for r in 0..self.num_rho {
                let v = self.votes[self.index(t, r)];
                if v == 0 {
                    continue;
                }

                let below = if r > 0 { self.votes[self.index(t, r - 1)] } else { 0 };
                let above = if r + 1 < self.num_rho { self.votes[self.index(t, r + 1)] } else { 0 };
                let score = v + below.max(above);

                if best.map_or(true, |(b, _, _)| score > b) {
                    best = Some((score, t, r));
                }
            }
        }

        best.map(|(score, t, r)| Peak {
            score,
            line: Line::from_signed(
                Self::theta_of(t, self.num_theta),
                r as f64 * self.rho_res_m - self.rho_max_m,
            ),
        })
    }

    fn theta_of(t: usize, num_theta: usize) -> f64 {
        (t % num_theta) as f64 * std::f64::consts::PI / num_theta as f64
    }

    fn rho_index(&self, rho: f64) -> Option<usize> {
        let r = ((rho + self.rho_max_m) / self.rho_res_m).round();
        if r >= 0.0 && (r as usize) < self.num_rho {
            Some(r as usize)
        }
        else {
            None
        }
    }

    fn index(&self, t: usize, r: usize) -> usize {
        (t % self.num_theta) * self.num_rho + r
    }
}
