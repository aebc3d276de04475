//! Simulated world geometry

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Point2, Vector2};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Cross products smaller than this are treated as parallel.
const PARALLEL_EPS: f64 = 1e-12;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A straight wall between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wall {
    pub start_m: Point2<f64>,
    pub end_m: Point2<f64>,
}

/// A set of walls.
#[derive(Debug, Clone, Default)]
pub struct World {
    pub walls: Vec<Wall>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Wall {
    pub fn new(start_m: [f64; 2], end_m: [f64; 2]) -> Self {
        Self {
            start_m: Point2::new(start_m[0], start_m[1]),
            end_m: Point2::new(end_m[0], end_m[1]),
        }
    }

    /// Vector from the start to the end of the wall.
    fn span(&self) -> Vector2<f64> {
        self.end_m - self.start_m
    }

    /// Distance along a ray to this wall, if the ray hits it.
    pub fn ray_hit(&self, origin: &Point2<f64>, dir: &Vector2<f64>) -> Option<f64> {
        let e = self.span();
        let denom = dir.perp(&e);
        if denom.abs() < PARALLEL_EPS {
            return None;
        }

        let w = self.start_m - origin;
        let t = w.perp(&e) / denom;
        let u = w.perp(dir) / denom;

        if t >= 0.0 && (0.0..=1.0).contains(&u) {
            Some(t)
        }
        else {
            None
        }
    }

    /// Closest point of the wall to `p`.
    pub fn closest_point(&self, p: &Point2<f64>) -> Point2<f64> {
        let e = self.span();
        let len_sq = e.norm_squared();
        if len_sq == 0.0 {
            return self.start_m;
        }

        let u = ((p - self.start_m).dot(&e) / len_sq).max(0.0).min(1.0);
        self.start_m + e * u
    }
}

impl World {
    pub fn new(walls: Vec<Wall>) -> Self {
        Self { walls }
    }

    /// Build a world from `[x_start, y_start, x_end, y_end]` quadruples.
    pub fn from_segments(segments: &[[f64; 4]]) -> Self {
        Self::new(
            segments
                .iter()
                .map(|s| Wall::new([s[0], s[1]], [s[2], s[3]]))
                .collect(),
        )
    }

    /// Distance to the nearest wall along the ray from `origin` at world
    /// angle `angle_rad`, or `None` if nothing is hit within `max_range_m`.
    pub fn ray_cast(&self, origin: &Point2<f64>, angle_rad: f64, max_range_m: f64) -> Option<f64> {
        let dir = Vector2::new(angle_rad.cos(), angle_rad.sin());

        self.walls
            .iter()
            .filter_map(|w| w.ray_hit(origin, &dir))
            .filter(|t| *t < max_range_m)
            .fold(None, |best: Option<f64>, t| match best {
                Some(b) if b <= t => Some(b),
                _ => Some(t),
            })
    }

    /// The point on any wall closest to `p`, with its distance.
    pub fn nearest(&self, p: &Point2<f64>) -> Option<(Point2<f64>, f64)> {
        self.walls
            .iter()
            .map(|w| {
                let c = w.closest_point(p);
                (c, (c - p).norm())
            })
            .fold(None, |best, cur| match best {
                Some((_, d)) if d <= cur.1 => best,
                _ => Some(cur),
            })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    fn room() -> World {
        World::from_segments(&[
            [5.0, -2.0, 5.0, 2.0],
            [5.0, 2.0, -1.0, 2.0],
            [-1.0, 2.0, -1.0, -2.0],
            [-1.0, -2.0, 5.0, -2.0],
        ])
    }

    #[test]
    fn test_ray_cast() {
        let w = room();
        let o = Point2::origin();

        assert!((w.ray_cast(&o, 0.0, 8.0).unwrap() - 5.0).abs() < 1e-12);
        assert!((w.ray_cast(&o, PI, 8.0).unwrap() - 1.0).abs() < 1e-12);
        assert!((w.ray_cast(&o, PI / 2.0, 8.0).unwrap() - 2.0).abs() < 1e-12);

        // Diagonal into the corner at (5, 2)
        let a = (2.0f64).atan2(4.0);
        let r = w.ray_cast(&o, a, 8.0).unwrap();
        assert!((r - (4.0f64.powi(2) + 2.0f64.powi(2)).sqrt()).abs() < 1e-9);

        // Out of range
        assert!(w.ray_cast(&o, 0.0, 4.0).is_none());
        assert!(World::default().ray_cast(&o, 0.0, 8.0).is_none());
    }

    #[test]
    fn test_nearest() {
        let w = room();
        let (p, d) = w.nearest(&Point2::new(4.5, 0.3)).unwrap();
        assert!((d - 0.5).abs() < 1e-12);
        assert!((p.x - 5.0).abs() < 1e-12 && (p.y - 0.3).abs() < 1e-12);
    }
}
