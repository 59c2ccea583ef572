//! Poisson-disk (blue noise) point sampling.
//!
//! Bridson's algorithm: a background grid with cell size
//! `min_distance / √2` holds at most one point per cell and answers
//! "is anything too close?" by looking only at nearby cells. Growth is
//! driven by an active list; each active point proposes up to
//! [`MAX_ATTEMPTS`] candidates in the annulus
//! `[min_distance, 2 * min_distance)` around itself and is retired once
//! none of them fit.
//!
//! The random source is passed in so callers can seed it.

use std::f64::consts::{SQRT_2, TAU};

use rand::Rng;

use crate::types::Point;

/// Candidates tried around an active point before it is retired.
pub const MAX_ATTEMPTS: usize = 30;

/// Generate points in `[0, width) × [0, height)` with no two points
/// closer than `min_distance`.
///
/// Returns an empty set when the area is empty or `min_distance` is
/// not a positive finite number.
#[must_use = "returns the sampled points"]
pub fn poisson_disk<R: Rng + ?Sized>(
    width: f64,
    height: f64,
    min_distance: f64,
    rng: &mut R,
) -> Vec<Point> {
    if !(width > 0.0 && height > 0.0 && min_distance > 0.0)
        || !width.is_finite()
        || !height.is_finite()
        || !min_distance.is_finite()
    {
        return Vec::new();
    }

    let mut grid = BackgroundGrid::new(width, height, min_distance);
    let first = Point::new(rng.random::<f64>() * width, rng.random::<f64>() * height);
    let mut points = vec![first];
    let mut active = vec![0];
    grid.insert(first, 0);

    while !active.is_empty() {
        let slot = rng.random_range(0..active.len());
        let origin = points[active[slot]];

        let mut found = false;
        for _ in 0..MAX_ATTEMPTS {
            let angle = rng.random::<f64>() * TAU;
            let distance = rng.random::<f64>().mul_add(min_distance, min_distance);
            let candidate = Point::new(
                angle.cos().mul_add(distance, origin.x),
                angle.sin().mul_add(distance, origin.y),
            );

            let in_bounds = candidate.x >= 0.0
                && candidate.x < width
                && candidate.y >= 0.0
                && candidate.y < height;
            if in_bounds && grid.is_free(candidate, &points) {
                grid.insert(candidate, points.len());
                active.push(points.len());
                points.push(candidate);
                found = true;
                break;
            }
        }

        if !found {
            active.swap_remove(slot);
        }
    }

    log::debug!(
        "poisson disk: {} points in {width}x{height} (min distance {min_distance})",
        points.len(),
    );
    points
}

/// Uniform acceleration grid, one optional point index per cell.
struct BackgroundGrid {
    cell_size: f64,
    min_distance_squared: f64,
    cols: usize,
    rows: usize,
    cells: Vec<Option<usize>>,
}

impl BackgroundGrid {
    /// Cells two away from a candidate's cell can still hold a point
    /// within `min_distance` (`min_distance / cell_size = √2`).
    const REACH: usize = 2;

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn new(width: f64, height: f64, min_distance: f64) -> Self {
        let cell_size = min_distance / SQRT_2;
        let cols = ((width / cell_size).ceil() as usize).max(1);
        let rows = ((height / cell_size).ceil() as usize).max(1);
        Self {
            cell_size,
            min_distance_squared: min_distance * min_distance,
            cols,
            rows,
            cells: vec![None; cols * rows],
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn cell_of(&self, p: Point) -> (usize, usize) {
        let col = ((p.x / self.cell_size).floor() as usize).min(self.cols - 1);
        let row = ((p.y / self.cell_size).floor() as usize).min(self.rows - 1);
        (col, row)
    }

    fn insert(&mut self, p: Point, index: usize) {
        let (col, row) = self.cell_of(p);
        self.cells[row * self.cols + col] = Some(index);
    }

    /// No stored point lies closer than `min_distance` to `p`.
    fn is_free(&self, p: Point, points: &[Point]) -> bool {
        let (col, row) = self.cell_of(p);
        let rows = row.saturating_sub(Self::REACH)..=(row + Self::REACH).min(self.rows - 1);
        for r in rows {
            let cols = col.saturating_sub(Self::REACH)..=(col + Self::REACH).min(self.cols - 1);
            for c in cols {
                if let Some(index) = self.cells[r * self.cols + c]
                    && p.distance_squared(points[index]) < self.min_distance_squared
                {
                    return false;
                }
            }
        }
        true
    }
}
