//! Sobel gradient-magnitude edge map.
//!
//! Used only by the contour pattern. The magnitude is not normalized:
//! a hard black/white step reaches `4 * 255 = 1020` along one axis, so
//! values well above 255 are normal.

use crate::types::LuminanceBuffer;

/// Horizontal Sobel kernel, row-major.
pub const SOBEL_X: [i32; 9] = [-1, 0, 1, -2, 0, 2, -1, 0, 1];

/// Vertical Sobel kernel, row-major.
pub const SOBEL_Y: [i32; 9] = [-1, -2, -1, 0, 0, 0, 1, 2, 1];

/// Gradient magnitude per cell, same dimensions as the source buffer.
///
/// The one-cell border is always zero.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeMap {
    width: u32,
    height: u32,
    magnitudes: Vec<f64>,
}

impl EdgeMap {
    /// Map width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Map height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Magnitude at cell `(x, y)`, or `None` when out of bounds.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<f64> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.magnitudes
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Row-major magnitudes.
    #[must_use]
    pub fn magnitudes(&self) -> &[f64] {
        &self.magnitudes
    }

    /// Largest magnitude in the map (0 for an empty map).
    #[must_use]
    pub fn max_magnitude(&self) -> f64 {
        self.magnitudes.iter().copied().fold(0.0, f64::max)
    }
}

/// Compute the Sobel gradient magnitude `sqrt(gx² + gy²)` of every
/// interior cell of `buffer`.
#[must_use = "returns the edge map"]
pub fn sobel(buffer: &LuminanceBuffer) -> EdgeMap {
    let width = buffer.width();
    let height = buffer.height();
    let w = width as usize;
    let samples = buffer.samples();
    let mut magnitudes = vec![0.0; samples.len()];

    for y in 1..height.saturating_sub(1) as usize {
        for x in 1..width.saturating_sub(1) as usize {
            let mut gx = 0;
            let mut gy = 0;
            for ky in 0..3 {
                for kx in 0..3 {
                    let value = i32::from(samples[(y + ky - 1) * w + (x + kx - 1)]);
                    gx += value * SOBEL_X[ky * 3 + kx];
                    gy += value * SOBEL_Y[ky * 3 + kx];
                }
            }
            magnitudes[y * w + x] = f64::from(gx * gx + gy * gy).sqrt();
        }
    }

    EdgeMap {
        width,
        height,
        magnitudes,
    }
}
