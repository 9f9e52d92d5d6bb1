//! Tile weight mask generation for overlapped accumulation.
//!
//! Each rendered tile is weighted by a separable triangle (tent) filter:
//! weight 1.0 at the tile center, falling linearly to 0.0 at 75% of the
//! half-extent per axis. The outer 25% border of every tile therefore
//! contributes nothing on its own; overlapping neighbor tiles cover it, so
//! every output pixel still ends up with positive total weight.

/// An axis-aligned sub-rectangle of a tile, in tile-local pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubRect {
    pub offset_x: usize,
    pub offset_y: usize,
    pub size_x: usize,
    pub size_y: usize,
}

impl SubRect {
    /// A rectangle covering a full tile of the given size.
    pub fn full(size_x: usize, size_y: usize) -> Self {
        Self {
            offset_x: 0,
            offset_y: 0,
            size_x,
            size_y,
        }
    }

    /// One past the rightmost column.
    pub fn right(&self) -> usize {
        self.offset_x + self.size_x
    }

    /// One past the bottom row.
    pub fn bottom(&self) -> usize {
        self.offset_y + self.size_y
    }

    /// Whether the given tile-local pixel lies inside the rectangle.
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.offset_x && x < self.right() && y >= self.offset_y && y < self.bottom()
    }
}

/// A cached triangle-filter weight mask for one tile size.
///
/// Generation is not cheap for large tiles, so the accumulator keeps the
/// last mask around and only regenerates when the observed tile size
/// changes.
#[derive(Clone, Debug)]
pub struct TileWeightMask {
    pub size_x: usize,
    pub size_y: usize,
    /// Row-major weights, `size_x * size_y` entries in [0, 1].
    pub weights: Vec<f32>,
    /// Conservative bounds of the non-zero weight region.
    pub sub_rect: SubRect,
}

impl TileWeightMask {
    /// Generate the weight mask and its bounding sub-rectangle for a tile.
    pub fn new(size_x: usize, size_y: usize) -> Self {
        assert!(
            size_x > 0 && size_y > 0,
            "tile weight mask requires non-zero dimensions, got {}x{}",
            size_x,
            size_y
        );

        let weights = generate_weights(size_x, size_y);
        let sub_rect = bounding_sub_rect(size_x, size_y);

        Self {
            size_x,
            size_y,
            weights,
            sub_rect,
        }
    }

    /// Whether this mask matches the given tile size.
    pub fn matches(&self, size_x: usize, size_y: usize) -> bool {
        self.size_x == size_x && self.size_y == size_y
    }
}

/// Support radius of the tent filter as a fraction of the half-extent.
const FILTER_SUPPORT: f32 = 0.75;

/// 1D tent filter sampled at pixel centers.
///
/// For a pixel at index `x` the distance from the tile center is
/// `|x + 0.5 - half|`; the weight falls from 1.0 at the center to 0.0 at
/// `FILTER_SUPPORT * half`.
fn triangle_weights_1d(size: usize) -> Vec<f32> {
    let half = size as f32 * 0.5;
    let scale = 1.0 / (FILTER_SUPPORT * half);

    (0..size)
        .map(|x| {
            let dist = (x as f32 + 0.5 - half).abs();
            (1.0 - dist * scale).clamp(0.0, 1.0)
        })
        .collect()
}

/// Generate a row-major `size_x * size_y` triangle-filter weight mask.
///
/// The filter is separable: the weight of pixel (x, y) is the product of
/// the 1D tent weights along each axis.
pub fn generate_weights(size_x: usize, size_y: usize) -> Vec<f32> {
    let wx = triangle_weights_1d(size_x);
    let wy = triangle_weights_1d(size_y);

    let mut weights = vec![0.0f32; size_x * size_y];
    for y in 0..size_y {
        let row = &mut weights[y * size_x..(y + 1) * size_x];
        for (x, out) in row.iter_mut().enumerate() {
            *out = wx[x] * wy[y];
        }
    }
    weights
}

/// Analytic bounds of the non-zero weight region, padded by one pixel.
///
/// The tent weight is non-zero only where the pixel center lies strictly
/// inside (0.125 * size, 0.875 * size) on each axis. The result is
/// conservative: it always contains every pixel with weight > 0, and may
/// include a one-pixel border of zero weights.
pub fn bounding_sub_rect(size_x: usize, size_y: usize) -> SubRect {
    let axis = |size: usize| -> (usize, usize) {
        let lo = ((size as f32 * (0.5 - FILTER_SUPPORT * 0.5)).floor() as isize - 1).max(0) as usize;
        let hi = ((size as f32 * (0.5 + FILTER_SUPPORT * 0.5)).ceil() as usize + 1).min(size);
        (lo, hi - lo)
    };

    let (offset_x, size_x) = axis(size_x);
    let (offset_y, size_y) = axis(size_y);
    SubRect {
        offset_x,
        offset_y,
        size_x,
        size_y,
    }
}

/// Brute-force verification that `rect` contains every non-zero weight.
///
/// Debug aid: scans the whole mask instead of trusting the analytic
/// formula. Returns false if any pixel with weight > 0 falls outside.
pub fn check_bounding_sub_rect(
    weights: &[f32],
    size_x: usize,
    size_y: usize,
    rect: &SubRect,
) -> bool {
    assert_eq!(
        weights.len(),
        size_x * size_y,
        "weight mask size mismatch: {} entries for {}x{}",
        weights.len(),
        size_x,
        size_y
    );

    for y in 0..size_y {
        for x in 0..size_x {
            if weights[y * size_x + x] > 0.0 && !rect.contains(x, y) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_weight_is_one_for_odd_sizes() {
        // Odd sizes have a pixel whose center sits exactly on the tile center.
        let w = generate_weights(5, 5);
        assert_eq!(w[2 * 5 + 2], 1.0);
    }

    #[test]
    fn test_weights_are_symmetric() {
        let size = 8;
        let w = generate_weights(size, size);
        for y in 0..size {
            for x in 0..size {
                let mirrored = w[(size - 1 - y) * size + (size - 1 - x)];
                assert_eq!(w[y * size + x], mirrored, "asymmetry at ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_border_weight_is_zero() {
        // The outer 12.5% of the tile is outside the filter support.
        let size = 32;
        let w = generate_weights(size, size);
        assert_eq!(w[0], 0.0);
        assert_eq!(w[size - 1], 0.0);
        assert_eq!(w[(size - 1) * size], 0.0);
    }

    #[test]
    fn test_single_pixel_tile() {
        let w = generate_weights(1, 1);
        assert_eq!(w, vec![1.0]);
        let rect = bounding_sub_rect(1, 1);
        assert!(check_bounding_sub_rect(&w, 1, 1, &rect));
    }
}
