//! Full-resolution accumulation planes and the bilinear tile splat.
//!
//! A plane is one dense row-major channel of the output image. Tiles are
//! scattered into it with a 2x2 bilinear splat driven by the tile's
//! subpixel offset, so a tile rendered halfway between destination pixel
//! centers spreads each source pixel over its four neighbors.
//!
//! The splat is a mutating `+=` with no internal synchronization; callers
//! must serialize all accumulation into one plane (see the pool module).

use crate::weights::SubRect;

/// One dense 2D scalar channel, `size_x * size_y` floats, row-major.
#[derive(Clone, Debug, Default)]
pub struct AccumulationPlane {
    pub size_x: usize,
    pub size_y: usize,
    data: Vec<f32>,
}

impl AccumulationPlane {
    /// Allocate a plane. Contents are unspecified until [`Self::zero`] runs;
    /// accumulation before zeroing operates on stale values.
    pub fn init(size_x: usize, size_y: usize) -> Self {
        Self {
            size_x,
            size_y,
            data: vec![0.0; size_x * size_y],
        }
    }

    /// Clear every value to 0.0. Must run once per output frame before the
    /// first tile is accumulated.
    pub fn zero(&mut self) {
        self.data.fill(0.0);
    }

    /// Free the backing storage and drop to a zero-area plane.
    pub fn reset(&mut self) {
        self.size_x = 0;
        self.size_y = 0;
        self.data = Vec::new();
    }

    /// Value at (x, y). Panics if out of bounds.
    pub fn value(&self, x: usize, y: usize) -> f32 {
        debug_assert!(x < self.size_x && y < self.size_y);
        self.data[y * self.size_x + x]
    }

    /// Raw row-major access to the plane data.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Scatter-add one weighted tile into the plane.
    ///
    /// Each source pixel contributes `value * mask_weight`, split over up to
    /// four destination pixels by the bilinear factors derived from the
    /// fractional subpixel offset. A subpixel offset of exactly (0.5, 0.5)
    /// aligns source pixels to destination pixel centers (single
    /// destination, bilinear factor 1). Destination pixels outside the
    /// plane are silently skipped.
    ///
    /// Only source pixels inside `sub_rect` are visited; pixels with a zero
    /// mask weight are skipped. Because everything outside the mask's
    /// bounding sub-rectangle has zero weight, restricting the loop to the
    /// sub-rectangle is bit-for-bit identical to walking the full tile.
    /// The inner loop is deliberately scalar: a SIMD lane sum would change
    /// float association order and break that equivalence.
    #[allow(clippy::too_many_arguments)]
    pub fn accumulate_tile(
        &mut self,
        values: &[f32],
        mask_weights: &[f32],
        tile_size_x: usize,
        tile_size_y: usize,
        tile_offset_x: i32,
        tile_offset_y: i32,
        subpixel_x: f32,
        subpixel_y: f32,
        sub_rect: &SubRect,
    ) {
        assert_eq!(
            values.len(),
            tile_size_x * tile_size_y,
            "tile value buffer is {} entries, expected {}x{}",
            values.len(),
            tile_size_x,
            tile_size_y
        );
        assert_eq!(
            mask_weights.len(),
            tile_size_x * tile_size_y,
            "tile weight mask is {} entries, expected {}x{}",
            mask_weights.len(),
            tile_size_x,
            tile_size_y
        );
        debug_assert!(
            (0.0..=1.0).contains(&subpixel_x) && (0.0..=1.0).contains(&subpixel_y),
            "subpixel offset ({}, {}) outside [0, 1]",
            subpixel_x,
            subpixel_y
        );
        debug_assert!(sub_rect.right() <= tile_size_x && sub_rect.bottom() <= tile_size_y);

        // Fractional part of the destination position; (0.5, 0.5) maps to 0.
        let fx = (subpixel_x + 0.5).fract();
        let fy = (subpixel_y + 0.5).fract();

        // Bilinear factors for the 2x2 destination footprint.
        let w00 = (1.0 - fx) * (1.0 - fy);
        let w10 = fx * (1.0 - fy);
        let w01 = (1.0 - fx) * fy;
        let w11 = fx * fy;

        // The first destination pixel starts one to the left/top when the
        // subpixel offset is below a pixel center.
        let base_x = tile_offset_x + if subpixel_x < 0.5 { -1 } else { 0 };
        let base_y = tile_offset_y + if subpixel_y < 0.5 { -1 } else { 0 };

        let plane_x = self.size_x as i32;
        let plane_y = self.size_y as i32;

        for ty in sub_rect.offset_y..sub_rect.bottom() {
            let src_row = ty * tile_size_x;
            let dy = base_y + ty as i32;

            for tx in sub_rect.offset_x..sub_rect.right() {
                let mask = mask_weights[src_row + tx];
                if mask == 0.0 {
                    continue;
                }
                let v = values[src_row + tx] * mask;
                let dx = base_x + tx as i32;

                let x0_in = dx >= 0 && dx < plane_x;
                let x1_in = dx + 1 >= 0 && dx + 1 < plane_x;
                let y0_in = dy >= 0 && dy < plane_y;
                let y1_in = dy + 1 >= 0 && dy + 1 < plane_y;

                if y0_in {
                    let row = dy as usize * self.size_x;
                    if x0_in {
                        self.data[row + dx as usize] += v * w00;
                    }
                    if x1_in {
                        self.data[row + (dx + 1) as usize] += v * w10;
                    }
                }
                if y1_in {
                    let row = (dy + 1) as usize * self.size_x;
                    if x0_in {
                        self.data[row + dx as usize] += v * w01;
                    }
                    if x1_in {
                        self.data[row + (dx + 1) as usize] += v * w11;
                    }
                }
            }
        }
    }
}
