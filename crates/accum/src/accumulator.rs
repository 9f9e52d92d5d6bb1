//! The overlapped tile accumulator.
//!
//! Owns N channel planes plus one weight plane at full output resolution.
//! Tiles are weighted by a cached tent-filter mask and scatter-added into
//! the channel planes; in parallel the mask itself (an all-ones source) is
//! added into the weight plane, so after all samples the weight plane holds
//! the total filter weight that landed on each output pixel. Finalization
//! divides channel sums by accumulated weight.
//!
//! Lifecycle per output frame:
//! 1. `init_memory` (once per resolution change)
//! 2. `zero_planes`
//! 3. `accumulate_pixel_data` per rendered sample
//! 4. `fetch_final_pixel_data_*` once
//! 5. `reset` (or `zero_planes` again for the next frame)

use crate::pixel::PixelTile;
use crate::plane::AccumulationPlane;
use crate::weights::TileWeightMask;

/// Divisor floor protecting finalization against zero accumulated weight.
const WEIGHT_EPSILON: f32 = 0.0001;

/// Weighted multi-channel image accumulator for overlapping tiles.
#[derive(Debug)]
pub struct OverlappedAccumulator {
    plane_size_x: usize,
    plane_size_y: usize,
    num_channels: usize,
    /// Exponent applied to channel values before accumulation; 1.0 = off.
    /// Finalization applies the inverse.
    pub accumulation_gamma: f32,

    channel_planes: Vec<AccumulationPlane>,
    weight_plane: AccumulationPlane,

    /// Cached tent-filter mask, regenerated only when tile size changes.
    tile_mask: Option<TileWeightMask>,
    /// Cached all-ones source for the weight plane, same size as the mask.
    ones: Vec<f32>,
}

impl Default for OverlappedAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlappedAccumulator {
    pub fn new() -> Self {
        Self {
            plane_size_x: 0,
            plane_size_y: 0,
            num_channels: 0,
            accumulation_gamma: 1.0,
            channel_planes: Vec::new(),
            weight_plane: AccumulationPlane::default(),
            tile_mask: None,
            ones: Vec::new(),
        }
    }

    /// Allocate `num_channels` channel planes plus the weight plane at the
    /// given full output resolution. `num_channels` outside 1..=4 is a
    /// caller bug and fails hard.
    pub fn init_memory(&mut self, plane_size_x: usize, plane_size_y: usize, num_channels: usize) {
        assert!(
            (1..=4).contains(&num_channels),
            "accumulator supports 1..=4 channels, got {}",
            num_channels
        );
        assert!(
            plane_size_x > 0 && plane_size_y > 0,
            "accumulator requires a non-zero plane size, got {}x{}",
            plane_size_x,
            plane_size_y
        );

        self.plane_size_x = plane_size_x;
        self.plane_size_y = plane_size_y;
        self.num_channels = num_channels;
        self.channel_planes = (0..num_channels)
            .map(|_| AccumulationPlane::init(plane_size_x, plane_size_y))
            .collect();
        self.weight_plane = AccumulationPlane::init(plane_size_x, plane_size_y);
    }

    /// Clear all planes for a new output frame. Skipping this accumulates
    /// onto whatever the previous frame left behind.
    pub fn zero_planes(&mut self) {
        for plane in &mut self.channel_planes {
            plane.zero();
        }
        self.weight_plane.zero();
    }

    /// Free all planes and forget the cached tile mask.
    pub fn reset(&mut self) {
        self.plane_size_x = 0;
        self.plane_size_y = 0;
        self.num_channels = 0;
        for plane in &mut self.channel_planes {
            plane.reset();
        }
        self.channel_planes.clear();
        self.weight_plane.reset();
        self.tile_mask = None;
        self.ones = Vec::new();
    }

    pub fn plane_size(&self) -> (usize, usize) {
        (self.plane_size_x, self.plane_size_y)
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Read access to the accumulated weight plane.
    pub fn weight_plane(&self) -> &AccumulationPlane {
        &self.weight_plane
    }

    /// Read access to an accumulated channel plane.
    pub fn channel_plane(&self, channel: usize) -> &AccumulationPlane {
        &self.channel_planes[channel]
    }

    /// Unpack one rendered tile and scatter-add it into every channel plane
    /// plus the weight plane.
    ///
    /// `tile_offset` is the destination pixel position of the tile's first
    /// pixel; `subpixel_offset` components are in [0, 1] with (0.5, 0.5)
    /// meaning exact alignment to destination pixel centers.
    pub fn accumulate_pixel_data(
        &mut self,
        tile: &PixelTile<'_>,
        tile_offset: (i32, i32),
        subpixel_offset: (f32, f32),
    ) {
        debug_assert!(
            self.plane_size_x > 0 && self.plane_size_y > 0,
            "accumulate_pixel_data on an uninitialized accumulator"
        );

        let mut channels = tile.unpack_channels(self.num_channels);

        // Optional accumulation-space gamma, inverted at fetch time.
        if self.accumulation_gamma != 1.0 {
            let gamma = self.accumulation_gamma;
            for chan in &mut channels {
                for v in chan.iter_mut() {
                    *v = v.powf(gamma);
                }
            }
        }

        if !self
            .tile_mask
            .as_ref()
            .is_some_and(|m| m.matches(tile.size_x, tile.size_y))
        {
            self.tile_mask = Some(TileWeightMask::new(tile.size_x, tile.size_y));
            self.ones = vec![1.0; tile.size_x * tile.size_y];
        }
        let mask = self.tile_mask.as_ref().expect("mask freshly cached");

        for (plane, chan) in self.channel_planes.iter_mut().zip(&channels) {
            plane.accumulate_tile(
                chan,
                &mask.weights,
                tile.size_x,
                tile.size_y,
                tile_offset.0,
                tile_offset.1,
                subpixel_offset.0,
                subpixel_offset.1,
                &mask.sub_rect,
            );
        }

        // The weight plane sees the mask applied to an all-ones source, so
        // its final value is the total overlap weight per output pixel.
        self.weight_plane.accumulate_tile(
            &self.ones,
            &mask.weights,
            tile.size_x,
            tile.size_y,
            tile_offset.0,
            tile_offset.1,
            subpixel_offset.0,
            subpixel_offset.1,
            &mask.sub_rect,
        );
    }

    /// Final weighted-average value of one output pixel, as R,G,B,A.
    ///
    /// Channels the accumulator does not carry read as 0.0 (color) or 1.0
    /// (alpha). When an accumulation gamma is active the inverse exponent
    /// is applied to every channel, alpha included.
    pub fn fetch_full_image_value(&self, x: usize, y: usize) -> [f32; 4] {
        debug_assert!(
            self.plane_size_x > 0 && self.plane_size_y > 0,
            "fetch on an uninitialized accumulator"
        );

        let weight = self.weight_plane.value(x, y).max(WEIGHT_EPSILON);
        let mut out = [0.0, 0.0, 0.0, 1.0];
        for (c, slot) in out.iter_mut().enumerate().take(self.num_channels) {
            *slot = self.channel_planes[c].value(x, y) / weight;
        }
        if self.accumulation_gamma != 1.0 {
            let inv = 1.0 / self.accumulation_gamma;
            for v in &mut out {
                *v = v.powf(inv);
            }
        }
        out
    }

    /// Finalize the whole frame as linear-color pixels.
    pub fn fetch_final_pixel_data_linear(&self) -> Vec<[f32; 4]> {
        let mut out = Vec::with_capacity(self.plane_size_x * self.plane_size_y);
        for y in 0..self.plane_size_y {
            for x in 0..self.plane_size_x {
                out.push(self.fetch_full_image_value(x, y));
            }
        }
        out
    }

    /// Finalize the whole frame quantized to 8-bit R,G,B,A.
    pub fn fetch_final_pixel_data_byte(&self) -> Vec<[u8; 4]> {
        let mut out = Vec::with_capacity(self.plane_size_x * self.plane_size_y);
        for y in 0..self.plane_size_y {
            for x in 0..self.plane_size_x {
                let px = self.fetch_full_image_value(x, y);
                out.push([
                    quantize(px[0]),
                    quantize(px[1]),
                    quantize(px[2]),
                    quantize(px[3]),
                ]);
            }
        }
        out
    }
}

fn quantize(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}
