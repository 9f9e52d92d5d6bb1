//! Render-pass interface and the per-frame accumulation pipeline.
//!
//! The renderer side of the system is a closed set of pass types behind an
//! explicit trait rather than an open reflection-driven hierarchy: a pass
//! can set up, produce overlapping tile samples for a frame, report the
//! logical output layers it feeds, and tear down. The pipeline claims a
//! pooled accumulator per frame, runs the zero/accumulate/fetch lifecycle
//! off the samples' first/last flags, and hands finalized images to an
//! output merger.

use crate::pixel::{pack_rgba, PixelFormat, PixelTile};
use crate::pool::AccumulatorPool;

/// Identifier of one logical output layer (a render pass output).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PassIdentifier(pub String);

impl PassIdentifier {
    pub fn new(name: &str) -> Self {
        Self(name.to_owned())
    }
}

/// One rendered tile plus its placement and lifecycle flags.
///
/// Samples for a frame arrive in unspecified but eventually-complete order
/// per tile; `is_first_sample` / `is_last_sample` bracket the accumulator
/// lifecycle for the frame.
#[derive(Clone, Debug)]
pub struct TileSample {
    pub data: Vec<u8>,
    pub size_x: usize,
    pub size_y: usize,
    pub format: PixelFormat,
    /// Destination pixel position of the tile's first pixel.
    pub tile_offset: (i32, i32),
    /// Subpixel placement in [0, 1]; (0.5, 0.5) aligns to pixel centers.
    pub subpixel_offset: (f32, f32),
    pub is_first_sample: bool,
    pub is_last_sample: bool,
}

impl TileSample {
    /// Borrow the sample as an unpackable tile.
    pub fn as_tile(&self) -> PixelTile<'_> {
        PixelTile::new(&self.data, self.size_x, self.size_y, self.format)
    }
}

/// A finalized full-resolution output frame.
#[derive(Clone, Debug)]
pub struct FinalImage {
    pub size_x: usize,
    pub size_y: usize,
    pub pixels: Vec<[f32; 4]>,
}

/// Receives finalized frames per logical output layer.
pub trait OutputMerger {
    fn on_frame_complete(&mut self, pass: &PassIdentifier, frame_index: u32, image: FinalImage);
}

/// A renderer pass: a producer of overlapping tile samples.
pub trait RenderPass {
    /// Allocate pass resources for the given output and tile sizes.
    fn setup(&mut self, frame_size: (usize, usize), tile_size: (usize, usize));

    /// Release pass resources.
    fn teardown(&mut self);

    /// Logical output layers this pass produces.
    fn gather_output_passes(&self) -> Vec<PassIdentifier>;

    /// Produce every tile sample for one frame.
    fn render(&mut self, frame_index: u32) -> Vec<TileSample>;
}

/// Emit tiles covering `frame_size` on a half-tile stride, sampling a
/// continuous image function at pixel centers. The half-tile overlap keeps
/// the tent-filter weight positive across the whole frame.
fn render_overlapping_tiles(
    frame_size: (usize, usize),
    tile_size: (usize, usize),
    shade: impl Fn(i32, i32) -> [f32; 4],
) -> Vec<TileSample> {
    let (frame_x, frame_y) = (frame_size.0 as i32, frame_size.1 as i32);
    let (tile_x, tile_y) = (tile_size.0 as i32, tile_size.1 as i32);
    let stride_x = (tile_x / 2).max(1);
    let stride_y = (tile_y / 2).max(1);

    let mut samples = Vec::new();
    let mut oy = -stride_y;
    while oy < frame_y {
        let mut ox = -stride_x;
        while ox < frame_x {
            let mut pixels = Vec::with_capacity(tile_size.0 * tile_size.1);
            for ty in 0..tile_y {
                for tx in 0..tile_x {
                    pixels.push(shade(ox + tx, oy + ty));
                }
            }
            samples.push(TileSample {
                data: pack_rgba(&pixels, PixelFormat::RgbaF32),
                size_x: tile_size.0,
                size_y: tile_size.1,
                format: PixelFormat::RgbaF32,
                tile_offset: (ox, oy),
                subpixel_offset: (0.5, 0.5),
                is_first_sample: false,
                is_last_sample: false,
            });
            ox += stride_x;
        }
        oy += stride_y;
    }

    if let Some(first) = samples.first_mut() {
        first.is_first_sample = true;
    }
    if let Some(last) = samples.last_mut() {
        last.is_last_sample = true;
    }
    samples
}

/// Lit-color pass: shades a smooth gradient, standing in for the beauty
/// render of a deferred renderer.
#[derive(Debug, Default)]
pub struct DeferredRenderPass {
    frame_size: (usize, usize),
    tile_size: (usize, usize),
}

impl RenderPass for DeferredRenderPass {
    fn setup(&mut self, frame_size: (usize, usize), tile_size: (usize, usize)) {
        self.frame_size = frame_size;
        self.tile_size = tile_size;
    }

    fn teardown(&mut self) {
        self.frame_size = (0, 0);
        self.tile_size = (0, 0);
    }

    fn gather_output_passes(&self) -> Vec<PassIdentifier> {
        vec![PassIdentifier::new("beauty")]
    }

    fn render(&mut self, frame_index: u32) -> Vec<TileSample> {
        let (fx, fy) = (self.frame_size.0 as f32, self.frame_size.1 as f32);
        let t = frame_index as f32 * 0.01;
        render_overlapping_tiles(self.frame_size, self.tile_size, |x, y| {
            let u = (x as f32 + 0.5) / fx;
            let v = (y as f32 + 0.5) / fy;
            [u, v, (t + u * v).fract(), 1.0]
        })
    }
}

/// Object-id pass: writes an integer object id per pixel as a float,
/// uncompressed and unfiltered in value terms (ids still pass through the
/// weighted accumulation like any channel).
#[derive(Debug, Default)]
pub struct ObjectIdRenderPass {
    frame_size: (usize, usize),
    tile_size: (usize, usize),
    /// Side length of the id checkerboard used by the stand-in shader.
    pub cell_size: usize,
}

impl RenderPass for ObjectIdRenderPass {
    fn setup(&mut self, frame_size: (usize, usize), tile_size: (usize, usize)) {
        self.frame_size = frame_size;
        self.tile_size = tile_size;
        if self.cell_size == 0 {
            self.cell_size = 8;
        }
    }

    fn teardown(&mut self) {
        self.frame_size = (0, 0);
        self.tile_size = (0, 0);
    }

    fn gather_output_passes(&self) -> Vec<PassIdentifier> {
        vec![PassIdentifier::new("object_id")]
    }

    fn render(&mut self, _frame_index: u32) -> Vec<TileSample> {
        let cell = self.cell_size as i32;
        render_overlapping_tiles(self.frame_size, self.tile_size, |x, y| {
            let id = ((x.div_euclid(cell) + y.div_euclid(cell)).rem_euclid(2) + 1) as f32;
            [id, 0.0, 0.0, 1.0]
        })
    }
}

/// Drives render passes through pooled accumulators into an output merger.
pub struct FramePipeline {
    pool: AccumulatorPool,
    frame_size: (usize, usize),
    num_channels: usize,
    pub accumulation_gamma: f32,
}

impl FramePipeline {
    pub fn new(pool: AccumulatorPool, frame_size: (usize, usize), num_channels: usize) -> Self {
        Self {
            pool,
            frame_size,
            num_channels,
            accumulation_gamma: 1.0,
        }
    }

    /// Render one frame of one pass and deliver the finalized image.
    ///
    /// Claims an accumulator from the pool (blocking if every instance is
    /// busy with another in-flight frame) and runs the full lifecycle:
    /// zero on the first sample, accumulate each sample, fetch and reset on
    /// the last. Samples for the same frame stay strictly ordered because
    /// the lease is exclusive for the whole loop.
    pub fn render_frame(
        &self,
        pass: &mut dyn RenderPass,
        frame_index: u32,
        merger: &mut dyn OutputMerger,
    ) {
        let samples = pass.render(frame_index);
        if samples.is_empty() {
            return;
        }

        let mut acc = self.pool.claim();
        if acc.plane_size() != self.frame_size || acc.num_channels() != self.num_channels {
            acc.init_memory(self.frame_size.0, self.frame_size.1, self.num_channels);
        }
        acc.accumulation_gamma = self.accumulation_gamma;

        let outputs = pass.gather_output_passes();
        for sample in &samples {
            if sample.is_first_sample {
                acc.zero_planes();
            }
            acc.accumulate_pixel_data(
                &sample.as_tile(),
                sample.tile_offset,
                sample.subpixel_offset,
            );
            if sample.is_last_sample {
                let image = FinalImage {
                    size_x: self.frame_size.0,
                    size_y: self.frame_size.1,
                    pixels: acc.fetch_final_pixel_data_linear(),
                };
                for id in &outputs {
                    merger.on_frame_complete(id, frame_index, image.clone());
                }
            }
        }
        // Lease drop returns the instance (planes intact) to the pool.
    }
}
