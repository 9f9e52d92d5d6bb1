//! Overlapped tile accumulation for high-resolution frame assembly.
//!
//! A renderer produces overlapping tiles of an output frame, many samples
//! per frame. This crate weights each tile by a tent filter, scatter-adds
//! the weighted values into shared full-resolution channel planes with
//! subpixel-accurate bilinear splatting, and on the frame's last sample
//! divides by the accumulated weight to produce final pixel values.
//!
//! # Example
//!
//! ```
//! use accum::{OverlappedAccumulator, PixelFormat, PixelTile, pack_rgba};
//!
//! let mut acc = OverlappedAccumulator::new();
//! acc.init_memory(64, 64, 4);
//! acc.zero_planes();
//!
//! let pixels = vec![[0.2, 0.4, 0.6, 1.0]; 16 * 16];
//! let bytes = pack_rgba(&pixels, PixelFormat::RgbaF32);
//! let tile = PixelTile::new(&bytes, 16, 16, PixelFormat::RgbaF32);
//! acc.accumulate_pixel_data(&tile, (24, 24), (0.5, 0.5));
//!
//! let image = acc.fetch_final_pixel_data_linear();
//! assert_eq!(image.len(), 64 * 64);
//! ```

pub mod accumulator;
pub mod pixel;
pub mod plane;
pub mod pool;
pub mod render;
pub mod weights;

pub use accumulator::OverlappedAccumulator;
pub use pixel::{pack_rgba, PixelFormat, PixelTile};
pub use plane::AccumulationPlane;
pub use pool::{AccumulatorLease, AccumulatorPool};
pub use render::{
    DeferredRenderPass, FinalImage, FramePipeline, ObjectIdRenderPass, OutputMerger,
    PassIdentifier, RenderPass, TileSample,
};
pub use weights::{
    bounding_sub_rect, check_bounding_sub_rect, generate_weights, SubRect, TileWeightMask,
};
