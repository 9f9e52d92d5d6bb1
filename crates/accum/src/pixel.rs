//! Source pixel formats and channel unpacking.
//!
//! Tiles arrive from the renderer as raw byte buffers in one of three
//! formats. Accumulation works on channel-major f32 planes in R,G,B,A
//! order, so unpacking normalizes, converts, and reorders as needed.
//! 8-bit data is commonly stored B,G,R,A in memory and is swizzled here.

use half::f16;
use rayon::prelude::*;

/// Supported source pixel layouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8 bits per channel, B,G,R,A byte order, normalized to [0, 1].
    Bgra8,
    /// 16-bit half floats, R,G,B,A order.
    RgbaF16,
    /// 32-bit floats, R,G,B,A order.
    RgbaF32,
}

impl PixelFormat {
    /// Bytes occupied by one pixel.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Bgra8 => 4,
            PixelFormat::RgbaF16 => 8,
            PixelFormat::RgbaF32 => 16,
        }
    }

    /// Byte offset of logical channel `c` (R=0, G=1, B=2, A=3) within one
    /// pixel, accounting for the B,G,R,A memory order of the 8-bit format.
    fn channel_offset(&self, c: usize) -> usize {
        match self {
            PixelFormat::Bgra8 => [2usize, 1, 0, 3][c],
            PixelFormat::RgbaF16 => c * 2,
            PixelFormat::RgbaF32 => c * 4,
        }
    }
}

/// A borrowed tile of raw pixel data plus its dimensions and layout.
#[derive(Clone, Copy, Debug)]
pub struct PixelTile<'a> {
    pub data: &'a [u8],
    pub size_x: usize,
    pub size_y: usize,
    pub format: PixelFormat,
}

impl<'a> PixelTile<'a> {
    pub fn new(data: &'a [u8], size_x: usize, size_y: usize, format: PixelFormat) -> Self {
        // A wrong stride here would silently corrupt the shared planes, so
        // this is fatal rather than recoverable.
        assert_eq!(
            data.len(),
            size_x * size_y * format.bytes_per_pixel(),
            "pixel buffer is {} bytes, expected {} for a {}x{} {:?} tile",
            data.len(),
            size_x * size_y * format.bytes_per_pixel(),
            size_x,
            size_y,
            format
        );
        Self {
            data,
            size_x,
            size_y,
            format,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.size_x * self.size_y
    }

    /// Unpack the first `num_channels` logical channels (R,G,B,A order)
    /// into channel-major f32 planes.
    pub fn unpack_channels(&self, num_channels: usize) -> Vec<Vec<f32>> {
        assert!(
            (1..=4).contains(&num_channels),
            "accumulation supports 1..=4 channels, got {}",
            num_channels
        );

        let stride = self.format.bytes_per_pixel();
        (0..num_channels)
            .map(|c| {
                let offset = self.format.channel_offset(c);
                match self.format {
                    PixelFormat::Bgra8 => (0..self.pixel_count())
                        .into_par_iter()
                        .map(|i| self.data[i * stride + offset] as f32 / 255.0)
                        .collect(),
                    PixelFormat::RgbaF16 => (0..self.pixel_count())
                        .into_par_iter()
                        .map(|i| {
                            let at = i * stride + offset;
                            let bits = u16::from_le_bytes([self.data[at], self.data[at + 1]]);
                            f16::from_bits(bits).to_f32()
                        })
                        .collect(),
                    PixelFormat::RgbaF32 => (0..self.pixel_count())
                        .into_par_iter()
                        .map(|i| {
                            let at = i * stride + offset;
                            bytemuck::pod_read_unaligned::<f32>(&self.data[at..at + 4])
                        })
                        .collect(),
                }
            })
            .collect()
    }
}

/// Pack an R,G,B,A f32 pixel slice into a byte buffer for a given format.
/// Test and demo helper for building renderer-shaped tiles.
pub fn pack_rgba(pixels: &[[f32; 4]], format: PixelFormat) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixels.len() * format.bytes_per_pixel());
    for px in pixels {
        match format {
            PixelFormat::Bgra8 => {
                for c in [2usize, 1, 0, 3] {
                    out.push((px[c] * 255.0).round().clamp(0.0, 255.0) as u8);
                }
            }
            PixelFormat::RgbaF16 => {
                for c in 0..4 {
                    out.extend_from_slice(&f16::from_f32(px[c]).to_bits().to_le_bytes());
                }
            }
            PixelFormat::RgbaF32 => {
                for c in 0..4 {
                    out.extend_from_slice(&px[c].to_le_bytes());
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bgra8_reorders_to_rgba() {
        // One pixel, memory order B,G,R,A.
        let bytes = [255u8, 0, 51, 102];
        let tile = PixelTile::new(&bytes, 1, 1, PixelFormat::Bgra8);
        let chans = tile.unpack_channels(4);
        assert!((chans[0][0] - 51.0 / 255.0).abs() < 1e-6, "R");
        assert_eq!(chans[1][0], 0.0, "G");
        assert_eq!(chans[2][0], 1.0, "B");
        assert!((chans[3][0] - 102.0 / 255.0).abs() < 1e-6, "A");
    }

    #[test]
    fn test_f32_round_trip() {
        let pixels = vec![[0.25f32, 0.5, 0.75, 1.0], [1.5, -2.0, 0.0, 0.5]];
        let bytes = pack_rgba(&pixels, PixelFormat::RgbaF32);
        let tile = PixelTile::new(&bytes, 2, 1, PixelFormat::RgbaF32);
        let chans = tile.unpack_channels(4);
        for (i, px) in pixels.iter().enumerate() {
            for c in 0..4 {
                assert_eq!(chans[c][i], px[c]);
            }
        }
    }

    #[test]
    fn test_f16_conversion() {
        let pixels = vec![[0.5f32, 2.0, 0.0, 1.0]];
        let bytes = pack_rgba(&pixels, PixelFormat::RgbaF16);
        let tile = PixelTile::new(&bytes, 1, 1, PixelFormat::RgbaF16);
        let chans = tile.unpack_channels(4);
        // These values are exactly representable as half floats.
        assert_eq!(chans[0][0], 0.5);
        assert_eq!(chans[1][0], 2.0);
        assert_eq!(chans[2][0], 0.0);
        assert_eq!(chans[3][0], 1.0);
    }

    #[test]
    #[should_panic(expected = "pixel buffer is")]
    fn test_size_mismatch_is_fatal() {
        let bytes = [0u8; 7];
        let _ = PixelTile::new(&bytes, 2, 1, PixelFormat::Bgra8);
    }
}
