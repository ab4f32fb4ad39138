//! Frame buffer types for decoded video frames in CPU memory.
//!
//! Frames are RGB8, tightly packed, row-major with the origin at the top-left
//! corner. That is the layout ffmpeg produces for `rgb24` and the layout the
//! display worker blits, so no conversion happens between decode and render.
//!
//! On disk the pixels are one base64 string rather than a JSON number array.

use crate::error::{ChaserError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize, Serializer};
use std::sync::Arc;

/// Bytes per RGB8 pixel.
pub const BYTES_PER_PIXEL: usize = 3;

/// An immutable decoded video frame.
///
/// The pixel buffer is private and only readable, so once a frame exists
/// its contents cannot change. Records that hold a [`SharedFrame`] therefore
/// always see the pixels as they were decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFrame")]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    #[serde(serialize_with = "encode_pixels")]
    data: Vec<u8>,
}

fn encode_pixels<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

/// Pixel payload as found on disk. Early saves wrote a number array.
#[derive(Deserialize)]
#[serde(untagged)]
enum PixelData {
    Encoded(String),
    Raw(Vec<u8>),
}

/// Unvalidated wire form of a frame.
#[derive(Deserialize)]
struct RawFrame {
    width: u32,
    height: u32,
    data: PixelData,
}

impl TryFrom<RawFrame> for FrameBuffer {
    type Error = ChaserError;

    fn try_from(raw: RawFrame) -> Result<Self> {
        let data = match raw.data {
            PixelData::Encoded(text) => BASE64
                .decode(text)
                .map_err(|e| ChaserError::Serialization(format!("Bad pixel data: {e}")))?,
            PixelData::Raw(bytes) => bytes,
        };
        Self::from_rgb(raw.width, raw.height, data)
    }
}

impl FrameBuffer {
    /// Wrap packed RGB8 pixel data.
    ///
    /// Fails with [`ChaserError::ShapeMismatch`] if `data` is not exactly
    /// `width * height * 3` bytes, or [`ChaserError::InvalidParameter`] for a
    /// zero-sized frame.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ChaserError::InvalidParameter(format!(
                "Frame dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }
        let expected = Self::byte_len(width, height);
        if data.len() != expected {
            return Err(ChaserError::ShapeMismatch {
                expected: format!("{}x{}x{} ({} bytes)", width, height, BYTES_PER_PIXEL, expected),
                actual: format!("{} bytes", data.len()),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A frame filled with a single colour.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self> {
        let pixels = width as usize * height as usize;
        let data = rgb.iter().copied().cycle().take(pixels * BYTES_PER_PIXEL).collect();
        Self::from_rgb(width, height, data)
    }

    /// Create a test pattern frame (8 vertical colour bars).
    pub fn test_pattern(width: u32, height: u32) -> Result<Self> {
        const COLORS: [[u8; 3]; 8] = [
            [255, 255, 255], // White
            [255, 255, 0],   // Yellow
            [0, 255, 255],   // Cyan
            [0, 255, 0],     // Green
            [255, 0, 255],   // Magenta
            [255, 0, 0],     // Red
            [0, 0, 255],     // Blue
            [0, 0, 0],       // Black
        ];

        let mut data = Vec::with_capacity(Self::byte_len(width, height));
        for _ in 0..height {
            for x in 0..width {
                let bar = (x as u64 * 8 / width.max(1) as u64) as usize;
                data.extend_from_slice(&COLORS[bar.min(7)]);
            }
        }
        Self::from_rgb(width, height, data)
    }

    #[inline]
    fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * BYTES_PER_PIXEL
    }

    /// Frame width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Packed RGB8 pixel data.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Total memory usage of the pixel data in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len()
    }

    /// Check that this frame has the given dimensions.
    pub fn ensure_dimensions(&self, width: u32, height: u32) -> Result<()> {
        if self.dimensions() != (width, height) {
            return Err(ChaserError::ShapeMismatch {
                expected: format!("{}x{}", width, height),
                actual: format!("{}x{}", self.width, self.height),
            });
        }
        Ok(())
    }
}

/// Arc-wrapped frame buffer for shared ownership.
pub type SharedFrame = Arc<FrameBuffer>;
