// SPDX-License-Identifier: GPL-3.0-only

//! Frame buffers and facial landmarks

use crate::errors::FrameError;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Bytes per RGBA pixel
pub const BYTES_PER_PIXEL: usize = 4;

/// Immutable RGBA8 frame
///
/// Pixel storage is reference counted: cloning a frame or moving it to the
/// offload worker never copies pixels. Every kernel and filter step builds a
/// new buffer instead of writing into its input, so callers can keep the
/// original around for diffing.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl FrameBuffer {
    /// Create a frame from tightly packed RGBA8 pixels
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if pixels.len() != expected {
            return Err(FrameError::InvalidLength {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }

        Ok(Self {
            width,
            height,
            pixels: Arc::from(pixels),
        })
    }

    /// Create a frame where every pixel has the same colour
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: Arc::from(rgba.repeat(count)),
        }
    }

    /// Wrap a decoded image without copying its pixels
    pub fn from_rgba_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: Arc::from(image.into_raw()),
        }
    }

    /// Copy the frame into an `image` buffer for encoding
    pub fn to_rgba_image(&self) -> Result<RgbaImage, FrameError> {
        RgbaImage::from_raw(self.width, self.height, self.pixels.to_vec()).ok_or(
            FrameError::InvalidLength {
                width: self.width,
                height: self.height,
                expected: self.width as usize * self.height as usize * BYTES_PER_PIXEL,
                actual: self.pixels.len(),
            },
        )
    }

    /// Build a new frame with the same dimensions from processed pixels
    pub(crate) fn with_pixels(&self, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), self.pixels.len());
        Self {
            width: self.width,
            height: self.height,
            pixels: Arc::from(pixels),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes, row-major, no padding
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Number of pixels
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// RGBA value at (x, y), if inside the frame
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let px = &self.pixels[idx..idx + BYTES_PER_PIXEL];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Whether both frames share the same pixel storage (no copy happened)
    pub fn shares_storage(&self, other: &FrameBuffer) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FrameBuffer({}x{}, {} bytes)",
            self.width,
            self.height,
            self.pixels.len()
        )
    }
}

/// A facial landmark in normalized frame coordinates
///
/// `x` and `y` are fractions of the frame width/height (0.0 = left/top),
/// `z` is the detector's relative depth. Detectors that only produce 2D
/// points may omit `z`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Position in pixel coordinates for a frame of the given size
    pub fn to_pixel(&self, width: u32, height: u32) -> (f32, f32) {
        (self.x * width as f32, self.y * height as f32)
    }
}

/// All landmarks of one detected face, in detector order
pub type LandmarkSet = Vec<Landmark>;
