// SPDX-License-Identifier: GPL-3.0-only

//! Decoded image handles returned by the cache

use crate::errors::CacheError;
use crate::media::frame::FrameBuffer;
use image::{ImageFormat, RgbaImage};
use std::sync::Arc;

/// Which rendition a handle holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Full,
    /// Small preview, replaced by the full image once it arrives
    Low,
}

/// A decoded image, cheap to clone
#[derive(Debug, Clone)]
pub struct ImageHandle {
    pub resource: Arc<RgbaImage>,
    pub width: u32,
    pub height: u32,
    /// Encoded size in bytes of the source this was decoded from
    pub size_estimate: usize,
    /// Encoded format, if recognised
    pub format: Option<ImageFormat>,
    pub resolution: Resolution,
}

impl ImageHandle {
    /// Decode encoded image bytes (blocking; call from `spawn_blocking`)
    pub(crate) fn decode(url: &str, bytes: &[u8], resolution: Resolution) -> Result<Self, CacheError> {
        let format = image::guess_format(bytes).ok();
        let decoded = image::load_from_memory(bytes).map_err(|e| CacheError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();

        Ok(Self {
            resource: Arc::new(rgba),
            width,
            height,
            size_estimate: bytes.len(),
            format,
            resolution,
        })
    }

    pub fn is_low_res(&self) -> bool {
        self.resolution == Resolution::Low
    }

    /// Copy into a frame buffer for still-photo try-on
    pub fn to_frame(&self) -> FrameBuffer {
        FrameBuffer::from_rgba_image((*self.resource).clone())
    }

    /// Lowercase format name, e.g. `"png"`
    pub fn format_name(&self) -> Option<&'static str> {
        self.format.and_then(|f| f.extensions_str().first().copied())
    }
}
