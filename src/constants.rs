// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application identifier used for the config directory
pub const APP_ID: &str = "tryon";

/// Smoothing quality tier
///
/// Smoothing picks its sampling stride from the requested strength: light
/// smoothing is barely visible, so it samples every second pixel and shares
/// the result with the neighbours; strong smoothing processes every pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmoothingQuality {
    /// Every 2nd pixel along both axes
    Fast,
    /// Every pixel
    Full,
}

impl SmoothingQuality {
    /// Strength above which every pixel is processed
    pub const FULL_QUALITY_THRESHOLD: f32 = 0.7;

    /// Pick the quality tier for a smoothing strength in [0, 1]
    pub fn for_strength(strength: f32) -> Self {
        if strength > Self::FULL_QUALITY_THRESHOLD {
            SmoothingQuality::Full
        } else {
            SmoothingQuality::Fast
        }
    }

    /// Sampling stride along each axis
    pub fn skip_factor(&self) -> usize {
        match self {
            SmoothingQuality::Fast => 2,
            SmoothingQuality::Full => 1,
        }
    }
}

/// Smoothing kernel weight for the center pixel
pub const SMOOTHING_CENTER_WEIGHT: f32 = 0.6;

/// Smoothing kernel weight for each of the 4 direct neighbours
pub const SMOOTHING_NEIGHBOR_WEIGHT: f32 = 0.1;

/// Tone adjustment always processes every 2nd pixel in linear order
pub const TONE_SKIP_FACTOR: usize = 2;

/// Maximum hue value (degrees)
pub const HUE_RANGE: f32 = 360.0;

/// Saturation and lightness are expressed in percent
pub const PERCENT_RANGE: f32 = 100.0;

/// Cached images are considered stale after this long
pub const IMAGE_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Longest edge of low-resolution previews, in pixels
pub const LOW_RES_MAX_DIMENSION: u32 = 64;

/// JPEG quality used when recompressing low-resolution previews
pub const LOW_RES_JPEG_QUALITY: u8 = 30;

/// Timeout for remote image fetches
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Name of the offload worker thread
pub const OFFLOAD_THREAD_NAME: &str = "tryon-offload";

/// Scene asset driven by the hair filter when settings don't name one
pub const DEFAULT_HAIR_ASSET: &str = "hair";

/// Makeup defaults
pub mod makeup {
    /// Fill opacity for lipstick/eyeshadow when not configured
    pub const DEFAULT_FILL_OPACITY: f32 = 0.5;
    /// Stroke opacity for eyeliner when not configured
    pub const DEFAULT_STROKE_OPACITY: f32 = 0.85;
    /// Stroke width in pixels for eyeliner when not configured
    pub const DEFAULT_STROKE_WIDTH: f32 = 2.0;
}
