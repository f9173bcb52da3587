// SPDX-License-Identifier: MPL-2.0

//! CPU pixel kernels over RGBA frames
//!
//! Both kernels are pure: they read the input frame and return a new frame of
//! the same size. The alpha channel is never touched.
//!
//! They trade fidelity for throughput on purpose. Smoothing samples every
//! second pixel unless a strong effect is requested, and tone adjustment
//! always converts every second pixel and duplicates the result into the next
//! one. Small artifacts from this are expected output, not bugs.

use crate::constants::{
    HUE_RANGE, PERCENT_RANGE, SMOOTHING_CENTER_WEIGHT, SMOOTHING_NEIGHBOR_WEIGHT,
    SmoothingQuality, TONE_SKIP_FACTOR,
};
use crate::media::frame::{BYTES_PER_PIXEL, FrameBuffer};
use serde::{Deserialize, Serialize};

/// Soften skin texture with a 5-tap cross kernel blended over the original
///
/// `strength` is clamped to [0, 1]. The outer 1-pixel border is left as is.
///
/// With a strength of 0.7 or less only every second pixel along both axes is
/// sampled; the kernel value computed there is reused for the pixel to its
/// right and the pixel below it, each blended with its own original colour.
/// Above 0.7 every interior pixel gets its own kernel.
///
/// A strength of 0 returns a byte-identical copy at either sampling stride.
pub fn smooth(frame: &FrameBuffer, strength: f32) -> FrameBuffer {
    let strength = if strength.is_finite() {
        strength.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let skip = SmoothingQuality::for_strength(strength).skip_factor();
    smooth_with_skip(frame, strength, skip)
}

/// Smoothing loop at an explicit sampling stride; `strength` must be in [0, 1]
fn smooth_with_skip(frame: &FrameBuffer, strength: f32, skip: usize) -> FrameBuffer {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let src = frame.pixels();
    let mut out = src.to_vec();

    // No interior pixels
    if width < 3 || height < 3 {
        return frame.with_pixels(out);
    }

    let skip = skip.max(1);
    let stride = width * BYTES_PER_PIXEL;

    for y in (1..height - 1).step_by(skip) {
        for x in (1..width - 1).step_by(skip) {
            let idx = y * stride + x * BYTES_PER_PIXEL;

            let mut kernel = [0.0f32; 3];
            for (c, value) in kernel.iter_mut().enumerate() {
                let center = src[idx + c] as f32;
                let neighbors = src[idx - stride + c] as f32
                    + src[idx + stride + c] as f32
                    + src[idx - BYTES_PER_PIXEL + c] as f32
                    + src[idx + BYTES_PER_PIXEL + c] as f32;
                *value = SMOOTHING_CENTER_WEIGHT * center + SMOOTHING_NEIGHBOR_WEIGHT * neighbors;
            }

            blend_kernel(&mut out, src, idx, &kernel, strength);

            if skip > 1 {
                if x + 1 < width - 1 {
                    blend_kernel(&mut out, src, idx + BYTES_PER_PIXEL, &kernel, strength);
                }
                if y + 1 < height - 1 {
                    blend_kernel(&mut out, src, idx + stride, &kernel, strength);
                }
            }
        }
    }

    frame.with_pixels(out)
}

/// `out = kernel * strength + original * (1 - strength)` for the RGB channels at `idx`
#[inline]
fn blend_kernel(out: &mut [u8], src: &[u8], idx: usize, kernel: &[f32; 3], strength: f32) {
    for c in 0..3 {
        let original = src[idx + c] as f32;
        let value = kernel[c] * strength + original * (1.0 - strength);
        out[idx + c] = value.round().clamp(0.0, 255.0) as u8;
    }
}

/// Hue/saturation/brightness deltas
///
/// `hue` is in degrees and wraps around; `saturation` and `brightness` are
/// percentage points added to the HSL saturation and lightness, clamped to
/// [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneAdjustment {
    pub hue: f32,
    pub saturation: f32,
    pub brightness: f32,
}

impl ToneAdjustment {
    pub fn new(hue: f32, saturation: f32, brightness: f32) -> Self {
        Self {
            hue,
            saturation,
            brightness,
        }
    }

    /// Replace non-finite deltas with zero
    fn sanitized(self) -> Self {
        let finite = |v: f32| if v.is_finite() { v } else { 0.0 };
        Self {
            hue: finite(self.hue),
            saturation: finite(self.saturation),
            brightness: finite(self.brightness),
        }
    }
}

/// Shift hue, saturation and lightness in HSL space
///
/// Pixels are visited in linear buffer order with a fixed stride of 2: each
/// even-indexed pixel is converted and adjusted, and the following pixel
/// receives a copy of that colour instead of being converted itself. A zero
/// adjustment reproduces the input within ±1 per channel on even pixels.
pub fn adjust_tone(frame: &FrameBuffer, adjustment: ToneAdjustment) -> FrameBuffer {
    let adjustment = adjustment.sanitized();
    let src = frame.pixels();
    let mut out = src.to_vec();
    let count = frame.pixel_count();

    for i in (0..count).step_by(TONE_SKIP_FACTOR) {
        let o = i * BYTES_PER_PIXEL;
        let (h, s, l) = rgb_to_hsl(src[o], src[o + 1], src[o + 2]);

        let h = (h + adjustment.hue).rem_euclid(HUE_RANGE);
        let s = (s + adjustment.saturation).clamp(0.0, PERCENT_RANGE);
        let l = (l + adjustment.brightness).clamp(0.0, PERCENT_RANGE);

        let rgb = hsl_to_rgb(h, s, l);
        out[o..o + 3].copy_from_slice(&rgb);

        // Lookahead duplication into the next pixel
        if i + 1 < count {
            let next = o + BYTES_PER_PIXEL;
            out[next..next + 3].copy_from_slice(&rgb);
        }
    }

    frame.with_pixels(out)
}

/// RGB (0-255) to HSL (hue in degrees, saturation/lightness in percent)
pub fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        // Achromatic
        return (0.0, 0.0, l * PERCENT_RANGE);
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };

    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    (h * 60.0, s * PERCENT_RANGE, l * PERCENT_RANGE)
}

/// HSL (hue in degrees, saturation/lightness in percent) to RGB (0-255)
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [u8; 3] {
    let s = s / PERCENT_RANGE;
    let l = l / PERCENT_RANGE;

    let to_byte = |v: f32| (v * 255.0).round().clamp(0.0, 255.0) as u8;

    if s == 0.0 {
        let v = to_byte(l);
        return [v, v, v];
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let h = h / HUE_RANGE;

    [
        to_byte(hue_to_channel(p, q, h + 1.0 / 3.0)),
        to_byte(hue_to_channel(p, q, h)),
        to_byte(hue_to_channel(p, q, h - 1.0 / 3.0)),
    ]
}

#[inline]
fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic non-uniform test frame
    fn gradient_frame(width: u32, height: u32) -> FrameBuffer {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push((x * 37 + y * 11) as u8);
                pixels.push((x * 5 + y * 53) as u8);
                pixels.push((x * 91 + y * 7 + 13) as u8);
                pixels.push((200 + x + y) as u8);
            }
        }
        FrameBuffer::new(width, height, pixels).unwrap()
    }

    #[test]
    fn test_smooth_zero_strength_uniform_4x4() {
        let frame = FrameBuffer::filled(4, 4, [120, 80, 60, 255]);
        let out = smooth(&frame, 0.0);
        assert_eq!(out.pixels(), frame.pixels());
    }

    #[test]
    fn test_smooth_zero_strength_is_identity() {
        // Odd and even sizes so the shared-kernel neighbours land on both
        // interior and border columns
        for (w, h) in [(9, 7), (8, 8), (4, 4)] {
            let frame = gradient_frame(w, h);
            assert_eq!(smooth(&frame, 0.0).pixels(), frame.pixels());
        }
        let frame = gradient_frame(9, 7);
        assert_eq!(smooth(&frame, f32::NAN).pixels(), frame.pixels());
        assert_eq!(smooth(&frame, -3.0).pixels(), frame.pixels());
    }

    #[test]
    fn test_smooth_zero_strength_is_identity_at_both_strides() {
        for skip in [1, 2] {
            for (w, h) in [(9, 7), (8, 8), (4, 4)] {
                let frame = gradient_frame(w, h);
                let out = smooth_with_skip(&frame, 0.0, skip);
                assert_eq!(out.pixels(), frame.pixels(), "skip {} at {}x{}", skip, w, h);
            }
        }
    }

    #[test]
    fn test_quality_tier_picks_stride() {
        // Public entry point matches the explicit stride for each tier
        let frame = gradient_frame(9, 7);
        assert_eq!(smooth(&frame, 0.5).pixels(), smooth_with_skip(&frame, 0.5, 2).pixels());
        assert_eq!(smooth(&frame, 0.9).pixels(), smooth_with_skip(&frame, 0.9, 1).pixels());
    }

    #[test]
    fn test_smooth_never_touches_border_or_alpha() {
        let frame = gradient_frame(10, 8);
        for strength in [0.3, 1.0] {
            let out = smooth(&frame, strength);
            for y in 0..8 {
                for x in 0..10 {
                    let before = frame.pixel(x, y).unwrap();
                    let after = out.pixel(x, y).unwrap();
                    assert_eq!(before[3], after[3], "alpha changed at {},{}", x, y);
                    if x == 0 || y == 0 || x == 9 || y == 7 {
                        assert_eq!(before, after, "border changed at {},{}", x, y);
                    }
                }
            }
        }
    }

    #[test]
    fn test_smooth_uniform_frame_is_stable_at_full_strength() {
        let frame = FrameBuffer::filled(6, 6, [90, 140, 200, 255]);
        let out = smooth(&frame, 1.0);
        assert_eq!(out.pixels(), frame.pixels());
    }

    #[test]
    fn test_smooth_full_strength_applies_kernel() {
        // Single bright pixel in the middle of a dark 3x3 frame
        let mut pixels = vec![0u8; 3 * 3 * 4];
        let center = (3 + 1) * 4;
        pixels[center] = 200;
        let frame = FrameBuffer::new(3, 3, pixels).unwrap();

        let out = smooth(&frame, 1.0);
        // 0.6 * 200 + 0.1 * 0 = 120
        assert_eq!(out.pixel(1, 1).unwrap()[0], 120);
    }

    #[test]
    fn test_smooth_fast_tier_shares_kernel_with_neighbours() {
        // 5x5 frame with a bright column at x=1: the kernel computed at (1,1)
        // is reused at (2,1) even though (2,1) has different neighbours.
        let mut pixels = vec![0u8; 5 * 5 * 4];
        for y in 0..5 {
            pixels[(y * 5 + 1) * 4] = 100;
        }
        let frame = FrameBuffer::new(5, 5, pixels).unwrap();

        let out = smooth(&frame, 0.5);
        // kernel(1,1) = 0.6*100 + 0.1*(100+100+0+0) = 80
        // (1,1): 80*0.5 + 100*0.5 = 90
        // (2,1): 80*0.5 +   0*0.5 = 40
        assert_eq!(out.pixel(1, 1).unwrap()[0], 90);
        assert_eq!(out.pixel(2, 1).unwrap()[0], 40);
        assert_eq!(out.pixel(1, 2).unwrap()[0], 90);
    }

    #[test]
    fn test_smooth_does_not_mutate_input() {
        let frame = gradient_frame(6, 6);
        let snapshot = frame.pixels().to_vec();
        let _ = smooth(&frame, 0.9);
        assert_eq!(frame.pixels(), snapshot.as_slice());
    }

    #[test]
    fn test_smooth_tiny_frames() {
        for (w, h) in [(0, 0), (1, 1), (2, 5), (5, 2)] {
            let frame = FrameBuffer::filled(w, h, [1, 2, 3, 4]);
            assert_eq!(smooth(&frame, 1.0), frame);
        }
    }

    #[test]
    fn test_tone_zero_adjustment_within_tolerance() {
        let frame = gradient_frame(7, 5);
        let out = adjust_tone(&frame, ToneAdjustment::default());
        let count = frame.pixel_count();

        for i in 0..count {
            let o = i * 4;
            let before = &frame.pixels()[o..o + 4];
            let after = &out.pixels()[o..o + 4];
            assert_eq!(before[3], after[3], "alpha changed at pixel {}", i);

            if i % 2 == 0 {
                for c in 0..3 {
                    let diff = (before[c] as i16 - after[c] as i16).abs();
                    assert!(diff <= 1, "pixel {} channel {} off by {}", i, c, diff);
                }
            } else {
                let prev = o - 4;
                assert_eq!(&after[..3], &out.pixels()[prev..prev + 3]);
            }
        }
    }

    #[test]
    fn test_tone_duplicates_rgb_but_keeps_each_alpha() {
        let frame = gradient_frame(5, 3);
        let out = adjust_tone(&frame, ToneAdjustment::new(40.0, 10.0, -5.0));
        for i in (0..15usize).step_by(2).filter(|i| i + 1 < 15) {
            let (x, y) = ((i % 5) as u32, (i / 5) as u32);
            let (nx, ny) = (((i + 1) % 5) as u32, ((i + 1) / 5) as u32);
            let even = out.pixel(x, y).unwrap();
            let odd = out.pixel(nx, ny).unwrap();
            assert_eq!(even[0..3], odd[0..3]);
            assert_eq!(odd[3], frame.pixel(nx, ny).unwrap()[3]);
            assert_eq!(even[3], frame.pixel(x, y).unwrap()[3]);
        }
    }

    #[test]
    fn test_tone_hue_wraps() {
        let frame = FrameBuffer::filled(2, 1, [255, 0, 0, 255]);
        // Red is hue 0; -120 wraps to 240 (blue)
        let out = adjust_tone(&frame, ToneAdjustment::new(-120.0, 0.0, 0.0));
        assert_eq!(out.pixel(0, 0), Some([0, 0, 255, 255]));
        assert_eq!(out.pixel(1, 0), Some([0, 0, 255, 255]));
    }

    #[test]
    fn test_tone_clamps_saturation_and_lightness() {
        let frame = FrameBuffer::filled(1, 1, [200, 100, 50, 128]);
        let desaturated = adjust_tone(&frame, ToneAdjustment::new(0.0, -500.0, 0.0));
        let [r, g, b, a] = desaturated.pixel(0, 0).unwrap();
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(a, 128);

        let white = adjust_tone(&frame, ToneAdjustment::new(0.0, 0.0, 500.0));
        assert_eq!(white.pixel(0, 0), Some([255, 255, 255, 128]));
    }

    #[test]
    fn test_hsl_round_trip_primaries() {
        for rgb in [[255, 0, 0], [0, 255, 0], [0, 0, 255], [128, 128, 128], [0, 0, 0]] {
            let (h, s, l) = rgb_to_hsl(rgb[0], rgb[1], rgb[2]);
            assert_eq!(hsl_to_rgb(h, s, l), rgb);
        }
    }

    #[test]
    fn test_tone_adjustment_partial_json() {
        let adj: ToneAdjustment = serde_json::from_str(r#"{"hue": 15}"#).unwrap();
        assert_eq!(adj, ToneAdjustment::new(15.0, 0.0, 0.0));
    }
}
