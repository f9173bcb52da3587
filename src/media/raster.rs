// SPDX-License-Identifier: GPL-3.0-only

//! Minimal software rasterizer for makeup overlays and surface compositing
//!
//! Shapes are first rasterized into a coverage mask and blended in a single
//! pass, so overlapping segments of a stroke never darken twice. Alpha of
//! the destination frame is preserved.

use crate::media::frame::BYTES_PER_PIXEL;
use tracing::warn;

/// Solid colour with blend opacity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    pub color: [u8; 3],
    pub opacity: f32,
}

impl Paint {
    pub fn new(color: [u8; 3], opacity: f32) -> Self {
        Self {
            color,
            opacity: if opacity.is_finite() {
                opacity.clamp(0.0, 1.0)
            } else {
                0.0
            },
        }
    }
}

/// Parse `#rgb` or `#rrggbb` (leading `#` optional)
pub fn parse_hex_color(value: &str) -> Option<[u8; 3]> {
    let hex = value.trim().trim_start_matches('#');
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();

    match hex.len() {
        6 => Some([
            channel(hex.get(0..2)?)?,
            channel(hex.get(2..4)?)?,
            channel(hex.get(4..6)?)?,
        ]),
        3 => {
            let expand = |i: usize| -> Option<u8> {
                let v = channel(hex.get(i..i + 1)?)?;
                Some(v * 17)
            };
            Some([expand(0)?, expand(1)?, expand(2)?])
        }
        _ => None,
    }
}

/// Coverage mask for one frame
struct Mask {
    width: usize,
    height: usize,
    covered: Vec<bool>,
}

impl Mask {
    fn new(width: u32, height: u32) -> Self {
        let width = width as usize;
        let height = height as usize;
        Self {
            width,
            height,
            covered: vec![false; width * height],
        }
    }

    fn set(&mut self, x: usize, y: usize) {
        if x < self.width && y < self.height {
            self.covered[y * self.width + x] = true;
        }
    }

    fn blend_into(&self, pixels: &mut [u8], paint: Paint) {
        if paint.opacity <= 0.0 {
            return;
        }
        let a = paint.opacity;
        for (i, _) in self.covered.iter().enumerate().filter(|(_, c)| **c) {
            let o = i * BYTES_PER_PIXEL;
            for c in 0..3 {
                let dst = pixels[o + c] as f32;
                let src = paint.color[c] as f32;
                pixels[o + c] = (src * a + dst * (1.0 - a)).round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

/// Fill a polygon (even-odd rule, sampled at pixel centers)
///
/// `points` are in pixel coordinates. Fewer than 3 points is a no-op.
pub fn fill_polygon(pixels: &mut [u8], width: u32, height: u32, points: &[(f32, f32)], paint: Paint) {
    if points.len() < 3 || width == 0 || height == 0 {
        return;
    }

    let mut mask = Mask::new(width, height);
    let min_y = points.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
    let max_y = points.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);
    let first_row = min_y.floor().max(0.0) as usize;
    let last_row = (max_y.ceil().max(0.0) as usize).min(height as usize - 1);

    let mut crossings = Vec::with_capacity(points.len());
    for row in first_row..=last_row {
        let sample_y = row as f32 + 0.5;
        crossings.clear();

        for (i, &(x0, y0)) in points.iter().enumerate() {
            let (x1, y1) = points[(i + 1) % points.len()];
            // Half-open span so shared vertices are counted once
            if (y0 <= sample_y && sample_y < y1) || (y1 <= sample_y && sample_y < y0) {
                let t = (sample_y - y0) / (y1 - y0);
                crossings.push(x0 + t * (x1 - x0));
            }
        }

        crossings.sort_by(|a, b| a.total_cmp(b));
        for span in crossings.chunks_exact(2) {
            let start = (span[0] - 0.5).ceil().max(0.0) as usize;
            let end = (span[1] - 0.5).floor();
            if end < 0.0 {
                continue;
            }
            let end = (end as usize).min(width as usize - 1);
            for x in start..=end {
                mask.set(x, row);
            }
        }
    }

    mask.blend_into(pixels, paint);
}

/// Stroke an open polyline with round joins and caps
pub fn stroke_polyline(
    pixels: &mut [u8],
    width: u32,
    height: u32,
    points: &[(f32, f32)],
    line_width: f32,
    paint: Paint,
) {
    if points.len() < 2 || width == 0 || height == 0 || !(line_width > 0.0) {
        return;
    }

    let half = line_width / 2.0;
    let mut mask = Mask::new(width, height);

    for segment in points.windows(2) {
        let (a, b) = (segment[0], segment[1]);
        let min_x = (a.0.min(b.0) - half).floor().max(0.0) as usize;
        let max_x = ((a.0.max(b.0) + half).ceil().max(0.0) as usize).min(width as usize - 1);
        let min_y = (a.1.min(b.1) - half).floor().max(0.0) as usize;
        let max_y = ((a.1.max(b.1) + half).ceil().max(0.0) as usize).min(height as usize - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = (x as f32 + 0.5, y as f32 + 0.5);
                if distance_to_segment(p, a, b) <= half {
                    mask.set(x, y);
                }
            }
        }
    }

    mask.blend_into(pixels, paint);
}

fn distance_to_segment(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq > 0.0 {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
    ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt()
}

/// Draw an RGBA surface over the frame (source-over, straight alpha)
///
/// Both buffers must have the same size; the destination alpha is kept.
pub fn composite_over(pixels: &mut [u8], surface: &[u8]) {
    if pixels.len() != surface.len() {
        warn!(
            frame_bytes = pixels.len(),
            surface_bytes = surface.len(),
            "Surface size mismatch, skipping composite"
        );
        return;
    }

    let (Ok(dst), Ok(src)) = (
        bytemuck::try_cast_slice_mut::<u8, [u8; 4]>(pixels),
        bytemuck::try_cast_slice::<u8, [u8; 4]>(surface),
    ) else {
        warn!("Pixel buffers are not RGBA aligned, skipping composite");
        return;
    };

    for (d, s) in dst.iter_mut().zip(src) {
        match s[3] {
            0 => {}
            255 => d[..3].copy_from_slice(&s[..3]),
            alpha => {
                let a = alpha as f32 / 255.0;
                for c in 0..3 {
                    d[c] = (s[c] as f32 * a + d[c] as f32 * (1.0 - a)).round() as u8;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(width: u32, height: u32) -> Vec<u8> {
        [0u8, 0, 0, 255].repeat((width * height) as usize)
    }

    fn red_at(pixels: &[u8], width: u32, x: u32, y: u32) -> u8 {
        pixels[((y * width + x) * 4) as usize]
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ff8000"), Some([255, 128, 0]));
        assert_eq!(parse_hex_color("c21e56"), Some([194, 30, 86]));
        assert_eq!(parse_hex_color("#fff"), Some([255, 255, 255]));
        assert_eq!(parse_hex_color("#ff80"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);
    }

    #[test]
    fn test_fill_polygon_covers_inside_only() {
        let mut pixels = blank(10, 10);
        let square = [(2.0, 2.0), (8.0, 2.0), (8.0, 8.0), (2.0, 8.0)];
        fill_polygon(&mut pixels, 10, 10, &square, Paint::new([255, 0, 0], 1.0));

        assert_eq!(red_at(&pixels, 10, 5, 5), 255);
        assert_eq!(red_at(&pixels, 10, 2, 2), 255);
        assert_eq!(red_at(&pixels, 10, 7, 7), 255);
        assert_eq!(red_at(&pixels, 10, 8, 8), 0);
        assert_eq!(red_at(&pixels, 10, 1, 5), 0);
        // Alpha untouched
        assert!(pixels.chunks_exact(4).all(|p| p[3] == 255));
    }

    #[test]
    fn test_fill_polygon_clips_to_frame() {
        let mut pixels = blank(4, 4);
        let huge = [(-10.0, -10.0), (20.0, -10.0), (20.0, 20.0), (-10.0, 20.0)];
        fill_polygon(&mut pixels, 4, 4, &huge, Paint::new([10, 20, 30], 1.0));
        assert!(pixels.chunks_exact(4).all(|p| p == [10, 20, 30, 255]));
    }

    #[test]
    fn test_stroke_blends_once_at_joints() {
        let mut pixels = blank(12, 12);
        let path = [(2.0, 6.0), (6.0, 6.0), (10.0, 6.0)];
        stroke_polyline(&mut pixels, 12, 12, &path, 2.0, Paint::new([200, 0, 0], 0.5));

        // Joint pixel and a mid-segment pixel get the same single blend
        assert_eq!(red_at(&pixels, 12, 5, 5), 100);
        assert_eq!(red_at(&pixels, 12, 3, 5), 100);
        assert_eq!(red_at(&pixels, 12, 6, 9), 0);
    }

    #[test]
    fn test_zero_opacity_is_noop() {
        let mut pixels = blank(4, 4);
        let before = pixels.clone();
        let tri = [(0.0, 0.0), (4.0, 0.0), (0.0, 4.0)];
        fill_polygon(&mut pixels, 4, 4, &tri, Paint::new([255, 255, 255], 0.0));
        assert_eq!(pixels, before);
    }

    #[test]
    fn test_composite_over_respects_alpha() {
        let mut pixels = vec![100, 100, 100, 255, 100, 100, 100, 255, 100, 100, 100, 255];
        let surface = vec![0, 0, 0, 0, 200, 0, 0, 255, 200, 200, 200, 128];
        composite_over(&mut pixels, &surface);

        assert_eq!(&pixels[0..4], &[100, 100, 100, 255]);
        assert_eq!(&pixels[4..8], &[200, 0, 0, 255]);
        assert_eq!(&pixels[8..12], &[150, 150, 150, 255]);
    }
}
