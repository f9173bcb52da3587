// SPDX-License-Identifier: GPL-3.0-only

//! Makeup filter step
//!
//! Settings keys, all optional:
//!
//! - `lipstick`: `{ "color": "#rrggbb", "opacity": 0.5 }` filled over the lips
//! - `eyeshadow`: `{ "color": ..., "opacity": ... }` filled between lid and brow
//! - `eyeliner`: `{ "color": ..., "width": 2.0, "opacity": ... }` stroked along the upper lids
//!
//! Eyeshadow goes down first so liner stays crisp on top of it.

use super::regions::{self, LEFT_BROW_LOWER, LEFT_EYE_UPPER, LIPS_OUTER, RIGHT_BROW_LOWER, RIGHT_EYE_UPPER};
use super::{FilterSettings, setting_f32};
use crate::constants::makeup::{DEFAULT_FILL_OPACITY, DEFAULT_STROKE_OPACITY, DEFAULT_STROKE_WIDTH};
use crate::media::frame::{FrameBuffer, LandmarkSet};
use crate::media::raster::{self, Paint};
use serde_json::Value;
use tracing::{trace, warn};

/// Parsed fill sub-effect
#[derive(Debug, Clone, Copy, PartialEq)]
struct FillStyle {
    paint: Paint,
}

/// Parsed stroke sub-effect
#[derive(Debug, Clone, Copy, PartialEq)]
struct StrokeStyle {
    paint: Paint,
    width: f32,
}

/// Apply every configured makeup sub-effect to every face
pub fn apply(frame: &FrameBuffer, faces: &[LandmarkSet], settings: &FilterSettings) -> FrameBuffer {
    let eyeshadow = fill_style(settings, "eyeshadow");
    let lipstick = fill_style(settings, "lipstick");
    let eyeliner = stroke_style(settings, "eyeliner");

    if faces.is_empty() || (eyeshadow.is_none() && lipstick.is_none() && eyeliner.is_none()) {
        return frame.clone();
    }

    let (width, height) = (frame.width(), frame.height());
    let mut pixels = frame.pixels().to_vec();

    for face in faces {
        if let Some(style) = eyeshadow {
            for (lid, brow) in [(LEFT_EYE_UPPER, LEFT_BROW_LOWER), (RIGHT_EYE_UPPER, RIGHT_BROW_LOWER)] {
                let outline = regions::eyeshadow_outline(lid, brow);
                if let Some(points) = region_points(face, &outline, width, height) {
                    raster::fill_polygon(&mut pixels, width, height, &points, style.paint);
                }
            }
        }

        if let Some(style) = lipstick
            && let Some(points) = region_points(face, LIPS_OUTER, width, height)
        {
            raster::fill_polygon(&mut pixels, width, height, &points, style.paint);
        }

        if let Some(style) = eyeliner {
            for lid in [LEFT_EYE_UPPER, RIGHT_EYE_UPPER] {
                if let Some(points) = region_points(face, lid, width, height) {
                    raster::stroke_polyline(&mut pixels, width, height, &points, style.width, style.paint);
                }
            }
        }
    }

    frame.with_pixels(pixels)
}

/// Pixel positions of a region, or `None` if the face lacks those landmarks
fn region_points(face: &LandmarkSet, region: &[usize], width: u32, height: u32) -> Option<Vec<(f32, f32)>> {
    if face.len() < regions::required_len(region) {
        trace!(
            landmarks = face.len(),
            needed = regions::required_len(region),
            "Face too sparse for makeup region"
        );
        return None;
    }
    Some(region.iter().map(|&i| face[i].to_pixel(width, height)).collect())
}

fn fill_style(settings: &FilterSettings, key: &str) -> Option<FillStyle> {
    let entry = settings.get(key)?;
    let paint = paint(entry, key, DEFAULT_FILL_OPACITY)?;
    Some(FillStyle { paint })
}

fn stroke_style(settings: &FilterSettings, key: &str) -> Option<StrokeStyle> {
    let entry = settings.get(key)?;
    let paint = paint(entry, key, DEFAULT_STROKE_OPACITY)?;
    let width = match entry.get("width") {
        None => DEFAULT_STROKE_WIDTH,
        Some(v) => match setting_f32(v) {
            Some(w) if w > 0.0 => w,
            _ => {
                warn!(effect = key, value = %v, "Invalid stroke width, skipping");
                return None;
            }
        },
    };
    Some(StrokeStyle { paint, width })
}

fn paint(entry: &Value, key: &str, default_opacity: f32) -> Option<Paint> {
    let Some(color) = entry.get("color").and_then(Value::as_str).and_then(raster::parse_hex_color) else {
        warn!(effect = key, settings = %entry, "Makeup effect without a valid color, skipping");
        return None;
    };
    let opacity = entry
        .get("opacity")
        .and_then(setting_f32)
        .unwrap_or(default_opacity);
    Some(Paint::new(color, opacity))
}
