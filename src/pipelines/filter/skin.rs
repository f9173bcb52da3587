// SPDX-License-Identifier: GPL-3.0-only

//! Skin filter step: smoothing, then tone adjustment
//!
//! `smoothing` is either a bare strength (`0.4`) or `{ "strength": 0.4 }`.
//! `tone` is `{ "hue": .., "saturation": .., "brightness": .. }` with every
//! field optional. Each sub-step runs only if its key is present.

use super::{FilterSettings, setting_f32};
use crate::media::frame::FrameBuffer;
use crate::media::pixel_ops::{self, ToneAdjustment};
use serde_json::Value;
use tracing::warn;

pub fn apply(frame: &FrameBuffer, settings: &FilterSettings) -> FrameBuffer {
    let mut current = frame.clone();

    if let Some(value) = settings.get("smoothing") {
        match smoothing_strength(value) {
            Some(strength) => current = pixel_ops::smooth(&current, strength),
            None => warn!(settings = %value, "Invalid smoothing settings, skipping"),
        }
    }

    if let Some(value) = settings.get("tone") {
        match serde_json::from_value::<ToneAdjustment>(value.clone()) {
            Ok(adjustment) => current = pixel_ops::adjust_tone(&current, adjustment),
            Err(e) => warn!(error = %e, "Invalid tone settings, skipping"),
        }
    }

    current
}

fn smoothing_strength(value: &Value) -> Option<f32> {
    match value {
        Value::Object(map) => map.get("strength").and_then(setting_f32),
        other => setting_f32(other),
    }
}
