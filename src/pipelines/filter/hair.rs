// SPDX-License-Identifier: GPL-3.0-only

//! Hair filter step
//!
//! Anchors a 3D hair asset to the first face's head pose, renders the scene
//! offscreen and composites the render over the frame.
//!
//! Settings: `asset` (scene asset name, defaults to `"hair"`), `scale`
//! (uniform, defaults to 1.0) and `offset` (`[x, y, z]` added to the pose
//! translation).
//!
//! Without a usable scene and camera, or without a renderer, the step is a
//! passthrough. Once a surface has been acquired it goes back to the
//! renderer on every exit path through [`SurfaceGuard`].

use super::{FilterSettings, setting_f32};
use crate::backends::pose::PoseEstimator;
use crate::backends::render::{RenderContext, SceneRenderer, SurfaceGuard, Transform};
use crate::constants::DEFAULT_HAIR_ASSET;
use crate::errors::RenderError;
use crate::media::frame::{FrameBuffer, LandmarkSet};
use crate::media::raster;
use serde_json::Value;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, PartialEq)]
struct HairSettings {
    asset: String,
    scale: f32,
    offset: [f32; 3],
}

impl HairSettings {
    fn parse(settings: &FilterSettings) -> Self {
        let asset = settings
            .get("asset")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_HAIR_ASSET)
            .to_string();
        let scale = settings
            .get("scale")
            .and_then(setting_f32)
            .filter(|s| *s > 0.0)
            .unwrap_or(1.0);
        let offset = settings
            .get("offset")
            .and_then(Value::as_array)
            .and_then(|arr| match arr.as_slice() {
                [x, y, z] => Some([setting_f32(x)?, setting_f32(y)?, setting_f32(z)?]),
                _ => None,
            })
            .unwrap_or([0.0; 3]);

        Self { asset, scale, offset }
    }
}

pub fn apply(
    frame: &FrameBuffer,
    faces: &[LandmarkSet],
    settings: &FilterSettings,
    render: &RenderContext,
    renderer: Option<&dyn SceneRenderer>,
    pose: &dyn PoseEstimator,
) -> Result<FrameBuffer, RenderError> {
    let Some((scene, camera)) = render.usable() else {
        trace!("No scene/camera attached, hair step is a passthrough");
        return Ok(frame.clone());
    };
    let Some(renderer) = renderer else {
        trace!("No renderer configured, hair step is a passthrough");
        return Ok(frame.clone());
    };
    let Some(face) = faces.first() else {
        return Ok(frame.clone());
    };

    let hair = HairSettings::parse(settings);
    let (width, height) = (frame.width(), frame.height());

    let mut guard = SurfaceGuard::acquire(renderer, width, height)?;
    let head = pose.estimate_pose(face, width, height)?;
    let transform = Transform::from_pose(&head, hair.scale, hair.offset);
    let camera = camera.camera();

    let placed = scene.with_scene(|scene| {
        if !scene.set_transform(&hair.asset, transform) {
            return Ok(false);
        }
        guard.render(scene, &camera).map(|_| true)
    })?;

    if !placed {
        warn!(asset = %hair.asset, "Scene has no such hair asset, skipping");
        return Ok(frame.clone());
    }

    let Some(surface) = guard.surface() else {
        return Err(RenderError::SurfaceUnavailable("surface released before composite".into()));
    };
    if (surface.width, surface.height) != (width, height) {
        return Err(RenderError::SurfaceSize {
            expected: (width, height),
            actual: (surface.width, surface.height),
        });
    }

    let mut pixels = frame.pixels().to_vec();
    raster::composite_over(&mut pixels, &surface.pixels);
    debug!(asset = %hair.asset, yaw = head.rotation[1], "Hair composited");

    Ok(frame.with_pixels(pixels))
}
