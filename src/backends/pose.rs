// SPDX-License-Identifier: GPL-3.0-only

//! Head pose estimation from facial landmarks

use crate::errors::RenderError;
use crate::media::frame::Landmark;

/// Estimated head placement in camera space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HeadPose {
    /// x/y offset from the frame center (normalized units), z depth (negative = away)
    pub translation: [f32; 3],
    /// Euler angles in radians (pitch, yaw, roll)
    pub rotation: [f32; 3],
}

/// External head-pose estimator
pub trait PoseEstimator: Send + Sync {
    /// Estimate the pose of one face; `width`/`height` are the frame size in pixels
    fn estimate_pose(
        &self,
        landmarks: &[Landmark],
        width: u32,
        height: u32,
    ) -> Result<HeadPose, RenderError>;
}

// Face mesh indices used by the geometric estimator
const LEFT_EYE_OUTER: usize = 33;
const RIGHT_EYE_OUTER: usize = 263;
const NOSE_TIP: usize = 1;
const CHIN: usize = 152;
const FOREHEAD: usize = 10;

/// Eye distance (as a fraction of frame width) that maps to depth -1.0
const REFERENCE_EYE_DISTANCE: f32 = 0.2;

/// Geometric estimator working directly on face mesh landmarks
///
/// Roll comes from the eye line, yaw from the nose tip's horizontal offset
/// against the eye midpoint and pitch from where the nose tip sits between
/// forehead and chin. Depth scales inversely with the eye distance. Good
/// enough to anchor an asset; not a PnP solve.
#[derive(Debug, Clone, Copy, Default)]
pub struct LandmarkPoseEstimator;

impl LandmarkPoseEstimator {
    pub fn new() -> Self {
        Self
    }
}

impl PoseEstimator for LandmarkPoseEstimator {
    fn estimate_pose(
        &self,
        landmarks: &[Landmark],
        width: u32,
        height: u32,
    ) -> Result<HeadPose, RenderError> {
        let point = |idx: usize| -> Result<(f32, f32), RenderError> {
            landmarks
                .get(idx)
                .map(|lm| lm.to_pixel(width, height))
                .ok_or_else(|| {
                    RenderError::PoseEstimation(format!(
                        "need landmark {}, face has {}",
                        idx,
                        landmarks.len()
                    ))
                })
        };

        if width == 0 || height == 0 {
            return Err(RenderError::PoseEstimation("empty frame".into()));
        }

        let left = point(LEFT_EYE_OUTER)?;
        let right = point(RIGHT_EYE_OUTER)?;
        let nose = point(NOSE_TIP)?;
        let chin = point(CHIN)?;
        let forehead = point(FOREHEAD)?;

        let (dx, dy) = (right.0 - left.0, right.1 - left.1);
        let eye_distance = (dx * dx + dy * dy).sqrt();
        if !(eye_distance > f32::EPSILON) {
            return Err(RenderError::PoseEstimation("degenerate eye landmarks".into()));
        }

        let mid = ((left.0 + right.0) / 2.0, (left.1 + right.1) / 2.0);
        let roll = dy.atan2(dx);
        let yaw = ((nose.0 - mid.0) / (eye_distance / 2.0)).clamp(-1.0, 1.0).asin();

        let face_height = chin.1 - forehead.1;
        let pitch = if face_height.abs() > f32::EPSILON {
            // Neutral nose tip sits roughly halfway between forehead and chin
            let t = (nose.1 - forehead.1) / face_height;
            ((t - 0.5) * 2.0).clamp(-1.0, 1.0).asin()
        } else {
            0.0
        };

        let normalized_eye = eye_distance / width as f32;
        let translation = [
            mid.0 / width as f32 - 0.5,
            0.5 - mid.1 / height as f32,
            -REFERENCE_EYE_DISTANCE / normalized_eye,
        ];

        Ok(HeadPose {
            translation,
            rotation: [pitch, yaw, roll],
        })
    }
}
