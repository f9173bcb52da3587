// SPDX-License-Identifier: GPL-3.0-only

//! Ordered filter pipeline
//!
//! A pass folds the session's filter list over the input frame: each step
//! receives the previous step's output, so later filters draw over earlier
//! ones. Steps never write into their input buffer.
//!
//! Filter types the pipeline does not know are skipped, which lets newer
//! clients send filter kinds older cores have not learned yet.

pub mod hair;
pub mod makeup;
pub mod regions;
pub mod skin;

use crate::backends::pose::PoseEstimator;
use crate::backends::render::{RenderContext, SceneRenderer};
use crate::errors::PipelineError;
use crate::media::frame::{FrameBuffer, LandmarkSet};
use crate::pipelines::offload::PipelineJob;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};

/// Free-form, per-type filter settings
pub type FilterSettings = serde_json::Map<String, Value>;

/// Filter category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Makeup,
    Hair,
    Skin,
    /// Any type this build does not implement
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for FilterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FilterKind::Makeup => "makeup",
            FilterKind::Hair => "hair",
            FilterKind::Skin => "skin",
            FilterKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// One configured filter of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FilterKind,
    #[serde(default)]
    pub settings: FilterSettings,
}

impl Filter {
    pub fn new(id: impl Into<String>, kind: FilterKind) -> Self {
        Self {
            id: id.into(),
            kind,
            settings: FilterSettings::new(),
        }
    }

    /// Builder-style setting insert
    pub fn with_setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }
}

/// Applies filter lists to frames
///
/// Holds only the stateless collaborators; all per-session state comes in
/// through the call, so one pipeline serves every session and can be shared
/// with the offload worker.
pub struct FilterPipeline {
    pose: Arc<dyn PoseEstimator>,
    renderer: Option<Arc<dyn SceneRenderer>>,
}

impl FilterPipeline {
    pub fn new(pose: Arc<dyn PoseEstimator>, renderer: Option<Arc<dyn SceneRenderer>>) -> Self {
        Self { pose, renderer }
    }

    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    /// Run every filter in list order over `frame`
    pub fn apply(
        &self,
        frame: &FrameBuffer,
        landmarks: &[LandmarkSet],
        filters: &[Filter],
        render: &RenderContext,
    ) -> Result<FrameBuffer, PipelineError> {
        let mut current = frame.clone();

        for filter in filters {
            current = match filter.kind {
                FilterKind::Makeup => makeup::apply(&current, landmarks, &filter.settings),
                FilterKind::Skin => skin::apply(&current, &filter.settings),
                FilterKind::Hair => hair::apply(
                    &current,
                    landmarks,
                    &filter.settings,
                    render,
                    self.renderer.as_deref(),
                    self.pose.as_ref(),
                )
                .map_err(|error| PipelineError::Render {
                    filter_id: filter.id.clone(),
                    error,
                })?,
                FilterKind::Unknown => {
                    trace!(filter = %filter.id, "Skipping filter of unknown type");
                    continue;
                }
            };
        }

        debug!(
            width = frame.width(),
            height = frame.height(),
            filters = filters.len(),
            faces = landmarks.len(),
            "Filter pass complete"
        );
        Ok(current)
    }

    /// Run a job prepared for the offload worker
    pub fn run(&self, job: &PipelineJob) -> Result<FrameBuffer, PipelineError> {
        self.apply(&job.frame, &job.landmarks, &job.filters, &job.render)
    }
}

/// Read a number setting, accepting integers as well as floats
pub(crate) fn setting_f32(value: &Value) -> Option<f32> {
    value.as_f64().map(|v| v as f32).filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::pose::LandmarkPoseEstimator;
    use crate::media::frame::Landmark;
    use serde_json::json;

    fn pipeline() -> FilterPipeline {
        FilterPipeline::new(Arc::new(LandmarkPoseEstimator), None)
    }

    #[test]
    fn test_filter_deserializes_unknown_type() {
        let filter: Filter = serde_json::from_value(json!({
            "id": "f1",
            "type": "glasses",
            "settings": {"model": "aviator"}
        }))
        .unwrap();
        assert_eq!(filter.kind, FilterKind::Unknown);

        let bare: Filter = serde_json::from_value(json!({"id": "f2", "type": "skin"})).unwrap();
        assert_eq!(bare.kind, FilterKind::Skin);
        assert!(bare.settings.is_empty());
    }

    #[test]
    fn test_empty_and_unknown_filters_keep_frame() {
        let frame = FrameBuffer::filled(4, 4, [10, 20, 30, 255]);
        let faces: Vec<LandmarkSet> = vec![vec![Landmark::default(); 4]];
        let filters = vec![Filter::new("x", FilterKind::Unknown)];

        let out = pipeline()
            .apply(&frame, &faces, &filters, &RenderContext::default())
            .unwrap();
        assert_eq!(out, frame);

        let out = pipeline()
            .apply(&frame, &faces, &[], &RenderContext::default())
            .unwrap();
        assert_eq!(out, frame);
    }

    #[test]
    fn test_filters_apply_in_list_order() {
        let frame = FrameBuffer::filled(4, 4, [100, 100, 100, 255]);
        let warm = Filter::new("warm", FilterKind::Skin)
            .with_setting("tone", json!({"brightness": 20.0}));
        let dark = Filter::new("dark", FilterKind::Skin)
            .with_setting("tone", json!({"brightness": -100.0}));
        let p = pipeline();
        let ctx = RenderContext::default();
        let faces: Vec<LandmarkSet> = vec![Vec::new()];

        let a = p.apply(&frame, &faces, &[warm.clone(), dark.clone()], &ctx).unwrap();
        let b = p.apply(&frame, &faces, &[dark, warm], &ctx).unwrap();

        // Last write wins: fully dark vs. dark then lifted
        assert_eq!(a.pixel(0, 0), Some([0, 0, 0, 255]));
        assert_ne!(a, b);
    }
}
