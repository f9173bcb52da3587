// SPDX-License-Identifier: MPL-2.0

//! Collaborator abstraction layer
//!
//! The try-on core consumes three external services it does not implement
//! itself: a head-pose estimator, a 3D scene renderer and a source of image
//! bytes. Each is a `Send + Sync` trait so filter passes can run on the
//! offload worker thread as well as inline.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │      Filter pipeline / Image cache          │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │             Collaborator Layer              │
//! │  ┌─────────────┐    ┌──────────────────┐    │
//! │  │    Pose     │    │     Render       │    │
//! │  │ (landmarks) │    │ (scene, surface) │    │
//! │  └─────────────┘    └──────────────────┘    │
//! │                     ┌──────────────────┐    │
//! │                     │      Fetch       │    │
//! │                     │  (HTTP, mocks)   │    │
//! │                     └──────────────────┘    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`pose`]: Head pose estimation from facial landmarks
//! - [`render`]: Scene/camera handles, renderer trait and surface guard
//! - [`fetch`]: Image byte sources for the acquisition cache

pub mod fetch;
pub mod pose;
pub mod render;

pub use fetch::ImageFetcher;
pub use pose::{HeadPose, LandmarkPoseEstimator, PoseEstimator};
pub use render::{
    Camera, CameraHandle, RenderContext, Scene, SceneHandle, SceneRenderer, Surface, SurfaceGuard,
    Transform,
};
