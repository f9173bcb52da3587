// SPDX-License-Identifier: MPL-2.0

//! Try-on - real-time AR frame compositing and progressive image acquisition
//!
//! This library provides the core of a virtual try-on view: filter passes
//! (makeup, hair, skin) composited over camera frames, per-session state,
//! and a progressive image cache for still-photo try-on.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`media`]: Frame buffers, pixel kernels and rasterization
//! - [`pipelines`]: Filter pipeline, offload worker and frame dispatcher
//! - [`session`]: AR session store
//! - [`backends`]: Pose estimation, scene rendering and image fetching traits
//! - [`cache`]: Progressive image acquisition cache
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! let sessions = Arc::new(ArSessionStore::new());
//! let pipeline = Arc::new(FilterPipeline::new(Arc::new(LandmarkPoseEstimator), None));
//! let dispatcher = FrameDispatcher::new(&config.dispatch, Arc::clone(&sessions), pipeline);
//!
//! let id = sessions.create();
//! sessions.add_filter(&id, filter)?;
//! let out = dispatcher.process(&id, frame, landmarks).await?;
//! ```

pub mod backends;
pub mod cache;
pub mod config;
pub mod constants;
pub mod errors;
pub mod media;
pub mod pipelines;
pub mod session;
mod utils;

// Re-export commonly used types
pub use cache::{ImageCache, ImageHandle};
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use media::{FrameBuffer, Landmark, LandmarkSet};
pub use pipelines::{ExecutionPath, Filter, FilterKind, FilterPipeline, FrameDispatcher, ProcessedFrame};
pub use session::{ArSessionStore, SessionId};
