// SPDX-License-Identifier: MPL-2.0

//! Frame buffers and CPU pixel processing
//!
//! # Frames
//!
//! [`frame::FrameBuffer`] is the RGBA8 frame passed through the whole system.
//! Its pixel storage is reference counted and never written after creation,
//! so handing a frame to the offload worker or keeping the raw input for
//! comparison costs no copy.
//!
//! # Kernels
//!
//! The [`pixel_ops`] module holds the skin kernels (smoothing and HSL tone
//! adjustment). Both use a sampling stride to stay inside the per-frame
//! budget of a live camera loop.
//!
//! # Rasterization
//!
//! The [`raster`] module draws makeup shapes (filled regions and strokes)
//! and composites rendered 3D surfaces over a frame.
//!
//! # Modules
//!
//! - [`frame`]: Frame buffer and landmark types
//! - [`pixel_ops`]: Smoothing and tone adjustment kernels
//! - [`raster`]: Polygon fill, polyline stroke and surface compositing

pub mod frame;
pub mod pixel_ops;
pub mod raster;

pub use frame::{FrameBuffer, Landmark, LandmarkSet};
pub use pixel_ops::{ToneAdjustment, adjust_tone, smooth};
