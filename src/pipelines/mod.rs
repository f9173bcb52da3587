// SPDX-License-Identifier: MPL-2.0

//! Frame processing pipelines
//!
//! Live camera frames go through the session's filters without stalling
//! the caller's async runtime. Filter passes normally run on a dedicated
//! worker thread; when that is unavailable they run inline instead.
//!
//! # Pipeline Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Camera Frame │ ──▶ │  FrameDispatcher  │ ──▶ │ Session last │
//! │  (RGBA) +    │     │  - offload/inline │     │    frame     │
//! │  landmarks   │     │  - fallback       │     │              │
//! └──────────────┘     └─────────┬─────────┘     └──────────────┘
//!                                │
//!                      ┌─────────┴─────────┐
//!                      │  FilterPipeline   │
//!                      │  makeup/hair/skin │
//!                      └───────────────────┘
//! ```
//!
//! # Design Principles
//!
//! 1. **Non-blocking**: Filter passes run off the async runtime when possible
//! 2. **Graceful degradation**: A failing worker costs latency, not frames
//! 3. **Latest frame wins**: Stale submissions are dropped, never queued
//!
//! # Modules
//!
//! - [`filter`]: Filter types and the ordered filter pipeline
//! - [`offload`]: Dedicated worker thread for filter passes
//! - [`dispatch`]: Per-frame offload/inline decision and fallback

pub mod dispatch;
pub mod filter;
pub mod offload;

pub use dispatch::{ExecutionPath, FrameDispatcher, ProcessedFrame};
pub use filter::{Filter, FilterKind, FilterPipeline, FilterSettings};
pub use offload::{OffloadExecutor, OffloadWorker, PipelineJob};
