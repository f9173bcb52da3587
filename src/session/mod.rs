// SPDX-License-Identifier: GPL-3.0-only

//! AR session lifecycle and state
//!
//! A session holds an ordered filter list and the render state of one
//! try-on view: the last composited frame plus the scene and camera used by
//! hair filters. Sessions are created and ended explicitly.

mod store;
mod types;

pub use store::ArSessionStore;
pub use types::{ArSession, RenderState, SessionId};
