// SPDX-License-Identifier: GPL-3.0-only

//! Session types

use crate::backends::render::{CameraHandle, RenderContext, SceneHandle};
use crate::media::frame::FrameBuffer;
use crate::pipelines::filter::Filter;
use crate::utils::{lock, read, write};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

/// Opaque AR session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Render-side state of a session
#[derive(Debug, Clone, Default)]
pub struct RenderState {
    /// Output of the most recent completed pass
    pub last_frame: Option<FrameBuffer>,
    pub scene: Option<SceneHandle>,
    pub camera: Option<CameraHandle>,
}

impl RenderState {
    pub fn context(&self) -> RenderContext {
        RenderContext {
            scene: self.scene.clone(),
            camera: self.camera.clone(),
        }
    }
}

/// Point-in-time copy of a session
#[derive(Debug, Clone)]
pub struct ArSession {
    pub id: SessionId,
    pub filters: Vec<Filter>,
    pub render: RenderState,
}

/// Live session state shared between the store and in-flight passes
#[derive(Debug)]
pub(crate) struct SessionEntry {
    id: SessionId,
    /// Replaced wholesale on every edit so passes can hold a snapshot
    filters: RwLock<Arc<[Filter]>>,
    render: Mutex<RenderState>,
    /// Serializes filter passes of this session
    pass_gate: Arc<tokio::sync::Mutex<()>>,
    /// Ticket of the most recent frame submission
    submitted: AtomicU64,
}

impl SessionEntry {
    pub(crate) fn new(id: SessionId) -> Self {
        Self {
            id,
            filters: RwLock::new(Arc::from(Vec::new())),
            render: Mutex::new(RenderState::default()),
            pass_gate: Arc::new(tokio::sync::Mutex::new(())),
            submitted: AtomicU64::new(0),
        }
    }

    pub(crate) fn id(&self) -> SessionId {
        self.id
    }

    /// Register a new frame submission and return its ticket
    pub(crate) fn next_ticket(&self) -> u64 {
        self.submitted.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Whether no newer submission arrived after `ticket`
    pub(crate) fn is_latest(&self, ticket: u64) -> bool {
        self.submitted.load(Ordering::Acquire) == ticket
    }

    /// Wait for exclusive use of this session's render state
    /// Owned so an offloaded pass can keep the session after its caller is gone
    pub(crate) async fn lock_pass(&self) -> tokio::sync::OwnedMutexGuard<()> {
        Arc::clone(&self.pass_gate).lock_owned().await
    }

    pub(crate) fn filters_snapshot(&self) -> Arc<[Filter]> {
        Arc::clone(&read(&self.filters))
    }

    /// Copy-on-write edit of the filter list
    pub(crate) fn edit_filters<R>(&self, f: impl FnOnce(&mut Vec<Filter>) -> R) -> R {
        let mut guard = write(&self.filters);
        let mut list = guard.to_vec();
        let result = f(&mut list);
        *guard = Arc::from(list);
        result
    }

    pub(crate) fn render_context(&self) -> RenderContext {
        lock(&self.render).context()
    }

    pub(crate) fn store_last_frame(&self, frame: FrameBuffer) {
        lock(&self.render).last_frame = Some(frame);
    }

    pub(crate) fn last_frame(&self) -> Option<FrameBuffer> {
        lock(&self.render).last_frame.clone()
    }

    pub(crate) fn attach(&self, scene: SceneHandle, camera: CameraHandle) {
        let mut render = lock(&self.render);
        render.scene = Some(scene);
        render.camera = Some(camera);
    }

    /// Detach and dispose scene and camera
    pub(crate) fn release_render(&self) {
        let mut render = lock(&self.render);
        if let Some(scene) = render.scene.take() {
            scene.dispose();
        }
        if let Some(camera) = render.camera.take() {
            camera.dispose();
        }
        render.last_frame = None;
    }

    pub(crate) fn snapshot(&self) -> ArSession {
        ArSession {
            id: self.id,
            filters: self.filters_snapshot().to_vec(),
            render: lock(&self.render).clone(),
        }
    }
}
