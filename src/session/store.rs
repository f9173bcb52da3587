// SPDX-License-Identifier: GPL-3.0-only

//! AR session store

use super::types::{ArSession, SessionEntry, SessionId};
use crate::backends::render::{CameraHandle, SceneHandle};
use crate::errors::SessionError;
use crate::media::frame::FrameBuffer;
use crate::pipelines::filter::Filter;
use crate::utils::{read, write};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Owner of every active AR session
///
/// Sessions live until [`ArSessionStore::end`]; there is no idle timeout.
/// Filter edits are safe while frames are in flight: a pass works on the
/// filter list as it was when the pass started.
#[derive(Debug, Default)]
pub struct ArSessionStore {
    sessions: RwLock<HashMap<SessionId, Arc<SessionEntry>>>,
}

impl ArSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session with no filters and an empty render state
    pub fn create(&self) -> SessionId {
        let id = SessionId::new();
        write(&self.sessions).insert(id, Arc::new(SessionEntry::new(id)));
        info!(session = %id, "AR session created");
        id
    }

    pub fn get(&self, id: &SessionId) -> Option<ArSession> {
        self.entry(id).map(|entry| entry.snapshot())
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        read(&self.sessions).contains_key(id)
    }

    pub fn len(&self) -> usize {
        read(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.sessions).is_empty()
    }

    pub fn list(&self) -> Vec<SessionId> {
        read(&self.sessions).keys().copied().collect()
    }

    pub(crate) fn entry(&self, id: &SessionId) -> Option<Arc<SessionEntry>> {
        read(&self.sessions).get(id).cloned()
    }

    fn require(&self, id: &SessionId) -> Result<Arc<SessionEntry>, SessionError> {
        self.entry(id).ok_or(SessionError::NotFound(*id))
    }

    /// Output of the session's most recent completed frame
    pub fn last_frame(&self, id: &SessionId) -> Result<Option<FrameBuffer>, SessionError> {
        Ok(self.require(id)?.last_frame())
    }

    /// Append a filter to the end of the session's list
    pub fn add_filter(&self, id: &SessionId, filter: Filter) -> Result<(), SessionError> {
        let entry = self.require(id)?;
        entry.edit_filters(|list| {
            if list.iter().any(|f| f.id == filter.id) {
                return Err(SessionError::DuplicateFilter {
                    session: *id,
                    filter: filter.id.clone(),
                });
            }
            debug!(session = %id, filter = %filter.id, kind = %filter.kind, "Filter added");
            list.push(filter);
            Ok(())
        })
    }

    /// Replace a filter in place, keeping its position in the list
    pub fn update_filter(&self, id: &SessionId, filter: Filter) -> Result<(), SessionError> {
        let entry = self.require(id)?;
        entry.edit_filters(|list| {
            let slot = list.iter_mut().find(|f| f.id == filter.id).ok_or_else(|| {
                SessionError::FilterNotFound {
                    session: *id,
                    filter: filter.id.clone(),
                }
            })?;
            debug!(session = %id, filter = %filter.id, "Filter updated");
            *slot = filter;
            Ok(())
        })
    }

    /// Remove a filter and return it
    pub fn remove_filter(&self, id: &SessionId, filter_id: &str) -> Result<Filter, SessionError> {
        let entry = self.require(id)?;
        entry.edit_filters(|list| {
            let pos = list.iter().position(|f| f.id == filter_id).ok_or_else(|| {
                SessionError::FilterNotFound {
                    session: *id,
                    filter: filter_id.to_string(),
                }
            })?;
            debug!(session = %id, filter = filter_id, "Filter removed");
            Ok(list.remove(pos))
        })
    }

    /// Current filter list, in application order
    pub fn filters(&self, id: &SessionId) -> Result<Vec<Filter>, SessionError> {
        Ok(self.require(id)?.filters_snapshot().to_vec())
    }

    /// Attach the scene and camera used by hair filters
    pub fn attach_render_context(
        &self,
        id: &SessionId,
        scene: SceneHandle,
        camera: CameraHandle,
    ) -> Result<(), SessionError> {
        self.require(id)?.attach(scene, camera);
        debug!(session = %id, "Render context attached");
        Ok(())
    }

    /// End a session: dispose its scene and camera and forget it
    pub fn end(&self, id: &SessionId) -> Result<(), SessionError> {
        let entry = write(&self.sessions)
            .remove(id)
            .ok_or(SessionError::NotFound(*id))?;
        entry.release_render();
        info!(session = %entry.id(), "AR session ended");
        Ok(())
    }
}
