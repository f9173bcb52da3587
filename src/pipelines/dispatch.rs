// SPDX-License-Identifier: GPL-3.0-only

//! Per-frame dispatch between the offload worker and inline execution
//!
//! ```text
//! Received ──▶ no faces ─────────────────────────▶ Passthrough
//!    │
//!    ├──▶ Offloaded ──▶ ok ──────────────────────▶ Offloaded
//!    │        └──────▶ err ──▶ inline once ──▶ ok ▶ FellBack
//!    │                              └─────▶ err ──▶ FallbackFailed
//!    └──▶ no worker ──▶ inline ──────────────────▶ Inline
//! ```
//!
//! Submissions for one session are serialized. While a pass runs, at most
//! one newer frame matters: any submission that is overtaken while waiting
//! for the session is returned untouched as [`ExecutionPath::Superseded`]
//! and never reaches the session's last frame.

use crate::config::DispatchConfig;
use crate::errors::{DispatchError, OffloadError};
use crate::media::frame::{FrameBuffer, LandmarkSet};
use crate::pipelines::filter::FilterPipeline;
use crate::pipelines::offload::{OffloadExecutor, OffloadWorker, PipelineJob};
use crate::session::{ArSessionStore, SessionId};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// How a frame was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPath {
    /// No face in the frame, returned unchanged
    Passthrough,
    /// Processed on the offload worker
    Offloaded,
    /// Processed inline, no offload context configured
    Inline,
    /// Offload failed, processed inline instead
    FellBack,
    /// A newer frame for the same session arrived first; returned unchanged
    Superseded,
}

/// Result of one dispatched frame
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    pub frame: FrameBuffer,
    pub path: ExecutionPath,
}

pub struct FrameDispatcher {
    sessions: Arc<ArSessionStore>,
    pipeline: Arc<FilterPipeline>,
    executor: Option<Arc<dyn OffloadExecutor>>,
}

impl FrameDispatcher {
    /// Create a dispatcher, starting the offload worker if enabled
    ///
    /// A worker that fails to start is logged and the dispatcher runs every
    /// pass inline.
    pub fn new(
        config: &DispatchConfig,
        sessions: Arc<ArSessionStore>,
        pipeline: Arc<FilterPipeline>,
    ) -> Self {
        let executor: Option<Arc<dyn OffloadExecutor>> = if config.offload_enabled {
            match OffloadWorker::spawn(&config.worker_thread_name, Arc::clone(&pipeline)) {
                Ok(worker) => Some(Arc::new(worker)),
                Err(e) => {
                    warn!(error = %e, "Offload worker unavailable, filters will run inline");
                    None
                }
            }
        } else {
            info!("Offload disabled, filters will run inline");
            None
        };

        Self::with_executor(sessions, pipeline, executor)
    }

    /// Create a dispatcher around a caller-provided execution context
    pub fn with_executor(
        sessions: Arc<ArSessionStore>,
        pipeline: Arc<FilterPipeline>,
        executor: Option<Arc<dyn OffloadExecutor>>,
    ) -> Self {
        Self {
            sessions,
            pipeline,
            executor,
        }
    }

    pub fn sessions(&self) -> &Arc<ArSessionStore> {
        &self.sessions
    }

    pub fn has_offload(&self) -> bool {
        self.executor.as_ref().is_some_and(|e| e.is_available())
    }

    /// Stop the offload context; later frames run inline
    pub fn shutdown(&self) {
        if let Some(executor) = &self.executor {
            executor.shutdown();
        }
    }

    /// Composite the session's filters over `frame`
    ///
    /// Returns a frame on every offload failure as long as the inline
    /// fallback succeeds. On success the result becomes the session's last
    /// frame.
    ///
    /// Dropping the returned future while a frame is offloaded does not
    /// release the session early: the next pass waits for the worker's reply.
    pub async fn process(
        &self,
        id: &SessionId,
        frame: FrameBuffer,
        landmarks: Vec<LandmarkSet>,
    ) -> Result<ProcessedFrame, DispatchError> {
        let entry = self
            .sessions
            .entry(id)
            .ok_or(DispatchError::SessionNotFound(*id))?;

        let ticket = entry.next_ticket();
        let mut pass = entry.lock_pass().await;

        if !entry.is_latest(ticket) {
            trace!(session = %id, ticket, "Frame superseded before processing");
            return Ok(ProcessedFrame {
                frame,
                path: ExecutionPath::Superseded,
            });
        }

        if landmarks.is_empty() {
            trace!(session = %id, "No face detected, passing frame through");
            entry.store_last_frame(frame.clone());
            return Ok(ProcessedFrame {
                frame,
                path: ExecutionPath::Passthrough,
            });
        }

        let job = PipelineJob {
            frame,
            landmarks: Arc::from(landmarks),
            filters: entry.filters_snapshot(),
            render: entry.render_context(),
        };

        let (output, path) = match &self.executor {
            Some(executor) => {
                let offloaded = if executor.is_available() {
                    // Frame storage is shared, not copied; the job stays
                    // around only for a possible fallback
                    let pending = executor.submit(job.clone());
                    // The waiting task owns the session gate, so dropping
                    // this call cannot let another pass start before the
                    // worker replies
                    let waiter = tokio::spawn(async move { (pending.await, pass) });
                    match waiter.await {
                        Ok((result, gate)) => {
                            pass = gate;
                            result
                        }
                        Err(e) => {
                            pass = entry.lock_pass().await;
                            Err(OffloadError::Panicked(e.to_string()))
                        }
                    }
                } else {
                    Err(OffloadError::Unavailable)
                };

                match offloaded {
                    Ok(output) => (output, ExecutionPath::Offloaded),
                    Err(offload) => {
                        warn!(session = %id, error = %offload, "Offload failed, running filters inline");
                        match self.pipeline.run(&job) {
                            Ok(output) => (output, ExecutionPath::FellBack),
                            Err(fallback) => {
                                return Err(DispatchError::FallbackFailed { offload, fallback });
                            }
                        }
                    }
                }
            }
            None => (self.pipeline.run(&job)?, ExecutionPath::Inline),
        };

        entry.store_last_frame(output.clone());
        drop(pass);
        debug!(session = %id, ticket, path = ?path, "Frame processed");

        Ok(ProcessedFrame {
            frame: output,
            path,
        })
    }
}
