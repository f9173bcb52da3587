// SPDX-License-Identifier: GPL-3.0-only

//! Offload execution context for filter passes
//!
//! Filter passes are CPU heavy and must not run on the async runtime's
//! worker threads. [`OffloadWorker`] owns a dedicated OS thread that receives
//! [`PipelineJob`]s over a channel and answers each one through a oneshot,
//! so the submitting task just awaits the reply.
//!
//! ```text
//! ┌──────────────┐  job (frame moved)  ┌────────────────────┐
//! │  Dispatcher  │ ──────────────────▶ │  tryon-offload     │
//! │ (async task) │ ◀────────────────── │  FilterPipeline    │
//! └──────────────┘   oneshot reply     └────────────────────┘
//! ```
//!
//! A panicking pass is caught on the worker and reported as
//! [`OffloadError::Panicked`]; the worker keeps serving later jobs.

use crate::backends::render::RenderContext;
use crate::errors::OffloadError;
use crate::media::frame::{FrameBuffer, LandmarkSet};
use crate::pipelines::filter::{Filter, FilterPipeline};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Everything one filter pass needs, owned so it can cross threads
#[derive(Debug, Clone)]
pub struct PipelineJob {
    pub frame: FrameBuffer,
    pub landmarks: Arc<[LandmarkSet]>,
    pub filters: Arc<[Filter]>,
    pub render: RenderContext,
}

/// Parallel execution context for filter passes
pub trait OffloadExecutor: Send + Sync {
    /// Run `job` off the calling task and resolve with the processed frame
    fn submit(&self, job: PipelineJob) -> BoxFuture<'static, Result<FrameBuffer, OffloadError>>;

    /// Whether the context can currently accept work
    fn is_available(&self) -> bool {
        true
    }

    /// Stop accepting work and release the context
    fn shutdown(&self) {}
}

type Reply = oneshot::Sender<Result<FrameBuffer, OffloadError>>;

struct Request {
    job: PipelineJob,
    reply: Reply,
}

/// Dedicated worker thread running filter passes
pub struct OffloadWorker {
    sender: Mutex<Option<mpsc::Sender<Request>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
    name: String,
}

impl OffloadWorker {
    /// Start the worker thread and wait until it is ready to take jobs
    pub fn spawn(name: &str, pipeline: Arc<FilterPipeline>) -> Result<Self, OffloadError> {
        let (sender, receiver) = mpsc::channel::<Request>();
        let (init_tx, init_rx) = mpsc::sync_channel::<()>(1);

        let thread = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                // Signal readiness before blocking on the queue
                let _ = init_tx.send(());
                worker_main(pipeline, receiver);
            })
            .map_err(|e| OffloadError::InitializationFailed(format!("Spawn worker thread: {}", e)))?;

        init_rx.recv().map_err(|_| {
            OffloadError::InitializationFailed("Worker thread died during initialization".to_string())
        })?;

        info!(thread = name, "Offload worker started");

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            thread: Mutex::new(Some(thread)),
            name: name.to_string(),
        })
    }
}

fn worker_main(pipeline: Arc<FilterPipeline>, receiver: mpsc::Receiver<Request>) {
    while let Ok(Request { job, reply }) = receiver.recv() {
        let result = catch_unwind(AssertUnwindSafe(|| pipeline.run(&job)));

        let result = match result {
            Ok(Ok(frame)) => Ok(frame),
            Ok(Err(e)) => Err(OffloadError::Pipeline(e)),
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                error!(panic = %msg, "Filter pass panicked on offload worker");
                Err(OffloadError::Panicked(msg))
            }
        };

        // Submitter may have gone away (superseded or dropped); nothing to do then
        if reply.send(result).is_err() {
            debug!("Offload reply dropped, submitter gone");
        }
    }
    debug!("Offload worker queue closed, exiting");
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl OffloadExecutor for OffloadWorker {
    fn submit(&self, job: PipelineJob) -> BoxFuture<'static, Result<FrameBuffer, OffloadError>> {
        let (reply, response) = oneshot::channel();

        let sent = crate::utils::lock(&self.sender)
            .as_ref()
            .map(|tx| tx.send(Request { job, reply }).is_ok())
            .unwrap_or(false);

        if !sent {
            return futures::future::ready(Err(OffloadError::Unavailable)).boxed();
        }

        async move {
            match response.await {
                Ok(result) => result,
                Err(_) => Err(OffloadError::Disconnected),
            }
        }
        .boxed()
    }

    fn is_available(&self) -> bool {
        crate::utils::lock(&self.sender).is_some()
    }

    fn shutdown(&self) {
        // Closing the queue ends the worker loop once pending jobs are done
        let had_sender = crate::utils::lock(&self.sender).take().is_some();

        if let Some(thread) = crate::utils::lock(&self.thread).take()
            && let Err(e) = thread.join()
        {
            error!("Offload worker thread panicked: {:?}", e);
        }

        if had_sender {
            info!(thread = %self.name, "Offload worker stopped");
        }
    }
}

impl Drop for OffloadWorker {
    fn drop(&mut self) {
        if self.is_available() {
            warn!(thread = %self.name, "Offload worker dropped without shutdown");
        }
        self.shutdown();
    }
}
