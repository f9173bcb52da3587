// SPDX-License-Identifier: MPL-2.0

//! Error types for the try-on core
//!
//! Expected states (no face in frame, missing render context, missing filter
//! settings, unknown filter types) are not errors and never show up here.
//! Only conditions that a caller has to react to are modelled.

use crate::session::SessionId;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Top-level error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Malformed frame buffer
    Frame(FrameError),
    /// Session management errors
    Session(SessionError),
    /// Frame processing failed on every execution path
    Dispatch(DispatchError),
    /// Image acquisition errors
    Cache(CacheError),
    /// Configuration errors
    Config(String),
    /// Filesystem errors
    Io(String),
}

/// Frame buffer construction errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Pixel data does not hold exactly width * height RGBA pixels
    InvalidLength {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    /// Image could not be decoded or encoded
    Image(String),
}

/// Errors reported by the external render collaborators
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Head pose could not be estimated from the landmarks
    PoseEstimation(String),
    /// Offscreen surface could not be acquired
    SurfaceUnavailable(String),
    /// Rendered surface does not match the frame dimensions
    SurfaceSize {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    /// Scene render call failed
    RenderFailed(String),
}

/// Errors raised by a single filter pipeline pass
#[derive(Debug, Clone)]
pub enum PipelineError {
    /// A filter step failed while talking to a render collaborator
    Render { filter_id: String, error: RenderError },
}

/// Errors raised by the offload execution context
#[derive(Debug, Clone)]
pub enum OffloadError {
    /// No offload context is running
    Unavailable,
    /// The offload context could not be started
    InitializationFailed(String),
    /// The offload context went away before replying
    Disconnected,
    /// The pipeline panicked inside the offload context
    Panicked(String),
    /// The pipeline returned an error inside the offload context
    Pipeline(PipelineError),
}

/// Frame dispatch errors surfaced to callers
#[derive(Debug, Clone)]
pub enum DispatchError {
    /// No session with this id
    SessionNotFound(SessionId),
    /// Inline processing failed (no offload attempt was made)
    Pipeline(PipelineError),
    /// Offload failed and the single inline fallback failed as well
    FallbackFailed {
        offload: OffloadError,
        fallback: PipelineError,
    },
}

/// Session store errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No session with this id
    NotFound(SessionId),
    /// Session has no filter with this id
    FilterNotFound { session: SessionId, filter: String },
    /// Session already has a filter with this id
    DuplicateFilter { session: SessionId, filter: String },
}

/// Image acquisition errors
///
/// Cloneable so a single failed load can be reported to every coalesced waiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Network or source fetch failed
    Fetch { url: String, reason: String },
    /// Fetched bytes are not a decodable image
    Decode { url: String, reason: String },
    /// The load task was cancelled by its owner
    Cancelled,
    /// The cache has been shut down
    ShutDown,
    /// The load task failed unexpectedly
    TaskFailed(String),
}

impl CacheError {
    /// Whether a fresh `resolve` of the same URL could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, CacheError::Fetch { .. } | CacheError::Cancelled)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Frame(e) => write!(f, "Frame error: {}", e),
            AppError::Session(e) => write!(f, "Session error: {}", e),
            AppError::Dispatch(e) => write!(f, "Frame processing error: {}", e),
            AppError::Cache(e) => write!(f, "Image cache error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::InvalidLength {
                width,
                height,
                expected,
                actual,
            } => write!(
                f,
                "{}x{} RGBA frame needs {} bytes, got {}",
                width, height, expected, actual
            ),
            FrameError::Image(msg) => write!(f, "Image conversion failed: {}", msg),
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::PoseEstimation(msg) => write!(f, "Pose estimation failed: {}", msg),
            RenderError::SurfaceUnavailable(msg) => write!(f, "Surface unavailable: {}", msg),
            RenderError::SurfaceSize { expected, actual } => write!(
                f,
                "Surface is {}x{}, frame is {}x{}",
                actual.0, actual.1, expected.0, expected.1
            ),
            RenderError::RenderFailed(msg) => write!(f, "Render failed: {}", msg),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Render { filter_id, error } => {
                write!(f, "Filter '{}' failed: {}", filter_id, error)
            }
        }
    }
}

impl fmt::Display for OffloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OffloadError::Unavailable => write!(f, "Offload worker not available"),
            OffloadError::InitializationFailed(msg) => {
                write!(f, "Offload worker failed to start: {}", msg)
            }
            OffloadError::Disconnected => write!(f, "Offload worker disconnected"),
            OffloadError::Panicked(msg) => write!(f, "Offload worker panicked: {}", msg),
            OffloadError::Pipeline(e) => write!(f, "{}", e),
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::SessionNotFound(id) => write!(f, "Session {} not found", id),
            DispatchError::Pipeline(e) => write!(f, "{}", e),
            DispatchError::FallbackFailed { offload, fallback } => write!(
                f,
                "Offload failed ({}) and inline fallback failed ({})",
                offload, fallback
            ),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotFound(id) => write!(f, "Session {} not found", id),
            SessionError::FilterNotFound { session, filter } => {
                write!(f, "Filter '{}' not found in session {}", filter, session)
            }
            SessionError::DuplicateFilter { session, filter } => {
                write!(f, "Filter '{}' already exists in session {}", filter, session)
            }
        }
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Fetch { url, reason } => write!(f, "Failed to fetch {}: {}", url, reason),
            CacheError::Decode { url, reason } => {
                write!(f, "Failed to decode {}: {}", url, reason)
            }
            CacheError::Cancelled => write!(f, "Image load cancelled"),
            CacheError::ShutDown => write!(f, "Image cache is shut down"),
            CacheError::TaskFailed(msg) => write!(f, "Image load task failed: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for FrameError {}
impl std::error::Error for RenderError {}
impl std::error::Error for PipelineError {}
impl std::error::Error for OffloadError {}
impl std::error::Error for DispatchError {}
impl std::error::Error for SessionError {}
impl std::error::Error for CacheError {}

// Conversions from sub-errors to AppError
impl From<FrameError> for AppError {
    fn from(err: FrameError) -> Self {
        AppError::Frame(err)
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Session(err)
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        AppError::Dispatch(err)
    }
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        AppError::Cache(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<image::ImageError> for FrameError {
    fn from(err: image::ImageError) -> Self {
        FrameError::Image(err.to_string())
    }
}

impl From<PipelineError> for OffloadError {
    fn from(err: PipelineError) -> Self {
        OffloadError::Pipeline(err)
    }
}

impl From<PipelineError> for DispatchError {
    fn from(err: PipelineError) -> Self {
        DispatchError::Pipeline(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_error_retryable() {
        let fetch = CacheError::Fetch {
            url: "http://img/a.png".into(),
            reason: "timeout".into(),
        };
        assert!(fetch.is_retryable());
        assert!(!CacheError::ShutDown.is_retryable());
    }

    #[test]
    fn test_fallback_failure_mentions_both_paths() {
        let pipeline = PipelineError::Render {
            filter_id: "hair-1".into(),
            error: RenderError::RenderFailed("lost context".into()),
        };
        let err = DispatchError::FallbackFailed {
            offload: OffloadError::Disconnected,
            fallback: pipeline,
        };
        let msg = err.to_string();
        assert!(msg.contains("disconnected"));
        assert!(msg.contains("hair-1"));
    }
}
