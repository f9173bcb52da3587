// SPDX-License-Identifier: GPL-3.0-only

//! Progressive image acquisition cache
//!
//! [`ImageCache::resolve`] turns a URL into a decoded image. A fresh URL
//! starts two loads at once: the full image, and a best-effort preview
//! (a small CDN rendition, or a local downsample of the full image). The
//! caller gets whichever relevant result lands first; when the preview wins
//! the full load keeps running in the background and fills the cache.
//!
//! ```text
//!            ┌──────── hit (age < TTL) ───────────────▶ full handle
//! resolve ───┤
//!            ├──────── loading ──▶ join in-flight load
//!            │
//!            └──────── miss ─────▶ fetch ─┬─▶ decode ──────▶ full
//!                                         └─▶ preview ─────▶ low
//! ```
//!
//! Entries are keyed by the raw URL string. Each load gets a generation id;
//! completions only touch an entry that still carries their generation, so
//! an eviction racing a late completion cannot resurrect stale data.
//!
//! A failed full load evicts its entry and rejects every waiter; the next
//! `resolve` starts over. Preview failures are swallowed.
//!
//! Every miss also sweeps expired entries, so URLs that are never asked
//! for again do not stay resident.

pub mod handle;
pub mod low_res;

pub use handle::{ImageHandle, Resolution};

use crate::backends::fetch::ImageFetcher;
use crate::config::CacheConfig;
use crate::errors::CacheError;
use crate::utils::lock;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

type FullLoad = Shared<BoxFuture<'static, Result<ImageHandle, CacheError>>>;
type LowLoad = Shared<BoxFuture<'static, Option<ImageHandle>>>;
type SharedBytes = Shared<BoxFuture<'static, Result<Arc<Vec<u8>>, CacheError>>>;

/// Observable state of a cached URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Loading,
    Loaded,
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Resolves answered from a loaded entry
    pub hits: u64,
    /// Resolves that started a new load
    pub misses: u64,
    /// Fetcher calls (full and preview)
    pub fetches: u64,
    /// Entries dropped for expiry, failure or invalidation
    pub evictions: u64,
    /// Resolves that joined an in-flight load
    pub coalesced: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
    evictions: AtomicU64,
    coalesced: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
        }
    }
}

enum EntryState {
    Loading {
        full: FullLoad,
        low: LowLoad,
        driver: AbortHandle,
    },
    Loaded {
        full: ImageHandle,
    },
}

struct CacheEntry {
    generation: u64,
    state: EntryState,
    /// Load start while loading, completion time once loaded
    timestamp: Instant,
    low_res: Option<ImageHandle>,
}

impl CacheEntry {
    fn is_loaded(&self) -> bool {
        matches!(self.state, EntryState::Loaded { .. })
    }

    fn abort_driver(&self) {
        if let EntryState::Loading { driver, .. } = &self.state {
            driver.abort();
        }
    }
}

struct CacheInner {
    fetcher: Arc<dyn ImageFetcher>,
    config: CacheConfig,
    entries: Mutex<HashMap<String, CacheEntry>>,
    next_generation: AtomicU64,
    stats: Arc<Counters>,
    shut_down: AtomicBool,
}

enum Lookup {
    Hit(ImageHandle),
    Pending {
        generation: u64,
        full: FullLoad,
        low: LowLoad,
    },
}

impl CacheInner {
    fn record_full(&self, url: &str, generation: u64, result: &Result<ImageHandle, CacheError>) {
        let mut entries = lock(&self.entries);
        match result {
            Ok(handle) => {
                if let Some(entry) = entries.get_mut(url)
                    && entry.generation == generation
                    && !entry.is_loaded()
                {
                    entry.state = EntryState::Loaded {
                        full: handle.clone(),
                    };
                    entry.timestamp = Instant::now();
                    debug!(
                        url,
                        width = handle.width,
                        height = handle.height,
                        bytes = handle.size_estimate,
                        "Image loaded"
                    );
                }
            }
            Err(e) => {
                if entries.get(url).is_some_and(|entry| entry.generation == generation) {
                    entries.remove(url);
                    Counters::bump(&self.stats.evictions);
                    warn!(url, error = %e, "Image load failed, entry evicted");
                }
            }
        }
    }

    /// Drop loaded entries older than `ttl`; loading entries are kept
    fn evict_expired(&self, entries: &mut HashMap<String, CacheEntry>, ttl: Duration) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| !(entry.is_loaded() && entry.timestamp.elapsed() >= ttl));
        let removed = before - entries.len();
        self.stats.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    fn record_low(&self, url: &str, generation: u64, handle: ImageHandle) {
        let mut entries = lock(&self.entries);
        if let Some(entry) = entries.get_mut(url)
            && entry.generation == generation
            && entry.low_res.is_none()
        {
            trace!(url, width = handle.width, height = handle.height, "Preview stored");
            entry.low_res = Some(handle);
        }
    }
}

/// Time-bounded, progressive image cache
///
/// Cloning is cheap; clones share the same entries.
#[derive(Clone)]
pub struct ImageCache {
    inner: Arc<CacheInner>,
}

impl ImageCache {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                fetcher,
                config,
                entries: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                stats: Arc::new(Counters::default()),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    /// Cache backed by the `reqwest` HTTP fetcher
    #[cfg(feature = "http")]
    pub fn with_http(config: CacheConfig) -> Result<Self, CacheError> {
        let fetcher = crate::backends::fetch::HttpFetcher::new()?;
        Ok(Self::new(Arc::new(fetcher), config))
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Resolve `url` to an image
    ///
    /// The result may be a low-resolution preview (see
    /// [`ImageHandle::resolution`]) when that arrives before the full image.
    pub async fn resolve(&self, url: &str) -> Result<ImageHandle, CacheError> {
        let (generation, full, low) = match self.lookup(url)? {
            Lookup::Hit(handle) => return Ok(handle),
            Lookup::Pending {
                generation,
                full,
                low,
            } => (generation, full, low),
        };

        tokio::select! {
            biased;
            result = full => {
                self.inner.record_full(url, generation, &result);
                result
            }
            Some(preview) = low => {
                debug!(url, "Preview ready before full image");
                Ok(preview)
            }
        }
    }

    /// Resolve on a background task, returning a cancellable handle
    pub fn resolve_task(&self, url: &str) -> LoadTask {
        let cache = self.clone();
        let url = url.to_string();
        LoadTask {
            handle: tokio::spawn(async move { cache.resolve(&url).await }),
        }
    }

    fn lookup(&self, url: &str) -> Result<Lookup, CacheError> {
        if self.inner.shut_down.load(Ordering::Acquire) {
            return Err(CacheError::ShutDown);
        }

        let ttl = self.inner.config.ttl();
        let mut entries = lock(&self.inner.entries);

        let stale = match entries.get(url) {
            None => false,
            Some(entry) => match &entry.state {
                EntryState::Loaded { full } if entry.timestamp.elapsed() < ttl => {
                    Counters::bump(&self.inner.stats.hits);
                    trace!(url, "Image cache hit");
                    return Ok(Lookup::Hit(full.clone()));
                }
                EntryState::Loaded { .. } => {
                    debug!(url, "Cached image expired");
                    true
                }
                // Failed but not yet recorded; never hand out a failed load
                EntryState::Loading { full, .. } if matches!(full.peek(), Some(Err(_))) => true,
                EntryState::Loading { full, low, .. } => {
                    Counters::bump(&self.inner.stats.coalesced);
                    trace!(url, "Joining in-flight image load");
                    return Ok(Lookup::Pending {
                        generation: entry.generation,
                        full: full.clone(),
                        low: low.clone(),
                    });
                }
            },
        };

        if stale {
            entries.remove(url);
            Counters::bump(&self.inner.stats.evictions);
        }

        // Misses are rare next to hits; sweep the rest of the map while locked
        let swept = self.inner.evict_expired(&mut entries, ttl);
        if swept > 0 {
            debug!(swept, "Evicted expired images");
        }

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        Counters::bump(&self.inner.stats.misses);
        let (full, low) = self.start_load(url);
        let driver = self.spawn_driver(url, generation, full.clone(), low.clone());

        entries.insert(
            url.to_string(),
            CacheEntry {
                generation,
                state: EntryState::Loading {
                    full: full.clone(),
                    low: low.clone(),
                    driver,
                },
                timestamp: Instant::now(),
                low_res: None,
            },
        );

        Ok(Lookup::Pending {
            generation,
            full,
            low,
        })
    }

    fn start_load(&self, url: &str) -> (FullLoad, LowLoad) {
        let config = &self.inner.config;
        debug!(url, "Starting image load");

        let bytes = fetch_shared(&self.inner.fetcher, &self.inner.stats, url.to_string());

        let full: FullLoad = {
            let url = url.to_string();
            async move {
                let bytes = bytes.await?;
                decode_blocking(url, bytes, Resolution::Full).await
            }
            .boxed()
            .shared()
        };

        let cdn_url = config
            .cdn_rewrite
            .then(|| low_res::cdn_rewrite(url, config.low_res_max_dimension, config.low_res_quality))
            .flatten();

        let low: LowLoad = match cdn_url {
            Some(cdn_url) => {
                let bytes = fetch_shared(&self.inner.fetcher, &self.inner.stats, cdn_url.clone());
                async move {
                    match bytes.await {
                        Ok(bytes) => decode_blocking(cdn_url, bytes, Resolution::Low).await.ok(),
                        Err(e) => {
                            debug!(error = %e, "CDN preview unavailable");
                            None
                        }
                    }
                }
                .boxed()
                .shared()
            }
            None => {
                let full = full.clone();
                let (max_dimension, quality) = (config.low_res_max_dimension, config.low_res_quality);
                let url = url.to_string();
                async move {
                    let source = full.await.ok()?;
                    let preview = tokio::task::spawn_blocking(move || {
                        let jpeg = low_res::downsample(&source.resource, max_dimension, quality)
                            .map_err(|e| CacheError::Decode {
                                url: url.clone(),
                                reason: e.to_string(),
                            })?;
                        ImageHandle::decode(&url, &jpeg, Resolution::Low)
                    })
                    .await;

                    match preview {
                        Ok(Ok(handle)) => Some(handle),
                        Ok(Err(e)) => {
                            debug!(error = %e, "Local preview failed");
                            None
                        }
                        Err(e) => {
                            debug!(error = %e, "Local preview task failed");
                            None
                        }
                    }
                }
                .boxed()
                .shared()
            }
        };

        (full, low)
    }

    /// Background task that records both results into the entry
    fn spawn_driver(&self, url: &str, generation: u64, full: FullLoad, low: LowLoad) -> AbortHandle {
        let inner: Weak<CacheInner> = Arc::downgrade(&self.inner);
        let url = url.to_string();

        let task = tokio::spawn(async move {
            let record_low = async {
                if let Some(handle) = low.await
                    && let Some(inner) = inner.upgrade()
                {
                    inner.record_low(&url, generation, handle);
                }
            };
            let record_full = async {
                let result = full.await;
                if let Some(inner) = inner.upgrade() {
                    inner.record_full(&url, generation, &result);
                }
            };
            futures::join!(record_low, record_full);
        });

        task.abort_handle()
    }

    /// Current state of `url`, `None` if absent or expired
    pub fn status(&self, url: &str) -> Option<CacheStatus> {
        let ttl = self.inner.config.ttl();
        let entries = lock(&self.inner.entries);
        let entry = entries.get(url)?;
        match &entry.state {
            EntryState::Loaded { .. } if entry.timestamp.elapsed() < ttl => Some(CacheStatus::Loaded),
            EntryState::Loaded { .. } => None,
            EntryState::Loading { full, .. } if matches!(full.peek(), Some(Err(_))) => None,
            EntryState::Loading { .. } => Some(CacheStatus::Loading),
        }
    }

    /// Preview stored for `url`, if one finished loading
    pub fn peek_low_res(&self, url: &str) -> Option<ImageHandle> {
        lock(&self.inner.entries).get(url)?.low_res.clone()
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let ttl = self.inner.config.ttl();
        let removed = self.inner.evict_expired(&mut lock(&self.inner.entries), ttl);
        if removed > 0 {
            debug!(removed, "Purged expired images");
        }
        removed
    }

    /// Forget `url`; an in-flight load stops filling the cache
    pub fn invalidate(&self, url: &str) -> bool {
        match lock(&self.inner.entries).remove(url) {
            Some(entry) => {
                entry.abort_driver();
                Counters::bump(&self.inner.stats.evictions);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.inner.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.inner.entries).is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.stats.snapshot()
    }

    /// Reject new resolves and drop every entry
    ///
    /// Callers already waiting on a load still get its result.
    pub fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut entries = lock(&self.inner.entries);
        for entry in entries.values() {
            entry.abort_driver();
        }
        let dropped = entries.len();
        entries.clear();
        info!(dropped, "Image cache shut down");
    }
}

/// One fetch of `url`, shareable between the full and preview paths
fn fetch_shared(fetcher: &Arc<dyn ImageFetcher>, stats: &Arc<Counters>, url: String) -> SharedBytes {
    let fetcher = Arc::clone(fetcher);
    let stats = Arc::clone(stats);
    async move {
        Counters::bump(&stats.fetches);
        fetcher.fetch(&url).await.map(Arc::new)
    }
    .boxed()
    .shared()
}

async fn decode_blocking(
    url: String,
    bytes: Arc<Vec<u8>>,
    resolution: Resolution,
) -> Result<ImageHandle, CacheError> {
    tokio::task::spawn_blocking(move || ImageHandle::decode(&url, &bytes, resolution))
        .await
        .map_err(|e| CacheError::TaskFailed(e.to_string()))?
}

/// A `resolve` running on its own task
///
/// Awaiting yields the resolve result. [`LoadTask::cancel`] stops waiting;
/// the shared load itself keeps going so the cache still fills.
pub struct LoadTask {
    handle: JoinHandle<Result<ImageHandle, CacheError>>,
}

impl LoadTask {
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Future for LoadTask {
    type Output = Result<ImageHandle, CacheError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(e)) if e.is_cancelled() => Poll::Ready(Err(CacheError::Cancelled)),
            Poll::Ready(Err(e)) => Poll::Ready(Err(CacheError::TaskFailed(e.to_string()))),
            Poll::Pending => Poll::Pending,
        }
    }
}
