// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the image acquisition cache

use futures::FutureExt;
use futures::future::BoxFuture;
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tryon::ImageCache;
use tryon::backends::ImageFetcher;
use tryon::cache::{CacheStatus, Resolution};
use tryon::config::CacheConfig;
use tryon::errors::CacheError;

const PLAIN_URL: &str = "http://img.example/a.png";
const CDN_URL: &str = "https://res.cloudinary.com/demo/image/upload/sample.png";
const CDN_PREVIEW_URL: &str = "https://res.cloudinary.com/demo/image/upload/w_64,q_30,c_limit/sample.png";

fn png(size: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(size, size, Rgba([200, 40, 40, 255]));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

/// Serves PNGs and records every URL it is asked for
struct MockFetcher {
    full: Arc<Vec<u8>>,
    preview: Arc<Vec<u8>>,
    calls: Mutex<Vec<String>>,
    failures: AtomicUsize,
    gate: Mutex<Option<(String, Arc<Notify>)>>,
}

impl MockFetcher {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            full: Arc::new(png(100)),
            preview: Arc::new(png(32)),
            calls: Mutex::new(Vec::new()),
            failures: AtomicUsize::new(0),
            gate: Mutex::new(None),
        })
    }

    /// Fetches of `url` wait until the returned notify fires
    fn gate(&self, url: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some((url.to_string(), Arc::clone(&notify)));
        notify
    }

    fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

impl ImageFetcher for MockFetcher {
    fn fetch(&self, url: &str) -> BoxFuture<'static, Result<Vec<u8>, CacheError>> {
        self.calls.lock().unwrap().push(url.to_string());

        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let gate = self
            .gate
            .lock()
            .unwrap()
            .as_ref()
            .filter(|(gated, _)| gated == url)
            .map(|(_, notify)| Arc::clone(notify));
        let body = if url.contains("w_64") {
            Arc::clone(&self.preview)
        } else if url.ends_with("/garbage") {
            Arc::new(b"not an image".to_vec())
        } else {
            Arc::clone(&self.full)
        };
        let url = url.to_string();

        async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            if failing {
                return Err(CacheError::Fetch {
                    url,
                    reason: "HTTP 503".into(),
                });
            }
            Ok(body.to_vec())
        }
        .boxed()
    }
}

fn cache_with(fetcher: &Arc<MockFetcher>) -> ImageCache {
    ImageCache::new(fetcher.clone(), CacheConfig::default())
}

/// Poll (in real time) until `check` holds
async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn test_fetches_once_within_ttl() {
    let fetcher = MockFetcher::new();
    let cache = cache_with(&fetcher);

    let first = cache.resolve(PLAIN_URL).await.unwrap();
    assert_eq!(first.resolution, Resolution::Full);
    assert_eq!((first.width, first.height), (100, 100));
    assert_eq!(first.format, Some(ImageFormat::Png));
    assert_eq!(cache.status(PLAIN_URL), Some(CacheStatus::Loaded));

    let second = cache.resolve(PLAIN_URL).await.unwrap();
    assert!(Arc::ptr_eq(&first.resource, &second.resource));
    assert_eq!(fetcher.calls_for(PLAIN_URL), 1);

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[tokio::test]
async fn test_expired_entry_is_refetched() {
    tokio::time::pause();
    let fetcher = MockFetcher::new();
    let cache = cache_with(&fetcher);

    cache.resolve(PLAIN_URL).await.unwrap();
    tokio::time::advance(Duration::from_secs(299)).await;
    cache.resolve(PLAIN_URL).await.unwrap();
    assert_eq!(fetcher.calls_for(PLAIN_URL), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(cache.status(PLAIN_URL), None);
    cache.resolve(PLAIN_URL).await.unwrap();
    assert_eq!(fetcher.calls_for(PLAIN_URL), 2);
    assert_eq!(cache.stats().evictions, 1);
}

#[tokio::test]
async fn test_purge_expired() {
    tokio::time::pause();
    let fetcher = MockFetcher::new();
    let cache = cache_with(&fetcher);

    cache.resolve(PLAIN_URL).await.unwrap();
    cache.resolve("http://img.example/b.png").await.unwrap();
    assert_eq!(cache.purge_expired(), 0);

    tokio::time::advance(Duration::from_secs(301)).await;
    assert_eq!(cache.purge_expired(), 2);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_miss_sweeps_entries_never_requested_again() {
    tokio::time::pause();
    let fetcher = MockFetcher::new();
    let cache = cache_with(&fetcher);

    for i in 0..20 {
        cache.resolve(&format!("http://img.example/{}.png", i)).await.unwrap();
    }
    assert_eq!(cache.len(), 20);

    tokio::time::advance(Duration::from_secs(301)).await;
    cache.resolve("http://img.example/fresh.png").await.unwrap();

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats().evictions, 20);
}

#[tokio::test]
async fn test_failed_load_is_evicted_and_retried_on_next_resolve() {
    let fetcher = MockFetcher::new();
    let cache = cache_with(&fetcher);
    fetcher.fail_next(1);

    let err = cache.resolve(PLAIN_URL).await.unwrap_err();
    assert!(matches!(err, CacheError::Fetch { .. }));
    assert!(err.is_retryable());
    assert_eq!(cache.status(PLAIN_URL), None);
    assert!(cache.is_empty());

    let handle = cache.resolve(PLAIN_URL).await.unwrap();
    assert_eq!(handle.width, 100);
    assert_eq!(fetcher.calls_for(PLAIN_URL), 2);
}

#[tokio::test]
async fn test_undecodable_body() {
    let fetcher = MockFetcher::new();
    let cache = cache_with(&fetcher);

    let err = cache.resolve("http://img.example/garbage").await.unwrap_err();
    assert!(matches!(err, CacheError::Decode { .. }));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_concurrent_resolves_share_one_fetch() {
    let fetcher = MockFetcher::new();
    let cache = cache_with(&fetcher);

    let (a, b) = tokio::join!(cache.resolve(PLAIN_URL), cache.resolve(PLAIN_URL));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert!(Arc::ptr_eq(&a.resource, &b.resource));
    assert_eq!(fetcher.calls_for(PLAIN_URL), 1);
    assert_eq!(cache.stats().coalesced, 1);
}

#[tokio::test]
async fn test_cdn_preview_wins_then_full_image_lands() {
    let fetcher = MockFetcher::new();
    let cache = cache_with(&fetcher);
    let gate = fetcher.gate(CDN_URL);

    let preview = cache.resolve(CDN_URL).await.unwrap();
    assert!(preview.is_low_res());
    assert_eq!(preview.width, 32);
    assert_eq!(cache.status(CDN_URL), Some(CacheStatus::Loading));
    assert_eq!(fetcher.calls_for(CDN_PREVIEW_URL), 1);

    eventually(|| cache.peek_low_res(CDN_URL).is_some()).await;

    gate.notify_one();
    eventually(|| cache.status(CDN_URL) == Some(CacheStatus::Loaded)).await;

    let full = cache.resolve(CDN_URL).await.unwrap();
    assert_eq!(full.resolution, Resolution::Full);
    assert_eq!(full.width, 100);
    assert_eq!(fetcher.calls_for(CDN_URL), 1);
    assert_eq!(cache.stats().fetches, 2);
}

#[tokio::test]
async fn test_cdn_rewrite_can_be_disabled() {
    let fetcher = MockFetcher::new();
    let config = CacheConfig {
        cdn_rewrite: false,
        ..CacheConfig::default()
    };
    let cache = ImageCache::new(fetcher.clone(), config);

    let handle = cache.resolve(CDN_URL).await.unwrap();
    assert_eq!(handle.resolution, Resolution::Full);
    assert_eq!(fetcher.calls_for(CDN_PREVIEW_URL), 0);
}

#[tokio::test]
async fn test_local_preview_is_downsampled_from_full_image() {
    let fetcher = MockFetcher::new();
    let cache = cache_with(&fetcher);

    let full = cache.resolve(PLAIN_URL).await.unwrap();
    assert!(!full.is_low_res());

    eventually(|| cache.peek_low_res(PLAIN_URL).is_some()).await;
    let preview = cache.peek_low_res(PLAIN_URL).unwrap();
    assert_eq!(preview.resolution, Resolution::Low);
    assert_eq!((preview.width, preview.height), (64, 64));
    assert_eq!(preview.format, Some(ImageFormat::Jpeg));
    assert_eq!(fetcher.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancelled_wait_leaves_load_running() {
    let fetcher = MockFetcher::new();
    let cache = cache_with(&fetcher);
    let gate = fetcher.gate(PLAIN_URL);

    let task = cache.resolve_task(PLAIN_URL);
    eventually(|| cache.status(PLAIN_URL) == Some(CacheStatus::Loading)).await;

    task.cancel();
    assert!(matches!(task.await, Err(CacheError::Cancelled)));

    gate.notify_one();
    eventually(|| cache.status(PLAIN_URL) == Some(CacheStatus::Loaded)).await;
    assert_eq!(fetcher.calls_for(PLAIN_URL), 1);
}

#[tokio::test]
async fn test_invalidate() {
    let fetcher = MockFetcher::new();
    let cache = cache_with(&fetcher);

    cache.resolve(PLAIN_URL).await.unwrap();
    assert!(cache.invalidate(PLAIN_URL));
    assert!(!cache.invalidate(PLAIN_URL));
    assert_eq!(cache.len(), 0);

    cache.resolve(PLAIN_URL).await.unwrap();
    assert_eq!(fetcher.calls_for(PLAIN_URL), 2);
}

#[tokio::test]
async fn test_shutdown_rejects_new_work() {
    let fetcher = MockFetcher::new();
    let cache = cache_with(&fetcher);

    cache.resolve(PLAIN_URL).await.unwrap();
    let clone = cache.clone();
    cache.shutdown();

    assert!(cache.is_empty());
    assert!(matches!(clone.resolve(PLAIN_URL).await, Err(CacheError::ShutDown)));
    assert_eq!(fetcher.calls_for(PLAIN_URL), 1);
}
