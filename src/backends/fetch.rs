// SPDX-License-Identifier: GPL-3.0-only

//! Image source fetching
//!
//! The image cache only needs "bytes for this URL". Network transport is a
//! collaborator behind [`ImageFetcher`]; the HTTP implementation lives
//! behind the `http` cargo feature.

use crate::errors::CacheError;
use futures::future::BoxFuture;

/// Fetch the raw bytes behind a URL
pub trait ImageFetcher: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> BoxFuture<'static, Result<Vec<u8>, CacheError>>;
}

#[cfg(feature = "http")]
pub use http::HttpFetcher;

#[cfg(feature = "http")]
mod http {
    use super::ImageFetcher;
    use crate::constants::FETCH_TIMEOUT;
    use crate::errors::CacheError;
    use futures::FutureExt;
    use futures::future::BoxFuture;
    use tracing::debug;

    /// `reqwest`-based fetcher for `http(s)://` sources
    #[derive(Debug, Clone)]
    pub struct HttpFetcher {
        client: reqwest::Client,
    }

    impl HttpFetcher {
        pub fn new() -> Result<Self, CacheError> {
            let client = reqwest::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
                .map_err(|e| CacheError::TaskFailed(format!("HTTP client setup: {}", e)))?;
            Ok(Self { client })
        }
    }

    impl ImageFetcher for HttpFetcher {
        fn fetch(&self, url: &str) -> BoxFuture<'static, Result<Vec<u8>, CacheError>> {
            let client = self.client.clone();
            let url = url.to_string();

            async move {
                let fetch_err = |reason: String| CacheError::Fetch {
                    url: url.clone(),
                    reason,
                };

                let response = client.get(&url).send().await.map_err(|e| {
                    if e.is_timeout() {
                        fetch_err(format!("timed out after {:?}", FETCH_TIMEOUT))
                    } else {
                        fetch_err(e.to_string())
                    }
                })?;

                let status = response.status();
                if !status.is_success() {
                    return Err(fetch_err(format!("HTTP {}", status)));
                }

                let bytes = response.bytes().await.map_err(|e| fetch_err(e.to_string()))?;
                debug!(url = %url, bytes = bytes.len(), "Fetched image");
                Ok(bytes.to_vec())
            }
            .boxed()
        }
    }
}
