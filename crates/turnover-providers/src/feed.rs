//! FeedSource trait definition.
//!
//! This module defines the [`FeedSource`] trait, the seam between the engine
//! and wherever a unit's calendar export lives. The engine only ever asks for
//! the raw bytes behind a URL; parsing happens elsewhere.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};

/// A boxed future for async trait methods.
///
/// Boxed futures keep the trait object-safe so the engine can hold an
/// `Arc<dyn FeedSource>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Fetches the raw calendar data behind a feed URL.
///
/// # Implementation Notes
///
/// - Implementations should be `Send + Sync`; one fetch runs per unit,
///   concurrently
/// - Network, timeout and HTTP status failures are reported as
///   [`ProviderError`]s, never panics
pub trait FeedSource: Send + Sync {
    /// Returns the name of this source (e.g., "http").
    fn name(&self) -> &str;

    /// Fetches the feed behind `url`.
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, ProviderResult<Vec<u8>>>;
}

/// A feed source serving canned responses from memory.
///
/// Unknown URLs fail with an HTTP status error, like a 404 would. Every
/// request is counted so callers can check caching behaviour.
#[derive(Debug, Default)]
pub struct MemoryFeedSource {
    feeds: HashMap<String, Result<Vec<u8>, (ProviderErrorCode, String)>>,
    requests: Mutex<Vec<String>>,
}

impl MemoryFeedSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to serve `body` for `url`.
    pub fn with_feed(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.feeds.insert(url.into(), Ok(body.into()));
        self
    }

    /// Builder method to fail every fetch of `url`.
    pub fn with_error(mut self, url: impl Into<String>, error: ProviderError) -> Self {
        self.feeds
            .insert(url.into(), Err((error.code(), error.message().to_string())));
        self
    }

    /// The URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl FeedSource for MemoryFeedSource {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, ProviderResult<Vec<u8>>> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());

        // ProviderError is not Clone; rebuild it from its parts.
        let result = match self.feeds.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err((code, message))) => Err(ProviderError::new(*code, message.clone())),
            None => Err(ProviderError::http_status(format!("HTTP 404 for {}", url))),
        };
        Box::pin(async move { result })
    }
}

#[cfg(feature = "http")]
pub use self::http::{HttpFeedSource, HttpFeedSourceConfig, parse_feed_url};

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use reqwest::{Client, Response, StatusCode};
    use tracing::{debug, trace, warn};
    use url::Url;

    use super::{BoxFuture, FeedSource};
    use crate::error::{ProviderError, ProviderResult};

    /// Default timeout for HTTP requests.
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Default user agent.
    const DEFAULT_USER_AGENT: &str = concat!("turnover/", env!("CARGO_PKG_VERSION"));

    /// Settings for [`HttpFeedSource`].
    #[derive(Debug, Clone)]
    pub struct HttpFeedSourceConfig {
        /// Request timeout.
        pub timeout: Duration,
        /// User-Agent header sent with every request.
        pub user_agent: String,
    }

    impl Default for HttpFeedSourceConfig {
        fn default() -> Self {
            Self {
                timeout: DEFAULT_TIMEOUT,
                user_agent: DEFAULT_USER_AGENT.to_string(),
            }
        }
    }

    impl HttpFeedSourceConfig {
        /// Builder method to set the request timeout.
        pub fn with_timeout(mut self, timeout: Duration) -> Self {
            self.timeout = timeout;
            self
        }

        /// Builder method to set the user agent.
        pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
            self.user_agent = user_agent.into();
            self
        }
    }

    /// Fetches feeds over HTTP(S) with `reqwest`.
    #[derive(Debug, Clone)]
    pub struct HttpFeedSource {
        client: Client,
    }

    impl HttpFeedSource {
        /// Creates a new HTTP source.
        pub fn new(config: HttpFeedSourceConfig) -> ProviderResult<Self> {
            let client = Client::builder()
                .timeout(config.timeout)
                .user_agent(&config.user_agent)
                .build()
                .map_err(|e| {
                    ProviderError::configuration(format!("Failed to create HTTP client: {}", e))
                })?;

            Ok(Self { client })
        }

        async fn get(&self, url: &str) -> ProviderResult<Vec<u8>> {
            let url = parse_feed_url(url)?;
            debug!(host = url.host_str().unwrap_or_default(), path = url.path(), "Fetching feed");
            let response = self.client.get(url).send().await.map_err(map_send_error)?;
            self.handle_response(response).await
        }

        /// Handles the HTTP response, checking status codes.
        async fn handle_response(&self, response: Response) -> ProviderResult<Vec<u8>> {
            let status = response.status();
            trace!(status = %status, "Received response");

            match status {
                s if s.is_success() => response.bytes().await.map(|b| b.to_vec()).map_err(|e| {
                    ProviderError::invalid_response(format!("Failed to read response: {}", e))
                }),
                StatusCode::NOT_FOUND | StatusCode::GONE => {
                    warn!(status = %status, "Feed no longer exists");
                    Err(ProviderError::http_status(format!("HTTP {}", status)))
                }
                s => Err(ProviderError::http_status(format!("HTTP {}", s))),
            }
        }
    }

    impl FeedSource for HttpFeedSource {
        fn name(&self) -> &str {
            "http"
        }

        fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, ProviderResult<Vec<u8>>> {
            Box::pin(self.get(url))
        }
    }

    fn map_send_error(e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::timeout(format!("Request timed out: {}", e.without_url()))
        } else {
            ProviderError::network(format!("Request failed: {}", e.without_url()))
        }
    }

    /// Parses a feed URL, accepting only `http` and `https`.
    pub fn parse_feed_url(url: &str) -> ProviderResult<Url> {
        let parsed = Url::parse(url).map_err(|e| {
            ProviderError::configuration(format!("Invalid feed URL: {}", e)).with_source(e)
        })?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            other => Err(ProviderError::configuration(format!(
                "Unsupported feed URL scheme `{}`",
                other
            ))),
        }
    }

}
