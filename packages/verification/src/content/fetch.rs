//! Page fetchers for the content-alignment layer.
//!
//! [`HttpPageFetcher`] handles static pages with plain reqwest.
//! [`FirecrawlFetcher`] delegates to a hosted headless-browser service for
//! pages that need JavaScript, passing the settle delay as `waitFor`.
//! [`FetchPool`] caps how many fetches run at once across a whole batch.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};
use crate::security::{SecretString, UrlValidator};

/// Agent string for page fetches.
pub const FETCH_USER_AGENT: &str =
    "CitationVerifierBot/1.0 (Academic Citation Verification)";

const FIRECRAWL_API_URL: &str = "https://api.firecrawl.dev/v1";

/// Raw page returned by a fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub html: String,
}

/// Fetch-and-render collaborator.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Load `url` within `timeout`, then wait `settle` for dynamic content
    /// where the backend supports it.
    async fn fetch(&self, url: &str, timeout: Duration, settle: Duration) -> FetchResult<FetchedPage>;
}

#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for Arc<T> {
    async fn fetch(&self, url: &str, timeout: Duration, settle: Duration) -> FetchResult<FetchedPage> {
        (**self).fetch(url, timeout, settle).await
    }
}

/// Static HTML fetcher. No JavaScript; `settle` is ignored.
pub struct HttpPageFetcher {
    client: reqwest::Client,
    validator: UrlValidator,
}

impl Default for HttpPageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpPageFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(FETCH_USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .unwrap_or_default();
        Self {
            client,
            validator: UrlValidator::new(),
        }
    }

    pub fn with_validator(mut self, validator: UrlValidator) -> Self {
        self.validator = validator;
        self
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str, timeout: Duration, _settle: Duration) -> FetchResult<FetchedPage> {
        self.validator.resolve(url).await?;
        debug!(url = %url, "fetching page");

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "page fetch failed");
                if e.is_timeout() {
                    FetchError::Timeout {
                        url: url.to_string(),
                    }
                } else {
                    FetchError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // Redirects may land somewhere the guard would refuse.
        let final_url = response.url().to_string();
        self.validator.check(&final_url)?;

        let html = response
            .text()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        Ok(FetchedPage {
            url: final_url,
            html,
        })
    }
}

#[derive(Serialize)]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: [&'a str; 1],
    #[serde(rename = "waitFor")]
    wait_for: u64,
    timeout: u64,
    #[serde(rename = "onlyMainContent")]
    only_main_content: bool,
}

#[derive(Deserialize)]
struct ScrapeResponse {
    success: bool,
    data: Option<ScrapeData>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ScrapeData {
    html: Option<String>,
}

/// Headless-browser rendering through the Firecrawl scrape API.
pub struct FirecrawlFetcher {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    validator: UrlValidator,
}

impl FirecrawlFetcher {
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: FIRECRAWL_API_URL.to_string(),
            validator: UrlValidator::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl PageFetcher for FirecrawlFetcher {
    async fn fetch(&self, url: &str, timeout: Duration, settle: Duration) -> FetchResult<FetchedPage> {
        // The service fetches on our behalf, but internal targets are still refused.
        self.validator.check(url)?;
        debug!(url = %url, "rendering page via firecrawl");

        let request = ScrapeRequest {
            url,
            formats: ["html"],
            wait_for: settle.as_millis() as u64,
            timeout: timeout.as_millis() as u64,
            only_main_content: false,
        };

        let response = self
            .client
            .post(format!("{}/scrape", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .timeout(timeout + settle + Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout {
                        url: url.to_string(),
                    }
                } else {
                    FetchError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "firecrawl scrape failed");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body: ScrapeResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Rendering(e.to_string()))?;

        if !body.success {
            return Err(FetchError::Rendering(
                body.error.unwrap_or_else(|| "scrape unsuccessful".to_string()),
            ));
        }

        let html = body
            .data
            .and_then(|d| d.html)
            .ok_or_else(|| FetchError::Rendering("no html in response".to_string()))?;

        Ok(FetchedPage {
            url: url.to_string(),
            html,
        })
    }
}

/// Bounds concurrent fetches with a semaphore. Fetching is the most
/// expensive step, so it gets its own limit independent of batch size.
pub struct FetchPool {
    inner: Arc<dyn PageFetcher>,
    permits: Arc<Semaphore>,
}

impl FetchPool {
    pub fn new(inner: Arc<dyn PageFetcher>, size: usize) -> Self {
        Self {
            inner,
            permits: Arc::new(Semaphore::new(size.max(1))),
        }
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

#[async_trait]
impl PageFetcher for FetchPool {
    async fn fetch(&self, url: &str, timeout: Duration, settle: Duration) -> FetchResult<FetchedPage> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| FetchError::Http("fetch pool closed".to_string()))?;
        self.inner.fetch(url, timeout, settle).await
    }
}
