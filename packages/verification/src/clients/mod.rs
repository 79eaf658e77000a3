//! External signal clients.
//!
//! Thin adapters over the bibliographic registries and the URL check. Each
//! one issues a single request per identifier, extracts a small fixed
//! field set, and returns a typed [`ClientError`](crate::error::ClientError)
//! on any failure. Mapping failures to verdicts is the layers' job.
//!
//! Clients compose with decorators: [`Cached`] memoizes successful lookups
//! and [`RateLimited`] enforces a request quota.

pub mod arxiv;
pub mod cached;
pub mod crossref;
pub mod openalex;
pub mod rate_limited;
pub mod url_check;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClientResult;

pub use arxiv::ArxivClient;
pub use cached::Cached;
pub use crossref::CrossrefClient;
pub use openalex::OpenAlexClient;
pub use rate_limited::RateLimited;
pub use url_check::{HttpUrlChecker, UrlCheck};

/// Descriptive agent string sent to every registry.
pub const DEFAULT_USER_AGENT: &str =
    "CitationVerifier/1.0 (Academic Citation Verification; mailto:verifier@localhost)";

/// Canonical record for a DOI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRecord {
    pub doi: String,
    pub title: Option<String>,
    /// Family names, in byline order.
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub container_title: Option<String>,
}

/// Canonical record for an arXiv id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprintRecord {
    pub arxiv_id: String,
    pub title: String,
    /// Full names as listed by arXiv.
    pub authors: Vec<String>,
    pub year: Option<i32>,
}

impl PreprintRecord {
    /// Last whitespace-separated token of each author name.
    pub fn surnames(&self) -> Vec<String> {
        self.authors
            .iter()
            .filter_map(|name| name.split_whitespace().last().map(str::to_string))
            .collect()
    }
}

/// Citation-network facts for a DOI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub doi: String,
    pub cited_by_count: u64,
    pub publication_year: Option<i32>,
    pub author_count: usize,
}

/// Response of a URL check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlStatus {
    pub url: String,
    pub status: u16,
    pub final_url: String,
}

/// Metadata registry lookup by DOI (Crossref).
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn work_by_doi(&self, doi: &str) -> ClientResult<WorkRecord>;
}

/// Preprint server lookup by id (arXiv).
#[async_trait]
pub trait PreprintSource: Send + Sync {
    async fn preprint_by_id(&self, arxiv_id: &str) -> ClientResult<PreprintRecord>;
}

/// Citation network lookup by DOI (OpenAlex).
#[async_trait]
pub trait CitationNetworkSource: Send + Sync {
    async fn network_by_doi(&self, doi: &str) -> ClientResult<NetworkRecord>;
}

/// Reachability check for a cited URL.
#[async_trait]
pub trait UrlChecker: Send + Sync {
    async fn check_url(&self, url: &str) -> ClientResult<UrlStatus>;
}

/// reqwest client with the registry timeout and agent string.
pub(crate) fn http_client(user_agent: &str, timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .unwrap_or_default()
}

#[async_trait]
impl<T: MetadataSource + ?Sized> MetadataSource for std::sync::Arc<T> {
    async fn work_by_doi(&self, doi: &str) -> ClientResult<WorkRecord> {
        (**self).work_by_doi(doi).await
    }
}

#[async_trait]
impl<T: PreprintSource + ?Sized> PreprintSource for std::sync::Arc<T> {
    async fn preprint_by_id(&self, arxiv_id: &str) -> ClientResult<PreprintRecord> {
        (**self).preprint_by_id(arxiv_id).await
    }
}

#[async_trait]
impl<T: CitationNetworkSource + ?Sized> CitationNetworkSource for std::sync::Arc<T> {
    async fn network_by_doi(&self, doi: &str) -> ClientResult<NetworkRecord> {
        (**self).network_by_doi(doi).await
    }
}
