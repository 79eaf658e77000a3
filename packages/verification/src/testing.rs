//! Testing utilities including mock implementations.
//!
//! Hand-written doubles for every external collaborator, so the engine can
//! be exercised without network access. Each records the calls it receives.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::ai::{Completion, CompletionProvider};
use crate::cache::CacheStore;
use crate::clients::{
    CitationNetworkSource, MetadataSource, NetworkRecord, PreprintRecord, PreprintSource,
    UrlChecker, UrlStatus, WorkRecord,
};
use crate::content::embedding::Embedder;
use crate::content::fetch::{FetchedPage, PageFetcher};
use crate::error::{
    CacheError, ClientError, ClientResult, EmbeddingError, FetchError, FetchResult, ProviderError,
};

/// Crossref stand-in. Unknown DOIs are `NotFound`.
#[derive(Default)]
pub struct MockMetadataSource {
    works: Arc<RwLock<HashMap<String, WorkRecord>>>,
    unreachable: bool,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockMetadataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_work(self, work: WorkRecord) -> Self {
        self.works.write().unwrap().insert(work.doi.clone(), work);
        self
    }

    /// Fail every lookup with a transport error.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// DOIs requested, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl MetadataSource for MockMetadataSource {
    async fn work_by_doi(&self, doi: &str) -> ClientResult<WorkRecord> {
        self.calls.write().unwrap().push(doi.to_string());
        if self.unreachable {
            return Err(ClientError::Transport {
                service: "crossref",
                message: "connection refused".into(),
            });
        }
        self.works
            .read()
            .unwrap()
            .get(doi)
            .cloned()
            .ok_or(ClientError::NotFound {
                service: "crossref",
                status: 404,
            })
    }
}

/// arXiv stand-in. Unknown ids are `NotFound`.
#[derive(Default)]
pub struct MockPreprintSource {
    preprints: Arc<RwLock<HashMap<String, PreprintRecord>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockPreprintSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preprint(self, preprint: PreprintRecord) -> Self {
        self.preprints
            .write()
            .unwrap()
            .insert(preprint.arxiv_id.clone(), preprint);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl PreprintSource for MockPreprintSource {
    async fn preprint_by_id(&self, arxiv_id: &str) -> ClientResult<PreprintRecord> {
        self.calls.write().unwrap().push(arxiv_id.to_string());
        self.preprints
            .read()
            .unwrap()
            .get(arxiv_id)
            .cloned()
            .ok_or(ClientError::NotFound {
                service: "arxiv",
                status: 404,
            })
    }
}

/// OpenAlex stand-in. Unknown DOIs are `NotFound`.
#[derive(Default)]
pub struct MockNetworkSource {
    records: Arc<RwLock<HashMap<String, NetworkRecord>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockNetworkSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, record: NetworkRecord) -> Self {
        self.records
            .write()
            .unwrap()
            .insert(record.doi.clone(), record);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl CitationNetworkSource for MockNetworkSource {
    async fn network_by_doi(&self, doi: &str) -> ClientResult<NetworkRecord> {
        self.calls.write().unwrap().push(doi.to_string());
        self.records
            .read()
            .unwrap()
            .get(doi)
            .cloned()
            .ok_or(ClientError::NotFound {
                service: "openalex",
                status: 404,
            })
    }
}

/// URL check stand-in. Answers 200 unless told otherwise.
#[derive(Default)]
pub struct MockUrlChecker {
    statuses: Arc<RwLock<HashMap<String, u16>>>,
    unreachable: Arc<RwLock<Vec<String>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockUrlChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(self, url: impl Into<String>, status: u16) -> Self {
        self.statuses.write().unwrap().insert(url.into(), status);
        self
    }

    /// Simulate a network failure for `url`.
    pub fn with_unreachable(self, url: impl Into<String>) -> Self {
        self.unreachable.write().unwrap().push(url.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl UrlChecker for MockUrlChecker {
    async fn check_url(&self, url: &str) -> ClientResult<UrlStatus> {
        self.calls.write().unwrap().push(url.to_string());
        if self.unreachable.read().unwrap().iter().any(|u| u == url) {
            return Err(ClientError::Transport {
                service: "url",
                message: "dns error: no such host".into(),
            });
        }
        let status = self.statuses.read().unwrap().get(url).copied().unwrap_or(200);
        Ok(UrlStatus {
            url: url.to_string(),
            status,
            final_url: url.to_string(),
        })
    }
}

/// Page fetcher stand-in. Unknown URLs answer 404.
#[derive(Default)]
pub struct MockPageFetcher {
    pages: Arc<RwLock<HashMap<String, String>>>,
    delay: Option<Duration>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockPageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.write().unwrap().insert(url.into(), html.into());
        self
    }

    /// Sleep before answering, to exercise deadlines.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for MockPageFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration, _settle: Duration) -> FetchResult<FetchedPage> {
        self.calls.write().unwrap().push(url.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let html = self.pages.read().unwrap().get(url).cloned();
        match html {
            Some(html) => Ok(FetchedPage {
                url: url.to_string(),
                html,
            }),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// Embedder stand-in.
pub struct MockEmbedder {
    fail: bool,
}

impl MockEmbedder {
    /// Same vector for every text, so any pair has similarity 1.0.
    pub fn uniform() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if self.fail {
            return Err(EmbeddingError::Request("model unavailable".into()));
        }
        Ok(vec![0.6, 0.8, 0.0])
    }

    fn name(&self) -> &str {
        "mock-embedder"
    }
}

/// Completion provider stand-in.
pub struct MockProvider {
    name: &'static str,
    answer: Option<String>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockProvider {
    pub fn answering(name: &'static str, answer: impl Into<String>) -> Self {
        Self {
            name,
            answer: Some(answer.into()),
            calls: Arc::default(),
        }
    }

    pub fn failing(name: &'static str) -> Self {
        Self {
            name,
            answer: None,
            calls: Arc::default(),
        }
    }

    /// Prompts received, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<Completion, ProviderError> {
        self.calls.write().unwrap().push(prompt.to_string());
        match &self.answer {
            Some(text) => Ok(Completion {
                text: text.clone(),
                model: format!("{}-mock", self.name),
                tokens: None,
            }),
            None => Err(ProviderError::Status {
                provider: self.name,
                status: 503,
                body: "service unavailable".into(),
            }),
        }
    }
}

/// Cache store whose every operation fails, like an unreachable remote.
pub struct FailingCacheStore;

#[async_trait]
impl CacheStore for FailingCacheStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    fn backend(&self) -> &'static str {
        "failing"
    }
}
