//! Caching decorator for the registry clients.

use std::time::Duration;

use async_trait::async_trait;

use super::{
    CitationNetworkSource, MetadataSource, NetworkRecord, PreprintRecord, PreprintSource,
    WorkRecord,
};
use crate::cache::Cache;
use crate::error::ClientResult;

/// Wraps a client so successful lookups are memoized for `ttl`.
///
/// Failures are never cached, so a registry outage does not outlive itself.
pub struct Cached<S> {
    inner: S,
    cache: Cache,
    ttl: Duration,
}

impl<S> Cached<S> {
    pub fn new(inner: S, cache: Cache, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }

    /// The undecorated client, for cache-bypassing calls.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: MetadataSource> MetadataSource for Cached<S> {
    async fn work_by_doi(&self, doi: &str) -> ClientResult<WorkRecord> {
        let key = Cache::make_key("crossref", &[doi]);
        self.cache
            .get_or_fetch(&key, self.ttl, || self.inner.work_by_doi(doi))
            .await
    }
}

#[async_trait]
impl<S: PreprintSource> PreprintSource for Cached<S> {
    async fn preprint_by_id(&self, arxiv_id: &str) -> ClientResult<PreprintRecord> {
        let key = Cache::make_key("arxiv", &[arxiv_id]);
        self.cache
            .get_or_fetch(&key, self.ttl, || self.inner.preprint_by_id(arxiv_id))
            .await
    }
}

#[async_trait]
impl<S: CitationNetworkSource> CitationNetworkSource for Cached<S> {
    async fn network_by_doi(&self, doi: &str) -> ClientResult<NetworkRecord> {
        let key = Cache::make_key("openalex", &[doi]);
        self.cache
            .get_or_fetch(&key, self.ttl, || self.inner.network_by_doi(doi))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::testing::MockMetadataSource;

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let source = MockMetadataSource::new().with_work(WorkRecord {
            doi: "10.1000/xyz".into(),
            title: Some("A paper".into()),
            authors: vec!["Smith".into()],
            year: Some(2019),
            container_title: None,
        });
        let cached = Cached::new(source, Cache::memory(100), Duration::from_secs(60));

        let first = cached.work_by_doi("10.1000/xyz").await.unwrap();
        let second = cached.work_by_doi("10.1000/xyz").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(cached.inner().calls(), vec!["10.1000/xyz"]);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let source = MockMetadataSource::new();
        let cached = Cached::new(source, Cache::memory(100), Duration::from_secs(60));

        for _ in 0..2 {
            let err = cached.work_by_doi("10.1000/missing").await.unwrap_err();
            assert!(matches!(err, ClientError::NotFound { .. }));
        }
        assert_eq!(cached.inner().calls().len(), 2);
    }
}
