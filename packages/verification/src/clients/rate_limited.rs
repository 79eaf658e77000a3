//! Rate-limiting decorator for the registry clients.
//!
//! Uses the governor crate so bursts of batch traffic stay inside a
//! registry's published quota.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;

use super::{
    CitationNetworkSource, MetadataSource, NetworkRecord, PreprintRecord, PreprintSource,
    WorkRecord,
};
use crate::error::ClientResult;

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

pub struct RateLimited<S> {
    inner: S,
    limiter: Arc<DirectRateLimiter>,
}

impl<S> RateLimited<S> {
    /// Allow `requests_per_second` sustained requests (minimum 1).
    pub fn new(inner: S, requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(nonzero!(1u32));
        Self::with_quota(inner, Quota::per_second(rps))
    }

    pub fn with_quota(inner: S, quota: Quota) -> Self {
        Self {
            inner,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    async fn wait_for_permit(&self) {
        self.limiter.until_ready().await;
    }
}

#[async_trait]
impl<S: MetadataSource> MetadataSource for RateLimited<S> {
    async fn work_by_doi(&self, doi: &str) -> ClientResult<WorkRecord> {
        self.wait_for_permit().await;
        self.inner.work_by_doi(doi).await
    }
}

#[async_trait]
impl<S: PreprintSource> PreprintSource for RateLimited<S> {
    async fn preprint_by_id(&self, arxiv_id: &str) -> ClientResult<PreprintRecord> {
        self.wait_for_permit().await;
        self.inner.preprint_by_id(arxiv_id).await
    }
}

#[async_trait]
impl<S: CitationNetworkSource> CitationNetworkSource for RateLimited<S> {
    async fn network_by_doi(&self, doi: &str) -> ClientResult<NetworkRecord> {
        self.wait_for_permit().await;
        self.inner.network_by_doi(doi).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockNetworkSource;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn throttles_beyond_quota() {
        let source = MockNetworkSource::new().with_record(NetworkRecord {
            doi: "10.1000/a".into(),
            cited_by_count: 3,
            publication_year: Some(2020),
            author_count: 2,
        });
        let limited = RateLimited::new(source, 2);

        let start = Instant::now();
        for _ in 0..3 {
            limited.network_by_doi("10.1000/a").await.unwrap();
        }
        assert!(start.elapsed() >= Duration::from_millis(400));
    }
}
