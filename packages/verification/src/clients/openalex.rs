//! OpenAlex works API client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{http_client, CitationNetworkSource, NetworkRecord, DEFAULT_USER_AGENT};
use crate::error::{ClientError, ClientResult};

const SERVICE: &str = "openalex";

/// Client for `GET /works/doi:{doi}`.
pub struct OpenAlexClient {
    client: reqwest::Client,
    base_url: String,
    mailto: Option<String>,
}

impl Default for OpenAlexClient {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAlexClient {
    pub fn new() -> Self {
        Self {
            client: http_client(DEFAULT_USER_AGENT, Duration::from_secs(10)),
            base_url: "https://api.openalex.org".to_string(),
            mailto: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Join the polite pool.
    pub fn with_mailto(mut self, email: impl Into<String>) -> Self {
        self.mailto = Some(email.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(DEFAULT_USER_AGENT, timeout);
        self
    }
}

#[derive(Deserialize)]
struct Work {
    #[serde(default)]
    cited_by_count: u64,
    publication_year: Option<i32>,
    #[serde(default)]
    authorships: Vec<serde_json::Value>,
}

#[async_trait]
impl CitationNetworkSource for OpenAlexClient {
    async fn network_by_doi(&self, doi: &str) -> ClientResult<NetworkRecord> {
        let url = format!("{}/works/doi:{}", self.base_url, doi);
        debug!(doi = %doi, "querying openalex");

        let mut request = self.client.get(&url);
        if let Some(mailto) = &self.mailto {
            request = request.query(&[("mailto", mailto)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(doi = %doi, status = status.as_u16(), "openalex lookup failed");
            return Err(ClientError::from_status(SERVICE, status.as_u16()));
        }

        let work: Work = response.json().await.map_err(|e| ClientError::Parse {
            service: SERVICE,
            message: e.to_string(),
        })?;

        Ok(NetworkRecord {
            doi: doi.to_string(),
            cited_by_count: work.cited_by_count,
            publication_year: work.publication_year,
            author_count: work.authorships.len(),
        })
    }
}
