//! Crossref works API client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{http_client, MetadataSource, WorkRecord, DEFAULT_USER_AGENT};
use crate::error::{ClientError, ClientResult};

const SERVICE: &str = "crossref";

/// Client for `GET /works/{doi}`.
pub struct CrossrefClient {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
    timeout: Duration,
}

impl Default for CrossrefClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CrossrefClient {
    pub fn new() -> Self {
        let timeout = Duration::from_secs(10);
        Self {
            client: http_client(DEFAULT_USER_AGENT, timeout),
            base_url: "https://api.crossref.org".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout,
        }
    }

    /// Point at a different host (tests, mirrors).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Identify with a contact address, as Crossref's etiquette asks.
    pub fn with_mailto(mut self, email: &str) -> Self {
        self.user_agent = format!(
            "CitationVerifier/1.0 (Academic Citation Verification; mailto:{})",
            email
        );
        self.client = http_client(&self.user_agent, self.timeout);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.client = http_client(&self.user_agent, timeout);
        self
    }
}

#[derive(Deserialize)]
struct Envelope {
    message: Work,
}

#[derive(Deserialize)]
struct Work {
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    author: Vec<Author>,
    #[serde(rename = "published-print")]
    published_print: Option<DateParts>,
    #[serde(rename = "published-online")]
    published_online: Option<DateParts>,
    issued: Option<DateParts>,
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
}

#[derive(Deserialize)]
struct Author {
    family: Option<String>,
    /// Organizational authors only carry `name`.
    name: Option<String>,
}

#[derive(Deserialize)]
struct DateParts {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Option<i32>>>,
}

impl DateParts {
    fn year(&self) -> Option<i32> {
        self.date_parts.first()?.first().copied().flatten()
    }
}

impl Work {
    fn into_record(self, doi: &str) -> WorkRecord {
        // Print date first; online-first and issued are fallbacks.
        let year = [&self.published_print, &self.published_online, &self.issued]
            .into_iter()
            .flatten()
            .find_map(DateParts::year);

        WorkRecord {
            doi: doi.to_string(),
            title: self.title.into_iter().next(),
            authors: self
                .author
                .into_iter()
                .filter_map(|a| a.family.or(a.name))
                .collect(),
            year,
            container_title: self.container_title.into_iter().next(),
        }
    }
}

#[async_trait]
impl MetadataSource for CrossrefClient {
    async fn work_by_doi(&self, doi: &str) -> ClientResult<WorkRecord> {
        let url = format!("{}/works/{}", self.base_url, doi);
        debug!(doi = %doi, "querying crossref");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(doi = %doi, status = status.as_u16(), "crossref lookup failed");
            return Err(ClientError::from_status(SERVICE, status.as_u16()));
        }

        let envelope: Envelope = response.json().await.map_err(|e| ClientError::Parse {
            service: SERVICE,
            message: e.to_string(),
        })?;

        Ok(envelope.message.into_record(doi))
    }
}
