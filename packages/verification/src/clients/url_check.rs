//! Reachability check for URLs cited directly.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{http_client, UrlChecker, UrlStatus, DEFAULT_USER_AGENT};
use crate::error::{ClientError, ClientResult};
use crate::security::UrlValidator;

const SERVICE: &str = "url";

/// GETs the URL after the SSRF guard approves it. Any HTTP status counts
/// as an answer; only transport failures are errors.
pub struct HttpUrlChecker {
    client: reqwest::Client,
    validator: UrlValidator,
}

impl Default for HttpUrlChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpUrlChecker {
    pub fn new() -> Self {
        Self {
            client: http_client(DEFAULT_USER_AGENT, Duration::from_secs(10)),
            validator: UrlValidator::new(),
        }
    }

    pub fn with_validator(mut self, validator: UrlValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(DEFAULT_USER_AGENT, timeout);
        self
    }
}

#[async_trait]
impl UrlChecker for HttpUrlChecker {
    async fn check_url(&self, url: &str) -> ClientResult<UrlStatus> {
        self.validator.resolve(url).await?;
        debug!(url = %url, "checking cited url");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(SERVICE, e))?;

        Ok(UrlStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
            final_url: response.url().to_string(),
        })
    }
}

/// Interpretation of a reachability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlCheck {
    /// 2xx/3xx
    Reachable { status: u16 },
    /// The server answered but refused us (401, 403, 405, 429)
    Restricted { status: u16 },
    /// Network failure, an unresolvable host, or a status meaning the
    /// document is gone
    Broken { reason: String },
    /// The SSRF guard refused to contact the host on policy grounds
    Blocked { reason: String },
}

impl UrlCheck {
    pub fn classify(outcome: &ClientResult<UrlStatus>) -> Self {
        match outcome {
            Ok(status) => match status.status {
                200..=399 => Self::Reachable {
                    status: status.status,
                },
                401 | 403 | 405 | 429 => Self::Restricted {
                    status: status.status,
                },
                code => Self::Broken {
                    reason: format!("URL returned HTTP {}", code),
                },
            },
            Err(ClientError::Blocked(e)) if e.is_policy_denial() => Self::Blocked {
                reason: e.to_string(),
            },
            Err(e) => Self::Broken {
                reason: e.to_string(),
            },
        }
    }

    /// True when the citation should short-circuit to `url_broken`.
    pub fn is_broken(&self) -> bool {
        matches!(self, Self::Broken { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SecurityError;

    fn answered(status: u16) -> ClientResult<UrlStatus> {
        Ok(UrlStatus {
            url: "https://doi.org/x".into(),
            status,
            final_url: "https://doi.org/x".into(),
        })
    }

    #[test]
    fn classification() {
        assert_eq!(
            UrlCheck::classify(&answered(200)),
            UrlCheck::Reachable { status: 200 }
        );
        assert_eq!(
            UrlCheck::classify(&answered(403)),
            UrlCheck::Restricted { status: 403 }
        );
        assert!(UrlCheck::classify(&answered(404)).is_broken());
        assert!(UrlCheck::classify(&answered(502)).is_broken());
        assert!(UrlCheck::classify(&Err(ClientError::Timeout { service: "url" })).is_broken());

        let blocked = UrlCheck::classify(&Err(ClientError::Blocked(SecurityError::NoHost)));
        assert!(matches!(blocked, UrlCheck::Blocked { .. }));
        assert!(!blocked.is_broken());

        let dead = UrlCheck::classify(&Err(ClientError::Blocked(SecurityError::Unresolvable {
            host: "gone.invalid".into(),
            reason: "no such host".into(),
        })));
        assert!(dead.is_broken());
    }

    #[tokio::test]
    async fn unresolvable_host_is_broken() {
        let outcome = HttpUrlChecker::new()
            .check_url("https://no-such-host.invalid/paper")
            .await;
        assert!(UrlCheck::classify(&outcome).is_broken());
    }

    #[tokio::test]
    async fn internal_hosts_are_refused() {
        let checker = HttpUrlChecker::new();
        let err = checker.check_url("http://127.0.0.1:1/admin").await.unwrap_err();
        assert!(matches!(err, ClientError::Blocked(_)));
    }
}
