//! Typed errors for the verification engine.
//!
//! Uses `thiserror` for library errors (not `anyhow`). Only input errors
//! escape the engine; everything else is caught at a layer boundary and
//! encoded into that layer's `LayerResult`.

use thiserror::Error;

/// Input errors reported to the caller before any work is scheduled.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// Citation text is empty after trimming
    #[error("citation text is empty")]
    EmptyCitation,

    /// Citation text exceeds the configured limit
    #[error("citation is too long: {len} characters (max {max})")]
    CitationTooLong { len: usize, max: usize },

    /// Free text is empty after trimming
    #[error("text is empty")]
    EmptyText,

    /// Free text exceeds the configured limit
    #[error("text is too long: {len} characters (max {max})")]
    TextTooLong { len: usize, max: usize },

    /// Batch or document carries more citations than allowed
    #[error("too many citations: {count} (max {max})")]
    TooManyCitations { count: usize, max: usize },

    /// Text contained no recognizable citations
    #[error("no citations found in text")]
    NoCitationsFound,
}

/// Failures of an external signal client (registries and the URL check).
///
/// A closed taxonomy so the layer functions can map every failure to a
/// verdict without inspecting error strings.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The identifier does not exist at the registry (404/410)
    #[error("not found at {service} (HTTP {status})")]
    NotFound { service: &'static str, status: u16 },

    /// Any other non-success HTTP status
    #[error("{service} returned HTTP {status}")]
    Status { service: &'static str, status: u16 },

    /// The request did not complete within its deadline
    #[error("{service} request timed out")]
    Timeout { service: &'static str },

    /// Connection, TLS or DNS failure
    #[error("{service} transport error: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    /// Response body could not be interpreted
    #[error("{service} returned an unparseable response: {message}")]
    Parse {
        service: &'static str,
        message: String,
    },

    /// URL rejected by the SSRF guard
    #[error("blocked URL: {0}")]
    Blocked(#[from] SecurityError),
}

impl ClientError {
    /// Map a reqwest failure onto the taxonomy.
    pub fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { service }
        } else if err.is_decode() {
            Self::Parse {
                service,
                message: err.to_string(),
            }
        } else {
            Self::Transport {
                service,
                message: err.to_string(),
            }
        }
    }

    /// Map a non-success HTTP status onto the taxonomy.
    pub fn from_status(service: &'static str, status: u16) -> Self {
        match status {
            404 | 410 => Self::NotFound { service, status },
            _ => Self::Status { service, status },
        }
    }

    /// True when the registry positively reported the identifier as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Failures of the page fetch-and-extract collaborator.
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL rejected by the SSRF guard
    #[error("security error: {0}")]
    Security(#[from] SecurityError),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(String),

    /// Page answered with a non-success status
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    /// Page did not load within the deadline
    #[error("timeout fetching: {url}")]
    Timeout { url: String },

    /// Rendering service reported a failure
    #[error("rendering failed: {0}")]
    Rendering(String),
}

/// Failures of an embedding backend.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Remote embedding API failed
    #[error("embedding request failed: {0}")]
    Request(String),

    /// Response did not contain an embedding
    #[error("embedding response missing data")]
    MissingData,

    /// Vectors of different lengths were compared
    #[error("dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

/// Failures of a generative-text provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed
    #[error("{provider} request failed: {message}")]
    Request {
        provider: &'static str,
        message: String,
    },

    /// Non-success HTTP status
    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// Response carried no text
    #[error("{provider} returned an empty completion")]
    EmptyCompletion { provider: &'static str },
}

/// Failures of the cache backing store.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Store is unreachable or rejected the operation
    #[error("cache store unavailable: {0}")]
    Unavailable(String),

    /// Stored value could not be (de)serialized
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Security-related errors, primarily for SSRF protection.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// URL scheme not allowed (e.g., file://, ftp://)
    #[error("disallowed URL scheme: {0}")]
    DisallowedScheme(String),

    /// Host is blocked (e.g., localhost, internal IPs)
    #[error("blocked host: {0}")]
    BlockedHost(String),

    /// IP in blocked CIDR range (e.g., 10.0.0.0/8)
    #[error("blocked IP range: {0}")]
    BlockedCidr(String),

    /// URL has no host
    #[error("URL has no host")]
    NoHost,

    /// The hostname does not resolve; the link is dead rather than forbidden
    #[error("host {host} does not resolve: {reason}")]
    Unresolvable { host: String, reason: String },

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl SecurityError {
    /// True when the guard refused on policy grounds, as opposed to the
    /// target simply not existing.
    pub fn is_policy_denial(&self) -> bool {
        !matches!(self, Self::Unresolvable { .. })
    }
}

/// Result type alias for engine entry points.
pub type Result<T> = std::result::Result<T, VerificationError>;

/// Result type alias for external signal clients.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Result type alias for page fetches.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for security operations.
pub type SecurityResult<T> = std::result::Result<T, SecurityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_404_and_410_are_not_found() {
        assert!(ClientError::from_status("crossref", 404).is_not_found());
        assert!(ClientError::from_status("crossref", 410).is_not_found());
        assert!(!ClientError::from_status("crossref", 503).is_not_found());
    }

    #[test]
    fn input_errors_render_limits() {
        let err = VerificationError::TooManyCitations { count: 101, max: 100 };
        assert_eq!(err.to_string(), "too many citations: 101 (max 100)");
    }
}
