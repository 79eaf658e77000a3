use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

use verification::SecretString;

/// Where registry lookups are memoized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,
    None,
}

/// Which model embeds text for content alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProvider {
    OpenAi,
    /// Feature-hashed claim terms computed in-process
    Local,
    None,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub openai_api_key: Option<SecretString>,
    pub openai_model: Option<String>,
    pub gemini_api_key: Option<SecretString>,
    pub gemini_model: Option<String>,
    pub firecrawl_api_key: Option<SecretString>,
    pub crossref_mailto: Option<String>,
    pub cache_backend: CacheBackend,
    pub cache_max_entries: u64,
    pub embedding_provider: EmbeddingProvider,
    pub batch_concurrency: usize,
    pub fetch_concurrency: usize,
    /// Requests per second per registry; unlimited when unset
    pub registry_rate_limit: Option<u32>,
    /// Empty means any origin
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_api_key = get("OPENAI_API_KEY").map(SecretString::from);
        let gemini_api_key = get("GEMINI_API_KEY")
            .or_else(|| get("GOOGLE_API_KEY"))
            .map(SecretString::from);

        let cache_backend = match get("CACHE_BACKEND").as_deref() {
            None | Some("memory") => CacheBackend::Memory,
            Some("none") => CacheBackend::None,
            Some(other) => bail!("CACHE_BACKEND must be memory or none, got {}", other),
        };

        let embedding_provider = match get("EMBEDDING_PROVIDER").as_deref() {
            None if openai_api_key.is_some() => EmbeddingProvider::OpenAi,
            None | Some("local") => EmbeddingProvider::Local,
            Some("openai") => EmbeddingProvider::OpenAi,
            Some("none") => EmbeddingProvider::None,
            Some(other) => bail!("EMBEDDING_PROVIDER must be openai, local or none, got {}", other),
        };
        if embedding_provider == EmbeddingProvider::OpenAi && openai_api_key.is_none() {
            bail!("EMBEDDING_PROVIDER=openai requires OPENAI_API_KEY");
        }

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(get("PORT"), "PORT", 8000)?,
            openai_api_key,
            openai_model: get("OPENAI_MODEL"),
            gemini_api_key,
            gemini_model: get("GEMINI_MODEL"),
            firecrawl_api_key: get("FIRECRAWL_API_KEY").map(SecretString::from),
            crossref_mailto: get("CROSSREF_MAILTO"),
            cache_backend,
            cache_max_entries: parse_or(get("CACHE_MAX_ENTRIES"), "CACHE_MAX_ENTRIES", 10_000)?,
            embedding_provider,
            batch_concurrency: parse_or(get("BATCH_CONCURRENCY"), "BATCH_CONCURRENCY", 8)?,
            fetch_concurrency: parse_or(get("FETCH_CONCURRENCY"), "FETCH_CONCURRENCY", 4)?,
            registry_rate_limit: get("REGISTRY_RATE_LIMIT")
                .map(|v| v.parse())
                .transpose()
                .context("REGISTRY_RATE_LIMIT must be a valid number")?,
            cors_origins: get("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", key)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use verification::ExposeSecret;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
        assert_eq!(config.cache_backend, CacheBackend::Memory);
        assert_eq!(config.embedding_provider, EmbeddingProvider::Local);
        assert_eq!(config.batch_concurrency, 8);
        assert!(config.openai_api_key.is_none());
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn openai_key_selects_openai_embeddings() {
        let config = load(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.embedding_provider, EmbeddingProvider::OpenAi);
        assert!(!format!("{:?}", config).contains("sk-test"));
    }

    #[test]
    fn google_key_is_a_gemini_fallback() {
        let config = load(&[("GOOGLE_API_KEY", "g-key")]).unwrap();
        assert_eq!(config.gemini_api_key.unwrap().expose_secret(), "g-key");
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = load(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        assert!(load(&[("CACHE_BACKEND", "redis")]).is_err());
        assert!(load(&[("EMBEDDING_PROVIDER", "openai")]).is_err());
    }

    #[test]
    fn cors_origins_are_split() {
        let config = load(&[("CORS_ORIGINS", "http://a.test, http://b.test,")]).unwrap();
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
    }
}
