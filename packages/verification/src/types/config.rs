//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::citation::Priority;
use super::layer::LayerKind;

/// Relative weight of each layer in the weighted mean.
///
/// Layers that end up skipped are excluded, so weights only compare layers
/// that actually produced evidence. Default: all 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerWeights {
    pub url_validation: f64,
    pub metadata_check: f64,
    pub content_verification: f64,
    pub temporal_consistency: f64,
    pub hallucination_patterns: f64,
    pub ai_scoring: f64,
    pub citation_graph: f64,
}

impl Default for LayerWeights {
    fn default() -> Self {
        Self {
            url_validation: 1.0,
            metadata_check: 1.0,
            content_verification: 1.0,
            temporal_consistency: 1.0,
            hallucination_patterns: 1.0,
            ai_scoring: 1.0,
            citation_graph: 1.0,
        }
    }
}

impl LayerWeights {
    pub fn weight(&self, kind: LayerKind) -> f64 {
        match kind {
            LayerKind::UrlValidation => self.url_validation,
            LayerKind::MetadataCheck => self.metadata_check,
            LayerKind::ContentVerification => self.content_verification,
            LayerKind::TemporalConsistency => self.temporal_consistency,
            LayerKind::HallucinationPatterns => self.hallucination_patterns,
            LayerKind::AiScoring => self.ai_scoring,
            LayerKind::CitationGraph => self.citation_graph,
        }
    }
}

/// Hard deadlines for the external calls behind each layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerTimeouts {
    /// Registry lookups and the URL check. Default: 10s.
    pub registry_secs: u64,

    /// Page load through the fetch collaborator. Default: 15s.
    pub fetch_secs: u64,

    /// Fixed wait after load for client-side rendering. Default: 2000ms.
    pub settle_ms: u64,

    /// Generative provider round trip. Default: 30s.
    pub provider_secs: u64,
}

impl Default for LayerTimeouts {
    fn default() -> Self {
        Self {
            registry_secs: 10,
            fetch_secs: 15,
            settle_ms: 2000,
            provider_secs: 30,
        }
    }
}

impl LayerTimeouts {
    /// Trimmed deadlines used by the balanced batch profile.
    pub fn trimmed(&self) -> Self {
        Self {
            registry_secs: (self.registry_secs * 2 / 3).max(1),
            fetch_secs: (self.fetch_secs * 2 / 3).max(1),
            settle_ms: self.settle_ms / 2,
            provider_secs: (self.provider_secs / 2).max(1),
        }
    }

    pub fn registry(&self) -> Duration {
        Duration::from_secs(self.registry_secs)
    }

    pub fn fetch(&self) -> Duration {
        Duration::from_secs(self.fetch_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn provider(&self) -> Duration {
        Duration::from_secs(self.provider_secs)
    }
}

/// Time-to-live per cached client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CacheTtls {
    /// Default: 1 hour.
    pub crossref_secs: u64,
    /// Default: 1 hour.
    pub arxiv_secs: u64,
    /// Default: 24 hours.
    pub openalex_secs: u64,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            crossref_secs: 3600,
            arxiv_secs: 3600,
            openalex_secs: 86_400,
        }
    }
}

/// Configuration for [`Verifier`](crate::Verifier).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    pub weights: LayerWeights,
    pub timeouts: LayerTimeouts,
    pub cache_ttls: CacheTtls,

    /// Citations verified at once by batch and text operations. Default: 8.
    pub batch_concurrency: usize,

    /// Maximum citations per batch or text body. Default: 100.
    pub max_citations: usize,

    /// Maximum characters in one citation. Default: 5000.
    pub max_citation_length: usize,

    /// Maximum characters in a verify-text body. Default: 200000.
    pub max_text_length: usize,

    /// Characters of each side fed to the embedder. Default: 2000.
    pub embedding_window: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            weights: LayerWeights::default(),
            timeouts: LayerTimeouts::default(),
            cache_ttls: CacheTtls::default(),
            batch_concurrency: 8,
            max_citations: 100,
            max_citation_length: 5000,
            max_text_length: 200_000,
            embedding_window: 2000,
        }
    }
}

impl VerifierConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(mut self, weights: LayerWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_timeouts(mut self, timeouts: LayerTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_cache_ttls(mut self, ttls: CacheTtls) -> Self {
        self.cache_ttls = ttls;
        self
    }

    /// Set batch concurrency (at least 1).
    pub fn with_batch_concurrency(mut self, concurrency: usize) -> Self {
        self.batch_concurrency = concurrency.max(1);
        self
    }

    pub fn with_max_citations(mut self, max: usize) -> Self {
        self.max_citations = max;
        self
    }

    /// Deadlines to use for a batch run at the given priority.
    pub fn timeouts_for(&self, priority: Priority) -> LayerTimeouts {
        match priority {
            Priority::Balanced => self.timeouts.trimmed(),
            Priority::Speed | Priority::Accuracy => self.timeouts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_trims_every_deadline() {
        let full = LayerTimeouts::default();
        let trimmed = VerifierConfig::default().timeouts_for(Priority::Balanced);
        assert!(trimmed.registry_secs < full.registry_secs);
        assert!(trimmed.fetch_secs < full.fetch_secs);
        assert!(trimmed.provider_secs < full.provider_secs);
    }

    #[test]
    fn accuracy_keeps_full_deadlines() {
        let config = VerifierConfig::default();
        assert_eq!(config.timeouts_for(Priority::Accuracy), config.timeouts);
    }
}
