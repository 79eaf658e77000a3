//! Per-layer outcomes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome of a single verification layer.
///
/// `Skipped` is neither a pass nor a fail: the layer produced no evidence
/// and is excluded from aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerStatus {
    Passed,
    Warning,
    Failed,
    Skipped,
}

impl LayerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Warning => "warning",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Evidence produced by one layer. Built once, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerResult {
    pub status: LayerStatus,

    /// Confidence in [0, 1]. `None` means the layer has no opinion.
    pub confidence: Option<f64>,

    pub details: String,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl LayerResult {
    fn new(status: LayerStatus, confidence: Option<f64>, details: impl Into<String>) -> Self {
        Self {
            status,
            confidence: confidence.map(|c| c.clamp(0.0, 1.0)),
            details: details.into(),
            metadata: Map::new(),
        }
    }

    pub fn passed(confidence: f64, details: impl Into<String>) -> Self {
        Self::new(LayerStatus::Passed, Some(confidence), details)
    }

    pub fn warning(confidence: f64, details: impl Into<String>) -> Self {
        Self::new(LayerStatus::Warning, Some(confidence), details)
    }

    pub fn failed(confidence: f64, details: impl Into<String>) -> Self {
        Self::new(LayerStatus::Failed, Some(confidence), details)
    }

    pub fn skipped(details: impl Into<String>) -> Self {
        Self::new(LayerStatus::Skipped, None, details)
    }

    /// Attach a metadata entry. Values that fail to serialize are dropped.
    pub fn with_metadata(mut self, key: &str, value: impl Serialize) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.metadata.insert(key.to_string(), value);
        }
        self
    }

    pub fn is_skipped(&self) -> bool {
        self.status == LayerStatus::Skipped
    }

    pub fn is_failed(&self) -> bool {
        self.status == LayerStatus::Failed
    }
}

/// Names of the layers, used for weighting and decision reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    UrlValidation,
    MetadataCheck,
    ContentVerification,
    TemporalConsistency,
    HallucinationPatterns,
    AiScoring,
    CitationGraph,
}

/// Fixed set of layers carried by every result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationLayers {
    pub url_validation: LayerResult,
    pub metadata_check: LayerResult,
    pub content_verification: LayerResult,
    pub temporal_consistency: LayerResult,
    pub hallucination_patterns: LayerResult,
    pub ai_scoring: LayerResult,

    /// Absent when the caller turned the citation graph off.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation_graph: Option<LayerResult>,
}

impl VerificationLayers {
    /// Every layer skipped with the same reason.
    pub fn all_skipped(reason: &str) -> Self {
        Self {
            url_validation: LayerResult::skipped(reason),
            metadata_check: LayerResult::skipped(reason),
            content_verification: LayerResult::skipped(reason),
            temporal_consistency: LayerResult::skipped(reason),
            hallucination_patterns: LayerResult::skipped(reason),
            ai_scoring: LayerResult::skipped(reason),
            citation_graph: None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (LayerKind, &LayerResult)> {
        [
            (LayerKind::UrlValidation, Some(&self.url_validation)),
            (LayerKind::MetadataCheck, Some(&self.metadata_check)),
            (LayerKind::ContentVerification, Some(&self.content_verification)),
            (LayerKind::TemporalConsistency, Some(&self.temporal_consistency)),
            (LayerKind::HallucinationPatterns, Some(&self.hallucination_patterns)),
            (LayerKind::AiScoring, Some(&self.ai_scoring)),
            (LayerKind::CitationGraph, self.citation_graph.as_ref()),
        ]
        .into_iter()
        .filter_map(|(kind, layer)| layer.map(|l| (kind, l)))
    }
}
