//! Verdicts returned to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::layer::VerificationLayers;

/// Overall trust verdict for a citation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    Suspicious,
    Fake,
    UrlBroken,
    Unknown,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Suspicious => "suspicious",
            Self::Fake => "fake",
            Self::UrlBroken => "url_broken",
            Self::Unknown => "unknown",
        }
    }
}

/// A corrected citation offered when the cited identifier points at a
/// different work than the one described.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationSuggestion {
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub confidence: f64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub citation: String,
    pub status: VerificationStatus,

    /// Overall confidence in [0, 100].
    pub confidence: f64,

    pub layers: VerificationLayers,

    /// Narrative from the AI layer, when one answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,

    /// Ordered by descending confidence.
    #[serde(default)]
    pub suggestions: Vec<CitationSuggestion>,

    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl VerificationResult {
    /// Keep suggestions sorted, highest confidence first.
    pub fn sort_suggestions(&mut self) {
        self.suggestions
            .sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    }
}

/// Verdicts for every citation found in a body of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextVerificationResult {
    pub total_citations: usize,
    pub verified_count: usize,
    pub suspicious_count: usize,
    pub fake_count: usize,
    pub results: Vec<VerificationResult>,

    /// Mean confidence over `results`, in [0, 100].
    pub overall_confidence: f64,
    pub processing_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// One slot of a batch, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchOutcome {
    Completed(Box<VerificationResult>),
    Failed {
        index: usize,
        citation: String,
        error: String,
    },
}

impl BatchOutcome {
    pub fn result(&self) -> Option<&VerificationResult> {
        match self {
            Self::Completed(result) => Some(result),
            Self::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchVerificationResult {
    pub total_citations: usize,

    /// Citations that produced a verdict, whatever the verdict.
    pub completed: usize,

    /// Citations whose pipeline raised an error.
    pub failed: usize,

    pub results: Vec<BatchOutcome>,
    pub processing_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggestion(confidence: f64) -> CitationSuggestion {
        CitationSuggestion {
            title: format!("t{confidence}"),
            authors: vec![],
            year: None,
            doi: None,
            url: None,
            confidence,
            reason: String::new(),
        }
    }

    #[test]
    fn suggestions_sort_descending() {
        let mut result = VerificationResult {
            citation: "x".into(),
            status: VerificationStatus::Unknown,
            confidence: 0.0,
            layers: VerificationLayers::all_skipped("n/a"),
            reasoning: None,
            suggestions: vec![suggestion(0.4), suggestion(0.9), suggestion(0.6)],
            metadata: Map::new(),
        };
        result.sort_suggestions();
        let order: Vec<f64> = result.suggestions.iter().map(|s| s.confidence).collect();
        assert_eq!(order, vec![0.9, 0.6, 0.4]);
    }

    #[test]
    fn url_broken_serializes_snake_case() {
        let json = serde_json::to_value(VerificationStatus::UrlBroken).unwrap();
        assert_eq!(json, "url_broken");
    }
}
