//! Generative-model assessment of a citation.
//!
//! Providers are ranked; the scorer asks each in turn until one answers.
//! Only the numeric confidence pulled out of the answer feeds aggregation,
//! the full text is kept as the result's reasoning.

pub mod gemini;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ProviderError;
use crate::types::LayerResult;

pub use gemini::GeminiProvider;
pub use openai::OpenAIProvider;

pub(crate) const SYSTEM_PROMPT: &str = "You are an expert academic librarian who checks \
whether citations are real and correctly attributed. Be concise and end with a line of the \
form \"Confidence score: N\" where N is between 0 and 100.";

const DEFAULT_MAX_TOKENS: u32 = 500;
const DEFAULT_CONFIDENCE: f64 = 0.6;

lazy_static! {
    static ref LABELED_SCORE: Regex =
        Regex::new(r"(?i)confidence\s*(?:score|level)?\s*[:=]?\s*(\d+(?:\.\d+)?)\s*(%)?").unwrap();
}

/// Keyword fallbacks, checked in order.
const KEYWORD_LADDER: &[(&[&str], f64)] = &[
    (&["fabricated", "fake", "hallucinated", "does not exist"], 0.2),
    (&["suspicious", "questionable", "dubious"], 0.45),
    (&["likely valid", "probably accurate", "likely real"], 0.7),
    (&["highly credible", "verified", "legitimate"], 0.85),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub tokens: Option<u32>,
}

/// A generative text backend: prompt in, free text out.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<Completion, ProviderError>;
}

/// What the evidence layers concluded, handed to the model as context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSummary {
    pub url_status: Option<String>,
    pub metadata_status: Option<String>,
    pub metadata_details: Option<String>,
    pub content_confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAssessment {
    pub provider: String,
    pub model: String,
    pub confidence: f64,
    pub reasoning: String,
}

impl AiAssessment {
    pub fn to_layer(&self) -> LayerResult {
        let details = format!("Assessed by {}", self.provider);
        let layer = if self.confidence >= 0.8 {
            LayerResult::passed(self.confidence, details)
        } else if self.confidence >= 0.5 {
            LayerResult::warning(self.confidence, details)
        } else {
            LayerResult::failed(self.confidence, details)
        };
        layer
            .with_metadata("provider", &self.provider)
            .with_metadata("model", &self.model)
    }
}

/// Outcome of asking the ranked providers.
#[derive(Debug, Clone, PartialEq)]
pub enum AiOutcome {
    Assessed(AiAssessment),
    /// Nobody configured: the layer has no opinion.
    NoProviders,
    /// Every provider failed; errors in rank order.
    AllFailed(Vec<String>),
}

impl AiOutcome {
    pub fn to_layer(&self) -> LayerResult {
        match self {
            Self::Assessed(assessment) => assessment.to_layer(),
            Self::NoProviders => LayerResult::skipped("No AI provider configured"),
            Self::AllFailed(errors) => {
                LayerResult::skipped("All AI providers failed").with_metadata("errors", errors)
            }
        }
    }

    pub fn assessment(&self) -> Option<&AiAssessment> {
        match self {
            Self::Assessed(assessment) => Some(assessment),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct AiScorer {
    providers: Vec<Arc<dyn CompletionProvider>>,
    max_tokens: u32,
}

impl Default for AiScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl AiScorer {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Append a provider below the ones already registered.
    pub fn with_provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn is_configured(&self) -> bool {
        !self.providers.is_empty()
    }

    pub async fn assess(
        &self,
        citation: &str,
        context: Option<&str>,
        summary: &EvidenceSummary,
        deadline: Duration,
    ) -> AiOutcome {
        if self.providers.is_empty() {
            return AiOutcome::NoProviders;
        }

        let prompt = build_prompt(citation, context, summary);
        let mut errors = Vec::new();
        for provider in &self.providers {
            let result = tokio::time::timeout(deadline, provider.complete(&prompt, self.max_tokens)).await;
            match result {
                Ok(Ok(completion)) => {
                    let confidence = extract_confidence_score(&completion.text);
                    info!(provider = provider.name(), confidence, "AI assessment received");
                    return AiOutcome::Assessed(AiAssessment {
                        provider: provider.name().to_string(),
                        model: completion.model,
                        confidence,
                        reasoning: completion.text,
                    });
                }
                Ok(Err(e)) => {
                    warn!(provider = provider.name(), error = %e, "AI provider failed, trying next");
                    errors.push(e.to_string());
                }
                Err(_) => {
                    warn!(provider = provider.name(), "AI provider timed out, trying next");
                    errors.push(format!("{} timed out", provider.name()));
                }
            }
        }
        AiOutcome::AllFailed(errors)
    }
}

pub fn build_prompt(citation: &str, context: Option<&str>, summary: &EvidenceSummary) -> String {
    let mut prompt = format!(
        "Assess whether this academic citation is real and accurately attributed.\n\nCitation: {}\n",
        citation
    );
    if let Some(context) = context {
        prompt.push_str(&format!("Context where it is cited: {}\n", context));
    }

    prompt.push_str("\nAutomated checks so far:\n");
    prompt.push_str(&format!(
        "- URL: {}\n",
        summary.url_status.as_deref().unwrap_or("not checked")
    ));
    prompt.push_str(&format!(
        "- Bibliographic metadata: {}\n",
        summary.metadata_status.as_deref().unwrap_or("not checked")
    ));
    if let Some(details) = &summary.metadata_details {
        prompt.push_str(&format!("  ({})\n", details));
    }
    match summary.content_confidence {
        Some(c) => prompt.push_str(&format!("- Source content match: {:.0}%\n", c * 100.0)),
        None => prompt.push_str("- Source content match: not checked\n"),
    }

    prompt.push_str(
        "\nExplain briefly, then give a line \"Confidence score: N\" (0-100) for how likely the citation is genuine.",
    );
    prompt
}

/// Pull a confidence in [0, 1] out of free text.
///
/// A labeled score wins (values above 1 are read as percentages); otherwise
/// the first keyword rung that matches; otherwise 0.6.
pub fn extract_confidence_score(text: &str) -> f64 {
    if let Some(caps) = LABELED_SCORE.captures(text) {
        if let Ok(value) = caps[1].parse::<f64>() {
            let normalized = if value > 1.0 || caps.get(2).is_some() {
                value / 100.0
            } else {
                value
            };
            return normalized.clamp(0.0, 1.0);
        }
    }

    let lower = text.to_lowercase();
    KEYWORD_LADDER
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, score)| *score)
        .unwrap_or(DEFAULT_CONFIDENCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProvider;

    #[test]
    fn labeled_scores_are_normalized() {
        assert_eq!(extract_confidence_score("Confidence score: 85"), 0.85);
        assert_eq!(extract_confidence_score("confidence = 0.4"), 0.4);
        assert_eq!(extract_confidence_score("Confidence: 72%"), 0.72);
        assert_eq!(extract_confidence_score("Confidence score: 250"), 1.0);
    }

    #[test]
    fn keyword_ladder() {
        assert_eq!(extract_confidence_score("This looks fabricated."), 0.2);
        assert_eq!(extract_confidence_score("Somewhat questionable venue."), 0.45);
        assert_eq!(extract_confidence_score("Likely valid reference."), 0.7);
        assert_eq!(extract_confidence_score("A highly credible source."), 0.85);
        assert_eq!(extract_confidence_score("No opinion."), 0.6);
    }

    #[test]
    fn bare_credible_is_not_an_endorsement() {
        assert_eq!(extract_confidence_score("This citation is not credible."), 0.6);
        assert_eq!(extract_confidence_score("Credible-looking but unconfirmed."), 0.6);
    }

    #[test]
    fn prompt_carries_evidence() {
        let summary = EvidenceSummary {
            url_status: Some("reachable".into()),
            metadata_status: Some("verified".into()),
            metadata_details: None,
            content_confidence: Some(0.82),
        };
        let prompt = build_prompt("Smith (2019)", Some("Smith showed X"), &summary);
        assert!(prompt.contains("Citation: Smith (2019)"));
        assert!(prompt.contains("Smith showed X"));
        assert!(prompt.contains("82%"));
    }

    #[tokio::test]
    async fn no_providers_is_skipped_without_confidence() {
        let outcome = AiScorer::new()
            .assess("x", None, &EvidenceSummary::default(), Duration::from_secs(1))
            .await;
        let layer = outcome.to_layer();
        assert!(layer.is_skipped());
        assert_eq!(layer.confidence, None);
    }

    #[tokio::test]
    async fn falls_through_to_next_provider() {
        let scorer = AiScorer::new()
            .with_provider(Arc::new(MockProvider::failing("openai")))
            .with_provider(Arc::new(MockProvider::answering("gemini", "Confidence score: 90")));

        let outcome = scorer
            .assess("x", None, &EvidenceSummary::default(), Duration::from_secs(1))
            .await;
        let assessment = outcome.assessment().unwrap();
        assert_eq!(assessment.provider, "gemini");
        assert_eq!(assessment.confidence, 0.9);
        assert_eq!(outcome.to_layer().metadata["provider"], "gemini");
    }

    #[tokio::test]
    async fn all_failing_is_skipped_with_errors() {
        let scorer = AiScorer::new()
            .with_provider(Arc::new(MockProvider::failing("openai")))
            .with_provider(Arc::new(MockProvider::failing("gemini")));
        let outcome = scorer
            .assess("x", None, &EvidenceSummary::default(), Duration::from_secs(1))
            .await;
        let layer = outcome.to_layer();
        assert!(layer.is_skipped());
        assert_eq!(layer.metadata["errors"].as_array().unwrap().len(), 2);
    }
}
