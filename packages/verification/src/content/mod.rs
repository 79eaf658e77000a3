//! Content alignment: does the cited page actually say what the claim says?
//!
//! The aligner fetches the source, extracts its main text, embeds both sides
//! and compares them with cosine similarity. Bands:
//!
//! | similarity | aligned | confidence  | flag                  |
//! |------------|---------|-------------|-----------------------|
//! | >= 0.7     | yes     | sim         |                       |
//! | 0.5 - 0.7  | no      | sim x 0.8   | `moderate_similarity` |
//! | < 0.5      | no      | sim x 0.5   | `low_similarity`      |
//!
//! `possible_fabrication` is added below 0.3 and `short_content` when the
//! page has under 500 characters of text. Without an embedder the layer
//! reports `model_error` and is skipped; it never assumes alignment.

pub mod embedding;
pub mod extract;
pub mod fetch;

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::types::{LayerResult, LayerTimeouts};
use embedding::{cosine_similarity, Embedder};
use fetch::PageFetcher;

pub use embedding::{ClaimTermEmbedder, OpenAIEmbedder};
pub use extract::{extract_main_text, html_to_text, ExtractedContent};
pub use fetch::{FetchPool, FetchedPage, FirecrawlFetcher, HttpPageFetcher};

const MIN_CONTENT_CHARS: usize = 100;
const SHORT_CONTENT_CHARS: usize = 500;
const INSUFFICIENT_CONTENT_CONFIDENCE: f64 = 0.2;

const ALIGNED_THRESHOLD: f64 = 0.7;
const MODERATE_THRESHOLD: f64 = 0.5;
const FABRICATION_THRESHOLD: f64 = 0.3;

lazy_static! {
    static ref NUMBER: Regex = Regex::new(r"\b\d+(?:[.,]\d+)?%?").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentFlag {
    InaccessibleUrl,
    InsufficientContent,
    ModerateSimilarity,
    LowSimilarity,
    PossibleFabrication,
    ShortContent,
    StatMismatch,
    ModelError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentAlignment {
    pub aligned: bool,
    pub confidence: f64,
    pub similarity_score: Option<f64>,
    pub content_length: usize,
    pub flags: Vec<AlignmentFlag>,
    pub reason: String,

    /// Numbers in the claim that the source never mentions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_numbers: Vec<String>,
}

impl ContentAlignment {
    fn unaligned(confidence: f64, flag: AlignmentFlag, reason: impl Into<String>) -> Self {
        Self {
            aligned: false,
            confidence,
            similarity_score: None,
            content_length: 0,
            flags: vec![flag],
            reason: reason.into(),
            missing_numbers: Vec::new(),
        }
    }

    pub fn has_flag(&self, flag: AlignmentFlag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn to_layer(&self) -> LayerResult {
        if self.has_flag(AlignmentFlag::ModelError) {
            return LayerResult::skipped(&self.reason).with_metadata("flags", &self.flags);
        }

        let layer = if self.aligned && !self.has_flag(AlignmentFlag::StatMismatch) {
            LayerResult::passed(self.confidence, &self.reason)
        } else if self.aligned
            || self.has_flag(AlignmentFlag::ModerateSimilarity)
            || self.has_flag(AlignmentFlag::InsufficientContent)
            || self.has_flag(AlignmentFlag::InaccessibleUrl)
        {
            LayerResult::warning(self.confidence, &self.reason)
        } else {
            LayerResult::failed(self.confidence, &self.reason)
        };

        let layer = layer
            .with_metadata("aligned", self.aligned)
            .with_metadata("content_length", self.content_length)
            .with_metadata("flags", &self.flags);
        let layer = match self.similarity_score {
            Some(score) => layer.with_metadata("similarity_score", score),
            None => layer,
        };
        if self.missing_numbers.is_empty() {
            layer
        } else {
            layer.with_metadata("missing_numbers", &self.missing_numbers)
        }
    }
}

/// Compares claim text against the page a citation points to.
pub struct ContentAligner {
    fetcher: Arc<dyn PageFetcher>,
    embedder: Option<Arc<dyn Embedder>>,
    window: usize,
}

impl ContentAligner {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            embedder: None,
            window: 2000,
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Characters of each side passed to the embedder.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }

    pub fn embedder_name(&self) -> Option<&str> {
        self.embedder.as_deref().map(|e| e.name())
    }

    pub async fn align(&self, url: &str, claim: &str, timeouts: &LayerTimeouts) -> ContentAlignment {
        let Some(embedder) = self.embedder.as_deref() else {
            return ContentAlignment::unaligned(
                0.0,
                AlignmentFlag::ModelError,
                "No embedding model configured",
            );
        };

        let page = match self.fetcher.fetch(url, timeouts.fetch(), timeouts.settle()).await {
            Ok(page) => page,
            Err(e) => {
                warn!(url = %url, error = %e, "source page unavailable");
                return ContentAlignment::unaligned(
                    0.0,
                    AlignmentFlag::InaccessibleUrl,
                    format!("Could not fetch source: {}", e),
                );
            }
        };

        let content = extract_main_text(&page.html).text;
        let content_length = content.chars().count();
        if content_length < MIN_CONTENT_CHARS {
            debug!(url = %url, content_length, "too little text to compare");
            return ContentAlignment {
                content_length,
                ..ContentAlignment::unaligned(
                    INSUFFICIENT_CONTENT_CONFIDENCE,
                    AlignmentFlag::InsufficientContent,
                    "Source has too little text to compare",
                )
            };
        }

        let claim_window = truncate_chars(claim, self.window);
        let content_window = truncate_chars(&content, self.window);
        let similarity = match embed_pair(embedder, &claim_window, &content_window).await {
            Ok(similarity) => similarity,
            Err(reason) => {
                warn!(url = %url, error = %reason, embedder = embedder.name(), "embedding failed");
                return ContentAlignment::unaligned(0.0, AlignmentFlag::ModelError, reason);
            }
        };

        let mut alignment = score(similarity, content_length);
        alignment.missing_numbers = missing_numbers(claim, &content);
        if !alignment.missing_numbers.is_empty() {
            alignment.flags.push(AlignmentFlag::StatMismatch);
        }

        info!(
            url = %url,
            similarity = similarity,
            aligned = alignment.aligned,
            "content alignment computed"
        );
        alignment
    }
}

async fn embed_pair(embedder: &dyn Embedder, a: &str, b: &str) -> Result<f64, String> {
    let (left, right) = tokio::join!(embedder.embed(a), embedder.embed(b));
    let left = left.map_err(|e| e.to_string())?;
    let right = right.map_err(|e| e.to_string())?;
    cosine_similarity(&left, &right).map_err(|e| e.to_string())
}

/// Map a similarity onto the confidence bands.
pub fn score(similarity: f64, content_length: usize) -> ContentAlignment {
    let mut flags = Vec::new();
    let (aligned, confidence, reason) = if similarity >= ALIGNED_THRESHOLD {
        (true, similarity, "Source content supports the claim")
    } else if similarity >= MODERATE_THRESHOLD {
        flags.push(AlignmentFlag::ModerateSimilarity);
        (false, similarity * 0.8, "Source content only partly matches the claim")
    } else {
        flags.push(AlignmentFlag::LowSimilarity);
        (false, similarity * 0.5, "Source content does not match the claim")
    };

    if similarity < FABRICATION_THRESHOLD {
        flags.push(AlignmentFlag::PossibleFabrication);
    }
    if content_length < SHORT_CONTENT_CHARS {
        flags.push(AlignmentFlag::ShortContent);
    }

    ContentAlignment {
        aligned,
        confidence,
        similarity_score: Some(similarity),
        content_length,
        flags,
        reason: reason.to_string(),
        missing_numbers: Vec::new(),
    }
}

/// Numbers stated in the claim that never appear in the source text.
pub fn missing_numbers(claim: &str, content: &str) -> Vec<String> {
    let mut missing: Vec<String> = Vec::new();
    for m in NUMBER.find_iter(claim) {
        let number = m.as_str().trim_end_matches('%');
        // Single digits are too common to mean anything.
        if number.len() < 2 || content.contains(number) {
            continue;
        }
        if !missing.iter().any(|n| n == number) {
            missing.push(number.to_string());
        }
    }
    missing
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
