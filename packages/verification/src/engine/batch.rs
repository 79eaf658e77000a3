//! Many citations at once: explicit batches and citations found in text.

use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use super::segment::{find_citations, flatten_markdown_links};
use super::Verifier;
use crate::content::html_to_text;
use crate::error::{Result, VerificationError};
use crate::types::{
    BatchOutcome, BatchVerificationResult, Citation, Priority, TextFormat,
    TextVerificationResult, VerificationOptions, VerificationStatus,
};

impl Verifier {
    /// Verify up to `max_citations` citations, at most `batch_concurrency`
    /// in flight. Output order matches input order; a citation that raises
    /// an error occupies its slot as [`BatchOutcome::Failed`].
    pub async fn verify_batch(
        &self,
        citations: &[Citation],
        priority: Priority,
        options: &VerificationOptions,
    ) -> Result<BatchVerificationResult> {
        self.check_count(citations.len())?;
        let start = Instant::now();

        let options = options_for(priority, options);
        let timeouts = self.config.timeouts_for(priority);

        let results: Vec<BatchOutcome> = stream::iter(0..citations.len())
            .map(|index| {
                let citation = &citations[index];
                let options = &options;
                let timeouts = &timeouts;
                async move {
                    match self.verify_with(citation, options, timeouts).await {
                        Ok(result) => BatchOutcome::Completed(Box::new(result)),
                        Err(e) => {
                            warn!(index, error = %e, "batch citation rejected");
                            BatchOutcome::Failed {
                                index,
                                citation: citation.text.clone(),
                                error: e.to_string(),
                            }
                        }
                    }
                }
            })
            .buffered(self.config.batch_concurrency.max(1))
            .collect()
            .await;

        let completed = results.iter().filter(|r| r.result().is_some()).count();
        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            total = citations.len(),
            completed,
            ?priority,
            processing_time_ms,
            "batch verified"
        );

        Ok(BatchVerificationResult {
            total_citations: citations.len(),
            completed,
            failed: results.len() - completed,
            results,
            processing_time_ms,
            timestamp: Utc::now(),
        })
    }

    /// Find the citations in a document body and verify each one.
    pub async fn verify_text(
        &self,
        text: &str,
        format: TextFormat,
        options: &VerificationOptions,
    ) -> Result<TextVerificationResult> {
        if text.trim().is_empty() {
            return Err(VerificationError::EmptyText);
        }
        let len = text.chars().count();
        if len > self.config.max_text_length {
            return Err(VerificationError::TextTooLong {
                len,
                max: self.config.max_text_length,
            });
        }
        let start = Instant::now();

        let plain = match format {
            TextFormat::Plain => text.to_string(),
            TextFormat::Markdown => flatten_markdown_links(text),
            TextFormat::Html => html_to_text(text),
        };
        let citations = find_citations(&plain);
        if citations.is_empty() {
            return Err(VerificationError::NoCitationsFound);
        }
        self.check_count(citations.len())?;

        let batch = self
            .verify_batch(&citations, Priority::Accuracy, options)
            .await?;
        let results: Vec<_> = batch
            .results
            .into_iter()
            .filter_map(|outcome| match outcome {
                BatchOutcome::Completed(result) => Some(*result),
                BatchOutcome::Failed { .. } => None,
            })
            .collect();

        let count = |status: VerificationStatus| results.iter().filter(|r| r.status == status).count();
        let overall_confidence = if results.is_empty() {
            0.0
        } else {
            let mean = results.iter().map(|r| r.confidence).sum::<f64>() / results.len() as f64;
            (mean * 10.0).round() / 10.0
        };

        Ok(TextVerificationResult {
            total_citations: citations.len(),
            verified_count: count(VerificationStatus::Verified),
            suspicious_count: count(VerificationStatus::Suspicious),
            fake_count: count(VerificationStatus::Fake),
            overall_confidence,
            results,
            processing_time_ms: start.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        })
    }

    fn check_count(&self, count: usize) -> Result<()> {
        if count > self.config.max_citations {
            return Err(VerificationError::TooManyCitations {
                count,
                max: self.config.max_citations,
            });
        }
        Ok(())
    }
}

/// Speed runs only the cheap layers.
fn options_for(priority: Priority, options: &VerificationOptions) -> VerificationOptions {
    match priority {
        Priority::Speed => VerificationOptions {
            check_content: false,
            enable_ai_scoring: false,
            ..options.clone()
        },
        Priority::Balanced | Priority::Accuracy => options.clone(),
    }
}
