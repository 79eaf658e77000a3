//! Merging layer evidence into one verdict.
//!
//! Precedence, first match wins:
//!
//! 1. no layer produced a confidence: `unknown` at 0
//! 2. the cited identifier does not exist: `fake`, capped below 50
//! 3. the identifier resolves but the details are wrong: `suspicious`,
//!    capped below 80, or `fake` when the score is already under 50
//! 4. a failed temporal check demotes `verified` to `suspicious`
//! 5. otherwise the weighted mean decides: >= 80 verified, >= 50
//!    suspicious, below that fake
//!
//! Skipped layers are ignored throughout.

use serde::{Deserialize, Serialize};

use crate::metadata::MetadataVerdict;
use crate::types::{LayerWeights, VerificationLayers, VerificationStatus};

const VERIFIED_THRESHOLD: f64 = 80.0;
const SUSPICIOUS_THRESHOLD: f64 = 50.0;
const BELOW_SUSPICIOUS: f64 = 49.9;
const BELOW_VERIFIED: f64 = 79.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionRule {
    UrlBroken,
    NoEvidence,
    MetadataNotFound,
    PartialHallucination,
    TemporalInconsistency,
    WeightedScore,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub status: VerificationStatus,
    pub confidence: f64,
    pub rule: DecisionRule,
}

/// Weighted mean of non-skipped layer confidences, scaled to [0, 100] and
/// rounded to one decimal. `None` when no layer has a confidence.
pub fn weighted_score(layers: &VerificationLayers, weights: &LayerWeights) -> Option<f64> {
    let (sum, total) = layers
        .iter()
        .filter(|(_, layer)| !layer.is_skipped())
        .filter_map(|(kind, layer)| layer.confidence.map(|c| (weights.weight(kind), c)))
        .filter(|(weight, _)| *weight > 0.0)
        .fold((0.0, 0.0), |(sum, total), (weight, c)| {
            (sum + weight * c, total + weight)
        });

    if total <= 0.0 {
        return None;
    }
    Some(round1(sum / total * 100.0))
}

pub fn decide(
    layers: &VerificationLayers,
    metadata: Option<MetadataVerdict>,
    weights: &LayerWeights,
) -> Decision {
    let Some(score) = weighted_score(layers, weights) else {
        return Decision {
            status: VerificationStatus::Unknown,
            confidence: 0.0,
            rule: DecisionRule::NoEvidence,
        };
    };

    match metadata {
        Some(MetadataVerdict::NotFound) => {
            return Decision {
                status: VerificationStatus::Fake,
                confidence: score.min(BELOW_SUSPICIOUS),
                rule: DecisionRule::MetadataNotFound,
            };
        }
        Some(MetadataVerdict::PartialHallucination) => {
            let status = if score < SUSPICIOUS_THRESHOLD {
                VerificationStatus::Fake
            } else {
                VerificationStatus::Suspicious
            };
            return Decision {
                status,
                confidence: score.min(BELOW_VERIFIED),
                rule: DecisionRule::PartialHallucination,
            };
        }
        _ => {}
    }

    let status = status_for(score);
    if status == VerificationStatus::Verified && layers.temporal_consistency.is_failed() {
        return Decision {
            status: VerificationStatus::Suspicious,
            confidence: score.min(BELOW_VERIFIED),
            rule: DecisionRule::TemporalInconsistency,
        };
    }

    Decision {
        status,
        confidence: score,
        rule: DecisionRule::WeightedScore,
    }
}

fn status_for(score: f64) -> VerificationStatus {
    if score >= VERIFIED_THRESHOLD {
        VerificationStatus::Verified
    } else if score >= SUSPICIOUS_THRESHOLD {
        VerificationStatus::Suspicious
    } else {
        VerificationStatus::Fake
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LayerResult;

    fn layers() -> VerificationLayers {
        VerificationLayers::all_skipped("not run")
    }

    #[test]
    fn nothing_ran_is_unknown() {
        let decision = decide(&layers(), None, &LayerWeights::default());
        assert_eq!(decision.status, VerificationStatus::Unknown);
        assert_eq!(decision.confidence, 0.0);
        assert_eq!(decision.rule, DecisionRule::NoEvidence);
    }

    #[test]
    fn skipped_layers_do_not_dilute_the_mean() {
        let mut l = layers();
        l.metadata_check = LayerResult::passed(0.9, "ok");
        l.temporal_consistency = LayerResult::passed(0.9, "ok");
        assert_eq!(weighted_score(&l, &LayerWeights::default()), Some(90.0));
    }

    #[test]
    fn weights_shift_the_mean() {
        let mut l = layers();
        l.metadata_check = LayerResult::passed(1.0, "ok");
        l.hallucination_patterns = LayerResult::warning(0.4, "meh");
        let weights = LayerWeights {
            metadata_check: 3.0,
            ..LayerWeights::default()
        };
        assert_eq!(weighted_score(&l, &weights), Some(85.0));
    }

    #[test]
    fn not_found_is_fake_even_with_optimistic_layers() {
        let mut l = layers();
        l.metadata_check = LayerResult::failed(0.0, "missing");
        l.temporal_consistency = LayerResult::passed(0.9, "ok");
        l.hallucination_patterns = LayerResult::passed(1.0, "ok");
        l.ai_scoring = LayerResult::passed(0.95, "ok");
        let decision = decide(&l, Some(MetadataVerdict::NotFound), &LayerWeights::default());
        assert_eq!(decision.status, VerificationStatus::Fake);
        assert!(decision.confidence < 50.0);
    }

    #[test]
    fn partial_hallucination_caps_at_suspicious() {
        let mut l = layers();
        l.metadata_check = LayerResult::failed(0.6, "year mismatch");
        l.temporal_consistency = LayerResult::passed(0.9, "ok");
        l.hallucination_patterns = LayerResult::passed(1.0, "ok");
        let decision = decide(
            &l,
            Some(MetadataVerdict::PartialHallucination),
            &LayerWeights::default(),
        );
        assert_eq!(decision.status, VerificationStatus::Suspicious);
        assert!(decision.confidence < 80.0);

        l.hallucination_patterns = LayerResult::failed(0.1, "bad");
        l.temporal_consistency = LayerResult::failed(0.0, "future");
        let decision = decide(
            &l,
            Some(MetadataVerdict::PartialHallucination),
            &LayerWeights::default(),
        );
        assert_eq!(decision.status, VerificationStatus::Fake);
    }

    #[test]
    fn temporal_failure_demotes_verified() {
        let mut l = layers();
        l.metadata_check = LayerResult::passed(1.0, "ok");
        l.hallucination_patterns = LayerResult::passed(1.0, "ok");
        l.url_validation = LayerResult::passed(1.0, "ok");
        l.ai_scoring = LayerResult::passed(1.0, "ok");
        l.temporal_consistency = LayerResult::failed(0.0, "future year");
        let decision = decide(&l, Some(MetadataVerdict::Verified), &LayerWeights::default());
        assert_eq!(decision.status, VerificationStatus::Suspicious);
        assert_eq!(decision.confidence, 79.9);
        assert_eq!(decision.rule, DecisionRule::TemporalInconsistency);
    }

    #[test]
    fn thresholds() {
        assert_eq!(status_for(80.0), VerificationStatus::Verified);
        assert_eq!(status_for(79.9), VerificationStatus::Suspicious);
        assert_eq!(status_for(50.0), VerificationStatus::Suspicious);
        assert_eq!(status_for(49.9), VerificationStatus::Fake);
    }
}
