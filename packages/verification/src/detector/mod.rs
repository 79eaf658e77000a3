//! Rule-based hallucination detection.
//!
//! Pure and synchronous: no I/O, no failure modes. The score is a sum of
//! per-flag contributions clamped to [0, 1]:
//!
//! - pattern matches add their severity weight (high 0.3, medium 0.15, low 0.05)
//! - each structural problem adds 0.1
//! - each quoted phrase whose similarity to the whole context is under 0.3
//!   adds 0.2
//!
//! Quote similarity is purely lexical and compares against the entire
//! context, so a short quote inside a long passage scores low even when it
//! appears verbatim.

mod rules;

use strsim::sorensen_dice;
use tracing::debug;

use crate::types::{DetectionFlag, FlagKind, HallucinationReport, Severity};
use rules::{AUTHOR, COMPILED_RULES, OVERCONFIDENT, QUOTE, SOURCE, YEAR};

pub use rules::{PatternRule, PATTERN_RULES};

const STRUCTURE_WEIGHT: f64 = 0.1;
const UNVERIFIED_QUOTE_WEIGHT: f64 = 0.2;
const QUOTE_SIMILARITY_FLOOR: f64 = 0.3;

#[derive(Debug, Clone, Copy, Default)]
pub struct HallucinationDetector;

impl HallucinationDetector {
    pub fn new() -> Self {
        Self
    }

    /// Score one citation, optionally against the prose it supports.
    pub fn detect(&self, citation: &str, context: Option<&str>) -> HallucinationReport {
        let mut flags = Vec::new();
        let mut score = 0.0;

        for compiled in COMPILED_RULES.iter() {
            for matched in compiled.matches(citation) {
                score += compiled.rule.severity.weight();
                flags.push(DetectionFlag {
                    kind: compiled.rule.kind,
                    matched: Some(matched.to_string()),
                    severity: compiled.rule.severity,
                    description: compiled.rule.description.to_string(),
                });
            }
        }

        let structural = structure_flags(citation);
        score += structural.len() as f64 * STRUCTURE_WEIGHT;
        flags.extend(structural);

        if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
            let quotes = unverified_quotes(citation, context);
            score += quotes.len() as f64 * UNVERIFIED_QUOTE_WEIGHT;
            flags.extend(quotes);
        }

        let probability = score.clamp(0.0, 1.0);
        debug!(
            probability,
            flags = flags.len(),
            "hallucination patterns evaluated"
        );

        HallucinationReport {
            is_likely_hallucinated: probability > 0.5,
            hallucination_probability: probability,
            credibility_score: 1.0 - probability,
            total_flags: flags.len(),
            recommendation: recommendation(probability, flags.len()),
            flags,
        }
    }

    /// Score several citations. Contexts pair up by index; missing ones are `None`.
    pub fn detect_batch(
        &self,
        citations: &[String],
        contexts: &[Option<String>],
    ) -> Vec<HallucinationReport> {
        citations
            .iter()
            .enumerate()
            .map(|(i, citation)| {
                let context = contexts.get(i).and_then(|c| c.as_deref());
                self.detect(citation, context)
            })
            .collect()
    }
}

fn structure_flags(citation: &str) -> Vec<DetectionFlag> {
    let mut flags = Vec::new();
    let mut flag = |kind, severity, description: &str| {
        flags.push(DetectionFlag {
            kind,
            matched: None,
            severity,
            description: description.to_string(),
        })
    };

    if !AUTHOR.is_match(citation) {
        flag(
            FlagKind::MissingAuthor,
            Severity::Medium,
            "No clear author pattern found",
        );
    }
    if !YEAR.is_match(citation) {
        flag(
            FlagKind::MissingYear,
            Severity::Medium,
            "No publication year found",
        );
    }
    if !SOURCE.is_match(citation) {
        flag(
            FlagKind::MissingSource,
            Severity::High,
            "No verifiable source (URL/DOI/arXiv) found",
        );
    }
    if OVERCONFIDENT.is_match(citation) {
        flag(
            FlagKind::OverconfidentLanguage,
            Severity::Low,
            "Contains overly confident language",
        );
    }

    flags
}

fn unverified_quotes(citation: &str, context: &str) -> Vec<DetectionFlag> {
    let context = context.to_lowercase();
    QUOTE
        .captures_iter(citation)
        .filter_map(|cap| {
            let quote = cap[1].to_lowercase();
            (quote_similarity(&quote, &context) < QUOTE_SIMILARITY_FLOOR).then(|| {
                let preview: String = cap[1].chars().take(50).collect();
                DetectionFlag {
                    kind: FlagKind::UnverifiedQuote,
                    matched: Some(cap[1].to_string()),
                    severity: Severity::High,
                    description: format!("Quote not found in context: '{}'", preview),
                }
            })
        })
        .collect()
}

/// Sorensen-Dice ratio of the quote against the whole context, both
/// already lowercased.
pub fn quote_similarity(quote: &str, context: &str) -> f64 {
    if quote.is_empty() {
        return 0.0;
    }
    sorensen_dice(quote, context)
}

fn recommendation(probability: f64, flag_count: usize) -> String {
    if probability >= 0.8 {
        format!(
            "LIKELY HALLUCINATED - Found {} red flags. Do not trust this citation.",
            flag_count
        )
    } else if probability >= 0.5 {
        format!(
            "SUSPICIOUS - {} issues detected. Verify manually before use.",
            flag_count
        )
    } else if probability >= 0.3 {
        "CAUTION - Minor issues detected. Cross-check with the original source.".to_string()
    } else {
        "APPEARS CREDIBLE - No major hallucination patterns detected.".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn kinds(report: &HallucinationReport) -> Vec<FlagKind> {
        report.flags.iter().map(|f| f.kind).collect()
    }

    #[test]
    fn well_formed_citation_is_credible() {
        let report = HallucinationDetector::new().detect(
            "Brown et al. (2020). Language Models are Few-Shot Learners. arXiv:2005.14165",
            None,
        );
        assert!(report.flags.is_empty(), "{:?}", report.flags);
        assert_eq!(report.hallucination_probability, 0.0);
        assert!(report.recommendation.starts_with("APPEARS CREDIBLE"));
    }

    #[test]
    fn future_year_and_placeholder_url_are_flagged() {
        let report = HallucinationDetector::new().detect(
            "Johnson et al. (2035). Quantum results. https://example.com/paper",
            None,
        );
        let kinds = kinds(&report);
        assert!(kinds.contains(&FlagKind::ImpossibleYear));
        assert!(kinds.contains(&FlagKind::SuspiciousUrl));
        assert!(report.is_likely_hallucinated);
    }

    #[test]
    fn every_match_counts() {
        let report = HallucinationDetector::new().detect(
            "Smith et al. (2019) and (2031) and (2032) doi:10.1038/abc",
            None,
        );
        let years = report
            .flags
            .iter()
            .filter(|f| f.kind == FlagKind::ImpossibleYear)
            .count();
        assert_eq!(years, 2);
        assert!((report.hallucination_probability - 0.6).abs() < 1e-9);
    }

    #[test]
    fn bare_text_gets_structural_flags() {
        let report = HallucinationDetector::new().detect("some claim that is obviously true", None);
        let kinds = kinds(&report);
        assert!(kinds.contains(&FlagKind::MissingAuthor));
        assert!(kinds.contains(&FlagKind::MissingYear));
        assert!(kinds.contains(&FlagKind::MissingSource));
        assert!(kinds.contains(&FlagKind::OverconfidentLanguage));
        assert!((report.hallucination_probability - 0.4).abs() < 1e-9);
    }

    #[test]
    fn quote_absent_from_context_is_flagged() {
        let detector = HallucinationDetector::new();
        let citation = r#"Smith et al. (2019) wrote "vaccines cause radical telepathy" doi:10.1000/xyz"#;

        let report = detector.detect(citation, Some("The study measured antibody response."));
        assert!(kinds(&report).contains(&FlagKind::UnverifiedQuote));

        let report = detector.detect(
            citation,
            Some("They concluded that Vaccines cause radical telepathy in mice."),
        );
        assert!(!kinds(&report).contains(&FlagKind::UnverifiedQuote));
    }

    #[test]
    fn short_quote_in_long_context_scores_low() {
        let context = "the trial enrolled four hundred adults across twelve sites and followed \
            them for two years, recording adverse events, dropout, adherence and the primary \
            outcome at every visit; secondary outcomes included quality of life, hospital \
            admissions and cost, and an independent board reviewed the data twice. it works";
        assert!(context.contains("it works"));
        assert!(quote_similarity("it works", context) < QUOTE_SIMILARITY_FLOOR);
        assert_eq!(quote_similarity("it works", "it works"), 1.0);

        let citation = r#"Lee et al. (2021) reported "it works" doi:10.1000/trial"#;
        let report = HallucinationDetector::new().detect(citation, Some(context));
        assert!(kinds(&report).contains(&FlagKind::UnverifiedQuote));
    }

    #[test]
    fn batch_pairs_contexts_by_index() {
        let detector = HallucinationDetector::new();
        let reports = detector.detect_batch(
            &["a".to_string(), "Brown et al. (2020) arXiv:2005.14165".to_string()],
            &[None],
        );
        assert_eq!(reports.len(), 2);
        assert!(reports[0].total_flags > reports[1].total_flags);
    }

    proptest! {
        #[test]
        fn probability_is_bounded_and_consistent(citation in ".{0,200}", context in proptest::option::of(".{0,200}")) {
            let report = HallucinationDetector::new().detect(&citation, context.as_deref());
            prop_assert!((0.0..=1.0).contains(&report.hallucination_probability));
            prop_assert_eq!(report.is_likely_hallucinated, report.hallucination_probability > 0.5);
            prop_assert_eq!(report.total_flags, report.flags.len());
            prop_assert!((report.credibility_score + report.hallucination_probability - 1.0).abs() < 1e-9);
        }
    }
}
