//! Bibliographic cross-checks.
//!
//! An identifier that resolves is not enough: the year and author written in
//! the citation must also agree with the canonical record. A resolvable
//! identifier with contradicting details is a *partial hallucination*, which
//! is reported separately from both "verified" and "not found".

use serde::{Deserialize, Serialize};

use crate::clients::{NetworkRecord, PreprintRecord, WorkRecord};
use crate::error::ClientError;
use crate::identifiers::Identifiers;
use crate::types::{CitationSuggestion, LayerResult};

const YEAR_MISMATCH_PENALTY: f64 = 0.4;
const AUTHOR_MISMATCH_PENALTY: f64 = 0.3;
const CONFIDENCE_FLOOR: f64 = 0.1;
const UNREACHABLE_CONFIDENCE: f64 = 0.3;

/// Base confidence for a clean Crossref match.
pub const CROSSREF_CONFIDENCE: f64 = 1.0;
/// Base confidence for a clean arXiv match.
pub const ARXIV_CONFIDENCE: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataVerdict {
    Verified,
    PartialHallucination,
    NotFound,
    Unreachable,
}

impl MetadataVerdict {
    /// Lower ranks win when several identifiers disagree.
    fn rank(&self) -> u8 {
        match self {
            Self::NotFound => 0,
            Self::PartialHallucination => 1,
            Self::Verified => 2,
            Self::Unreachable => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum Mismatch {
    Year { claimed: i32, actual: i32 },
    Author { claimed: String, actual: Vec<String> },
}

/// Registry record reduced to what the comparison needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub source: String,
    pub identifier: String,
    pub title: Option<String>,
    /// Surnames only.
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub url: Option<String>,
}

impl From<WorkRecord> for CanonicalRecord {
    fn from(work: WorkRecord) -> Self {
        Self {
            source: "crossref".to_string(),
            url: Some(format!("https://doi.org/{}", work.doi)),
            identifier: work.doi,
            title: work.title,
            authors: work.authors,
            year: work.year,
        }
    }
}

impl From<PreprintRecord> for CanonicalRecord {
    fn from(preprint: PreprintRecord) -> Self {
        Self {
            source: "arxiv".to_string(),
            authors: preprint.surnames(),
            url: Some(format!("https://arxiv.org/abs/{}", preprint.arxiv_id)),
            identifier: preprint.arxiv_id,
            title: Some(preprint.title),
            year: preprint.year,
        }
    }
}

/// Outcome of checking one identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataCheck {
    pub source: String,
    pub identifier: String,
    pub verdict: MetadataVerdict,
    pub verified: bool,
    pub confidence: f64,
    pub reason: String,
    pub mismatches: Vec<Mismatch>,
    pub record: Option<CanonicalRecord>,
}

impl MetadataCheck {
    /// Compare the citation's claimed year and author against `record`.
    pub fn cross_check(identifiers: &Identifiers, record: CanonicalRecord, base: f64) -> Self {
        let mut mismatches = Vec::new();

        if let (Some(claimed), Some(actual)) = (identifiers.claimed_year, record.year) {
            if claimed != actual {
                mismatches.push(Mismatch::Year { claimed, actual });
            }
        }

        if let Some(claimed) = &identifiers.claimed_author {
            if !record.authors.is_empty() && !author_matches(claimed, &record.authors) {
                mismatches.push(Mismatch::Author {
                    claimed: claimed.clone(),
                    actual: record.authors.clone(),
                });
            }
        }

        let penalty: f64 = mismatches
            .iter()
            .map(|m| match m {
                Mismatch::Year { .. } => YEAR_MISMATCH_PENALTY,
                Mismatch::Author { .. } => AUTHOR_MISMATCH_PENALTY,
            })
            .sum();
        let confidence = round2((base - penalty).max(CONFIDENCE_FLOOR));

        let (verdict, reason) = if mismatches.is_empty() {
            (
                MetadataVerdict::Verified,
                format!("{} record matches the cited details", record.source),
            )
        } else {
            (
                MetadataVerdict::PartialHallucination,
                format!(
                    "{} resolves to a real record but {}",
                    record.identifier,
                    describe(&mismatches)
                ),
            )
        };

        Self {
            source: record.source.clone(),
            identifier: record.identifier.clone(),
            verified: verdict == MetadataVerdict::Verified,
            verdict,
            confidence,
            reason,
            mismatches,
            record: Some(record),
        }
    }

    /// Map a client failure to an unverified outcome.
    pub fn from_error(source: &str, identifier: &str, err: &ClientError) -> Self {
        let (verdict, confidence, reason) = if err.is_not_found() {
            (
                MetadataVerdict::NotFound,
                0.0,
                format!("{} not found in {}", identifier, source),
            )
        } else {
            (
                MetadataVerdict::Unreachable,
                UNREACHABLE_CONFIDENCE,
                format!("could not check {} against {}: {}", identifier, source, err),
            )
        };
        Self {
            source: source.to_string(),
            identifier: identifier.to_string(),
            verdict,
            verified: false,
            confidence,
            reason,
            mismatches: Vec::new(),
            record: None,
        }
    }

    /// Pick the outcome that should speak for the citation.
    pub fn dominant(checks: Vec<MetadataCheck>) -> Option<MetadataCheck> {
        checks.into_iter().min_by_key(|c| c.verdict.rank())
    }

    pub fn to_layer(&self) -> LayerResult {
        let layer = match self.verdict {
            MetadataVerdict::Verified => LayerResult::passed(self.confidence, &self.reason),
            MetadataVerdict::PartialHallucination | MetadataVerdict::NotFound => {
                LayerResult::failed(self.confidence, &self.reason)
            }
            MetadataVerdict::Unreachable => LayerResult::warning(self.confidence, &self.reason),
        };
        let layer = layer
            .with_metadata("source", &self.source)
            .with_metadata("identifier", &self.identifier)
            .with_metadata("verdict", self.verdict)
            .with_metadata(
                "partial_hallucination",
                self.verdict == MetadataVerdict::PartialHallucination,
            );
        let layer = if self.mismatches.is_empty() {
            layer
        } else {
            layer.with_metadata("mismatches", &self.mismatches)
        };
        match &self.record {
            Some(record) => layer.with_metadata("record", record),
            None => layer,
        }
    }

    /// The canonical record, offered when the citation garbled it.
    pub fn suggestion(&self) -> Option<CitationSuggestion> {
        if self.verdict != MetadataVerdict::PartialHallucination {
            return None;
        }
        let record = self.record.as_ref()?;
        Some(CitationSuggestion {
            title: record.title.clone()?,
            authors: record.authors.clone(),
            year: record.year,
            doi: (record.source == "crossref").then(|| record.identifier.clone()),
            url: record.url.clone(),
            confidence: 0.9,
            reason: format!("{} actually refers to this work", record.identifier),
        })
    }
}

/// Case-insensitive surname match, tolerant of compound surnames.
pub fn author_matches(claimed: &str, authors: &[String]) -> bool {
    let claimed = claimed.to_lowercase();
    authors.iter().any(|author| {
        let author = author.to_lowercase();
        author == claimed || author.split([' ', '-']).any(|part| part == claimed)
    })
}

fn describe(mismatches: &[Mismatch]) -> String {
    mismatches
        .iter()
        .map(|m| match m {
            Mismatch::Year { claimed, actual } => {
                format!("cited year {} differs from {}", claimed, actual)
            }
            Mismatch::Author { claimed, .. } => {
                format!("cited author {} is not among its authors", claimed)
            }
        })
        .collect::<Vec<_>>()
        .join(" and ")
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Reputation read from the citation network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkAssessment {
    pub verified: bool,
    pub confidence: f64,
    pub cited_by_count: u64,
    pub flags: Vec<String>,
}

impl NetworkAssessment {
    /// Start at 0.5; heavy citation raises it, an uncited older work or a
    /// work with no authors lowers it.
    pub fn assess(record: &NetworkRecord, current_year: i32) -> Self {
        let mut confidence: f64 = 0.5;
        let mut flags = Vec::new();

        if record.cited_by_count > 50 {
            confidence += 0.3;
            flags.push("well_cited".to_string());
        } else if record.cited_by_count == 0 {
            let age = record.publication_year.map(|y| current_year - y).unwrap_or(0);
            if age > 2 {
                confidence -= 0.2;
                flags.push("never_cited".to_string());
            }
        }

        if record.author_count == 0 {
            confidence -= 0.4;
            flags.push("no_authors".to_string());
        }

        let confidence = round2(confidence.max(CONFIDENCE_FLOOR));
        Self {
            verified: confidence > 0.5,
            confidence,
            cited_by_count: record.cited_by_count,
            flags,
        }
    }

    pub fn to_layer(&self) -> LayerResult {
        let details = format!("cited by {} works", self.cited_by_count);
        let layer = if self.verified {
            LayerResult::passed(self.confidence, details)
        } else {
            LayerResult::warning(self.confidence, details)
        };
        layer
            .with_metadata("cited_by_count", self.cited_by_count)
            .with_metadata("flags", &self.flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(authors: &[&str], year: Option<i32>) -> CanonicalRecord {
        CanonicalRecord {
            source: "crossref".into(),
            identifier: "10.1000/xyz123".into(),
            title: Some("Real paper".into()),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            year,
            url: Some("https://doi.org/10.1000/xyz123".into()),
        }
    }

    #[test]
    fn matching_details_verify() {
        let ids = Identifiers::extract("Smith, J. (2019). Real paper. doi:10.1000/xyz123");
        let check = MetadataCheck::cross_check(&ids, record(&["Smith", "Lee"], Some(2019)), 1.0);
        assert_eq!(check.verdict, MetadataVerdict::Verified);
        assert!(check.verified);
        assert_eq!(check.confidence, 1.0);
        assert!(check.suggestion().is_none());
    }

    #[test]
    fn year_and_author_mismatch_is_partial_hallucination() {
        let ids = Identifiers::extract("Smith (2019). Real paper. doi:10.1000/xyz123");
        let check = MetadataCheck::cross_check(&ids, record(&["Garcia", "Lee"], Some(2021)), 1.0);

        assert_eq!(check.verdict, MetadataVerdict::PartialHallucination);
        assert!(!check.verified);
        assert_eq!(check.mismatches.len(), 2);
        assert!(check.confidence <= 0.3);
        assert!(check.to_layer().is_failed());

        let suggestion = check.suggestion().unwrap();
        assert_eq!(suggestion.year, Some(2021));
        assert_eq!(suggestion.doi.as_deref(), Some("10.1000/xyz123"));
    }

    #[test]
    fn confidence_floors_at_point_one() {
        let ids = Identifiers::extract("Smith (2019)");
        let check = MetadataCheck::cross_check(&ids, record(&["Garcia"], Some(2021)), 0.5);
        assert_eq!(check.confidence, 0.1);
    }

    #[test]
    fn not_found_beats_verified() {
        let ids = Identifiers::extract("Smith (2019)");
        let ok = MetadataCheck::cross_check(&ids, record(&["Smith"], Some(2019)), 1.0);
        let missing = MetadataCheck::from_error(
            "arxiv",
            "2101.00001",
            &ClientError::NotFound {
                service: "arxiv",
                status: 404,
            },
        );
        let dominant = MetadataCheck::dominant(vec![ok, missing]).unwrap();
        assert_eq!(dominant.verdict, MetadataVerdict::NotFound);
        assert_eq!(dominant.confidence, 0.0);
    }

    #[test]
    fn transport_failure_is_unreachable_warning() {
        let check = MetadataCheck::from_error(
            "crossref",
            "10.1000/x",
            &ClientError::Timeout { service: "crossref" },
        );
        assert_eq!(check.verdict, MetadataVerdict::Unreachable);
        assert_eq!(check.to_layer().status, crate::types::LayerStatus::Warning);
    }

    #[test]
    fn compound_surnames_match() {
        assert!(author_matches("garcia", &["García-Garcia".to_string(), "Lee".to_string()]));
        assert!(author_matches("Lee", &["lee".to_string()]));
        assert!(!author_matches("Smith", &["Smithson".to_string()]));
    }

    #[test]
    fn network_reputation() {
        let cited = NetworkRecord {
            doi: "10.1000/a".into(),
            cited_by_count: 120,
            publication_year: Some(2015),
            author_count: 3,
        };
        let assessed = NetworkAssessment::assess(&cited, 2024);
        assert!(assessed.verified);
        assert_eq!(assessed.confidence, 0.8);

        let orphan = NetworkRecord {
            cited_by_count: 0,
            author_count: 0,
            ..cited
        };
        let assessed = NetworkAssessment::assess(&orphan, 2024);
        assert!(!assessed.verified);
        assert_eq!(assessed.confidence, 0.1);
        assert!(assessed.flags.contains(&"never_cited".to_string()));
    }
}
