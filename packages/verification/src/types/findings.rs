//! Outputs of the pure analysers: detector flags and extracted claims.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Score contribution of a pattern match at this severity.
    pub fn weight(&self) -> f64 {
        match self {
            Self::High => 0.3,
            Self::Medium => 0.15,
            Self::Low => 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    ImpossibleYear,
    FakeDoiStructure,
    NonexistentJournal,
    FakeArxiv,
    SuspiciousUrl,
    MissingAuthor,
    MissingYear,
    MissingSource,
    OverconfidentLanguage,
    UnverifiedQuote,
}

/// One suspicious feature found by the hallucination detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionFlag {
    #[serde(rename = "type")]
    pub kind: FlagKind,

    /// The text that triggered the flag, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,

    pub severity: Severity,
    pub description: String,
}

/// Result of running the detector over one citation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HallucinationReport {
    pub is_likely_hallucinated: bool,
    pub hallucination_probability: f64,
    pub credibility_score: f64,
    pub flags: Vec<DetectionFlag>,
    pub total_flags: usize,
    pub recommendation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimType {
    Statistical,
    Cited,
    Research,
    General,
}

/// A sentence that asserts something checkable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub text: String,
    #[serde(rename = "type")]
    pub claim_type: ClaimType,
    pub needs_verification: bool,
}
