//! The pattern rule table.
//!
//! Rules are data: adding a pattern means adding a row, not a code path.
//! The `regex` crate has no look-around, so "X not followed by Y" is written
//! as a match pattern plus an anchored exemption tested at the match start.

use lazy_static::lazy_static;
use regex::Regex;

use crate::types::{FlagKind, Severity};

/// One row of the rule table, before compilation.
pub struct PatternRule {
    pub kind: FlagKind,
    pub pattern: &'static str,
    pub severity: Severity,
    pub description: &'static str,
    /// A match is discarded when this pattern matches at its start.
    pub exemption: Option<&'static str>,
}

pub const PATTERN_RULES: &[PatternRule] = &[
    PatternRule {
        kind: FlagKind::ImpossibleYear,
        pattern: r"\b(20[3-9]\d|2[1-9]\d{2})\b",
        severity: Severity::High,
        description: "Year appears to be in the future",
        exemption: None,
    },
    PatternRule {
        kind: FlagKind::FakeDoiStructure,
        pattern: r"\b10\.",
        severity: Severity::Medium,
        description: "DOI prefix lacks a valid registrant code",
        exemption: Some(r"^10\.\d{4}"),
    },
    PatternRule {
        kind: FlagKind::NonexistentJournal,
        pattern: r"\b(Nature|Science|Cell|Lancet)\s+\d{4}\b",
        severity: Severity::Low,
        description: "Journal name without volume/issue",
        exemption: None,
    },
    PatternRule {
        kind: FlagKind::FakeArxiv,
        pattern: r"arXiv:",
        severity: Severity::High,
        description: "Invalid arXiv ID format",
        exemption: Some(r"^arXiv:\s*\d{4}\.\d{4,5}"),
    },
    PatternRule {
        kind: FlagKind::SuspiciousUrl,
        pattern: r"https?://(?:www\.)?(?:example\.com|test\.org|fake)",
        severity: Severity::High,
        description: "Placeholder or test URL detected",
        exemption: None,
    },
];

pub struct CompiledRule {
    pub rule: &'static PatternRule,
    pub pattern: Regex,
    pub exemption: Option<Regex>,
}

impl CompiledRule {
    /// Non-exempt matches of this rule in `text`.
    pub fn matches<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pattern.find_iter(text).filter_map(move |m| {
            let exempt = self
                .exemption
                .as_ref()
                .is_some_and(|ex| ex.is_match(&text[m.start()..]));
            (!exempt).then_some(m.as_str())
        })
    }
}

fn case_insensitive(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){}", pattern)).unwrap()
}

lazy_static! {
    pub static ref COMPILED_RULES: Vec<CompiledRule> = PATTERN_RULES
        .iter()
        .map(|rule| CompiledRule {
            rule,
            pattern: case_insensitive(rule.pattern),
            exemption: rule.exemption.map(case_insensitive),
        })
        .collect();

    // Author forms: "Smith et al.", "Smith and Jones", "Smith, J.", "Smith (2019)"
    pub static ref AUTHOR: Regex = Regex::new(
        r"\b[A-Z][a-z]+(?:\s+et\s+al\.?|\s+(?:and|&)\s+[A-Z]|,\s+[A-Z]\.|\s+\(\d{4})"
    )
    .unwrap();
    pub static ref YEAR: Regex = Regex::new(r"\b(19|20)\d{2}\b").unwrap();
    pub static ref SOURCE: Regex =
        Regex::new(r"(?i)https?://|doi:|arxiv:|\b10\.\d{4,9}/").unwrap();
    pub static ref OVERCONFIDENT: Regex = Regex::new(
        r"(?i)\b(every|all|always|never|clearly|obviously|undoubtedly)\b"
    )
    .unwrap();
    pub static ref QUOTE: Regex = Regex::new(r#""([^"]+)""#).unwrap();
}
