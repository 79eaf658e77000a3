//! Claim extraction: free text in, checkable sentences out.
//!
//! Pure and deterministic. Sentences split on `.`, `!` or `?` runs followed
//! by whitespace or the end of the text. Decimals never end a sentence, and
//! neither does an abbreviation such as "et al." or "Fig." when what follows
//! cannot open a sentence: a bracket, a digit or a comma, as in
//! "Smith et al. (2019)" or "Fig. 3". Any word, lowercase included, opens a
//! new sentence, so joining extracted claims with ". " splits back into
//! the same claims.

use lazy_static::lazy_static;
use regex::Regex;

use crate::types::{Claim, ClaimType};

const MIN_CLAIM_CHARS: usize = 10;

const ABBREVIATIONS: &[&str] = &[
    "al", "e.g", "i.e", "etc", "vs", "fig", "figs", "eq", "dr", "mr", "mrs", "ms", "prof",
    "no", "vol", "pp", "cf", "approx", "ca", "ed", "eds",
];

lazy_static! {
    static ref CITATION_TOKEN: Regex = Regex::new(r"\(\d{4}\)|\[\d+\]|\bet\s+al\b").unwrap();
    static ref STATISTIC: Regex =
        Regex::new(r"(?i)\d+(?:\.\d+)?\s?%|\b\d+\s+(?:percent|cases|studies)\b").unwrap();
    static ref DEFINITIVE_VERB: Regex =
        Regex::new(r"(?i)\b(?:is|are|was|demonstrates|shows|proves)\b").unwrap();
    static ref STATISTICAL: Regex = Regex::new(r"(?i)\d+(?:\.\d+)?\s?%|\b\d+\s+percent\b").unwrap();
    static ref CITED: Regex = Regex::new(r"(?i)according to|cited in|\(\d{4}\)").unwrap();
    static ref RESEARCH: Regex =
        Regex::new(r"(?i)\b(?:study|studies|research|papers?|articles?)\b").unwrap();
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimExtractor;

impl ClaimExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, text: &str) -> Vec<Claim> {
        split_sentences(text)
            .into_iter()
            .filter(|s| s.chars().count() >= MIN_CLAIM_CHARS)
            .filter(|s| is_factual(s))
            .map(|s| Claim {
                claim_type: classify(s),
                text: s.to_string(),
                needs_verification: true,
            })
            .collect()
    }
}

fn is_factual(sentence: &str) -> bool {
    CITATION_TOKEN.is_match(sentence)
        || STATISTIC.is_match(sentence)
        || DEFINITIVE_VERB.is_match(sentence)
}

/// First matching rule wins: statistical, cited, research, general.
pub fn classify(sentence: &str) -> ClaimType {
    if STATISTICAL.is_match(sentence) {
        ClaimType::Statistical
    } else if CITED.is_match(sentence) {
        ClaimType::Cited
    } else if RESEARCH.is_match(sentence) {
        ClaimType::Research
    } else {
        ClaimType::General
    }
}

/// Split text into trimmed sentences with their terminators removed.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        if !matches!(c, '.' | '!' | '?') {
            i += 1;
            continue;
        }

        let mut j = i;
        while j < chars.len() && matches!(chars[j].1, '.' | '!' | '?') {
            j += 1;
        }
        let at_end = j == chars.len();
        let before_space = !at_end && chars[j].1.is_whitespace();

        if (at_end || before_space) && !protected_abbreviation(text, start, pos, &chars[j..]) {
            push_trimmed(&mut sentences, &text[start..pos]);
            start = if at_end { text.len() } else { chars[j].0 };
        }
        i = j;
    }

    if start < text.len() {
        push_trimmed(&mut sentences, &text[start..]);
    }
    sentences
}

/// True when the terminator at `pos` closes an abbreviation that the
/// following text continues.
fn protected_abbreviation(text: &str, start: usize, pos: usize, rest: &[(usize, char)]) -> bool {
    let word = text[start..pos]
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or("")
        .trim_start_matches(['(', '[', '"'])
        .to_lowercase();
    if !ABBREVIATIONS.contains(&word.as_str()) {
        return false;
    }
    let next = rest.iter().map(|(_, c)| *c).find(|c| !c.is_whitespace());
    matches!(next, Some(c) if continues_sentence(c))
}

fn continues_sentence(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '(' | '[' | ',' | ';' | ':')
}

fn push_trimmed<'a>(out: &mut Vec<&'a str>, s: &'a str) {
    let s = s.trim();
    if !s.is_empty() {
        out.push(s);
    }
}
