//! Finding citations inside a document body.
//!
//! When the text has a reference-list heading, every entry under it is a
//! citation. Otherwise sentences carrying an identifier or an author-year
//! token are taken as in-text citations.

use lazy_static::lazy_static;
use regex::Regex;

use crate::claims::split_sentences;
use crate::types::Citation;

const MIN_ENTRY_CHARS: usize = 15;
const MIN_CONTEXT_CHARS: usize = 10;

lazy_static! {
    static ref REFERENCE_HEADING: Regex = Regex::new(
        r"(?im)^\s*(?:#+\s*)?(?:\d+\.?\s*)?(references|bibliography|works cited|literature cited|sources)\s*:?\s*$"
    )
    .unwrap();
    static ref LIST_MARKER: Regex = Regex::new(r"^\s*(?:\[\d+\]|\d+[.)]|[-*\u{2022}])\s*").unwrap();
    static ref MARKDOWN_LINK: Regex = Regex::new(r"\[([^\]]+)\]\((https?://[^)\s]+)\)").unwrap();
    static ref CITATION_SIGNAL: Regex = Regex::new(
        r"(?i)\b10\.\d{4,9}/\S+|arxiv:\s*\d{4}\.\d{4,5}|https?://\S+"
    )
    .unwrap();
    static ref AUTHOR_YEAR: Regex = Regex::new(
        r"\b[A-Z][a-z]+(?:\s+(?:et al\.?|and|&)\s*(?:[A-Z][a-z]+)?)?,?\s*\(?(?:19|20)\d{2}[a-z]?\)?"
    )
    .unwrap();
    static ref BARE_YEAR: Regex = Regex::new(r"\b(?:19|20)\d{2}\b").unwrap();
}

/// Rewrite `[text](url)` as `text url` so the URL survives as plain text.
pub fn flatten_markdown_links(text: &str) -> String {
    MARKDOWN_LINK.replace_all(text, "$1 $2").into_owned()
}

pub fn find_citations(text: &str) -> Vec<Citation> {
    let mut found: Vec<Citation> = match REFERENCE_HEADING.find(text) {
        Some(heading) => reference_entries(&text[heading.end()..]),
        None => in_text_citations(text),
    };
    let mut seen = std::collections::HashSet::new();
    found.retain(|c| seen.insert(c.text.clone()));
    found
}

fn reference_entries(list: &str) -> Vec<Citation> {
    list.lines()
        .map(|line| LIST_MARKER.replace(line, "").trim().to_string())
        .filter(|line| line.chars().count() >= MIN_ENTRY_CHARS)
        .map(Citation::new)
        .collect()
}

fn in_text_citations(text: &str) -> Vec<Citation> {
    text.lines()
        .flat_map(split_sentences)
        .filter(|s| s.chars().count() >= MIN_ENTRY_CHARS)
        .filter(|s| CITATION_SIGNAL.is_match(s) || AUTHOR_YEAR.is_match(s))
        .map(|s| match claim_context(s) {
            Some(context) => Citation::new(s).with_context(context),
            None => Citation::new(s),
        })
        .collect()
}

/// The claim an in-text citation supports: its sentence with the citation
/// tokens taken out. A document body carries no writing date, so years are
/// dropped too; a sentence citing two works must not date itself by one of
/// them.
fn claim_context(sentence: &str) -> Option<String> {
    let stripped = AUTHOR_YEAR.replace_all(sentence, " ");
    let stripped = CITATION_SIGNAL.replace_all(&stripped, " ");
    let stripped = BARE_YEAR.replace_all(&stripped, " ");
    let claim = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    (claim.chars().count() >= MIN_CONTEXT_CHARS).then_some(claim)
}
