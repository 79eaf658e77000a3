//! Identifier extraction from free-form citation text.
//!
//! Every layer works from the same [`Identifiers`] so a DOI or arXiv id is
//! recognized the same way by the metadata check, the content fetcher and
//! the temporal heuristics.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref DOI: Regex = Regex::new(r#"(?i)\b(10\.\d{4,9}/[^\s"<>]+)"#).unwrap();
    static ref ARXIV: Regex = Regex::new(
        r"(?i)(?:arxiv:\s*|arxiv\.org/(?:abs|pdf)/)(\d{4}\.\d{4,5}(?:v\d+)?)"
    )
    .unwrap();
    static ref URL: Regex = Regex::new(r#"(?i)\bhttps?://[^\s<>"]+"#).unwrap();
    static ref YEAR: Regex = Regex::new(r"\b(19\d{2}|20\d{2})\b").unwrap();
    static ref PAREN_YEAR: Regex = Regex::new(r"\((\d{4})[a-z]?\)").unwrap();
    static ref BARE_ARXIV_ID: Regex = Regex::new(r"\b\d{4}\.\d{4,5}(?:v\d+)?\b").unwrap();
    static ref SURNAME: Regex = Regex::new(r"\b([A-Z][a-z]+(?:[-'][A-Z][a-z]+)?)\b").unwrap();
}

/// Capitalized words that start citations but are never author surnames.
const NON_AUTHOR_WORDS: &[&str] = &[
    "The", "A", "An", "In", "On", "See", "Also", "According", "As", "From", "This", "These",
    "That", "Journal", "Proceedings", "Retrieved", "Available", "Accessed", "Vol", "No",
];

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', ')', ']', '}', '\'', '"'];

/// Identifiers and bibliographic hints found in a citation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifiers {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arxiv_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Four-digit years 1900-2099, identifiers excluded, in order of appearance.
    pub years: Vec<i32>,

    /// Year written as "(YYYY)".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_year: Option<i32>,

    /// First surname-like token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_author: Option<String>,
}

impl Identifiers {
    pub fn extract(text: &str) -> Self {
        let doi = DOI
            .captures(text)
            .map(|c| trim_trailing(&c[1]).to_string());
        let arxiv_id = ARXIV.captures(text).map(|c| c[1].to_string());
        let url = URL.find(text).map(|m| trim_trailing(m.as_str()).to_string());

        let stripped = strip_identifiers(text);
        let years = extract_years(&stripped);
        let claimed_year = PAREN_YEAR
            .captures(&stripped)
            .and_then(|c| c[1].parse().ok());
        let claimed_author = SURNAME
            .captures_iter(&stripped)
            .map(|c| c[1].to_string())
            .find(|word| !NON_AUTHOR_WORDS.contains(&word.as_str()));

        Self {
            doi,
            arxiv_id,
            url,
            years,
            claimed_year,
            claimed_author,
        }
    }

    /// True when the citation carries something a registry can resolve.
    pub fn has_registry_identifier(&self) -> bool {
        self.doi.is_some() || self.arxiv_id.is_some()
    }

    /// Best page to fetch for content alignment: an explicit URL, then the
    /// DOI resolver, then the arXiv abstract page.
    pub fn source_url(&self) -> Option<String> {
        self.url
            .clone()
            .or_else(|| self.doi.as_ref().map(|d| format!("https://doi.org/{}", d)))
            .or_else(|| {
                self.arxiv_id
                    .as_ref()
                    .map(|id| format!("https://arxiv.org/abs/{}", id))
            })
    }
}

/// Remove URLs, DOIs and arXiv ids so their digits are not read as years.
pub fn strip_identifiers(text: &str) -> String {
    let without_urls = URL.replace_all(text, " ");
    let without_dois = DOI.replace_all(&without_urls, " ");
    let without_arxiv = ARXIV.replace_all(&without_dois, " ");
    BARE_ARXIV_ID.replace_all(&without_arxiv, " ").into_owned()
}

/// Distinct years 1900-2099 in order of first appearance.
pub fn extract_years(text: &str) -> Vec<i32> {
    let mut years: Vec<i32> = Vec::new();
    for cap in YEAR.captures_iter(text) {
        if let Ok(year) = cap[1].parse::<i32>() {
            if !years.contains(&year) {
                years.push(year);
            }
        }
    }
    years
}

fn trim_trailing(s: &str) -> &str {
    s.trim_end_matches(TRAILING_PUNCTUATION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_doi_without_trailing_period() {
        let ids = Identifiers::extract(
            "Jumper, J. et al. (2021). Highly accurate protein structure prediction. Nature. doi:10.1038/s41586-021-03819-2.",
        );
        assert_eq!(ids.doi.as_deref(), Some("10.1038/s41586-021-03819-2"));
        assert_eq!(ids.claimed_year, Some(2021));
        assert_eq!(ids.claimed_author.as_deref(), Some("Jumper"));
    }

    #[test]
    fn arxiv_digits_are_not_years() {
        let ids = Identifiers::extract("Brown et al. (2020), arXiv:2005.14165");
        assert_eq!(ids.arxiv_id.as_deref(), Some("2005.14165"));
        assert_eq!(ids.years, vec![2020]);
        assert_eq!(ids.claimed_author.as_deref(), Some("Brown"));
    }

    #[test]
    fn source_url_prefers_explicit_link() {
        let ids = Identifiers::extract("See https://example.org/paper.pdf and doi:10.1000/xyz123");
        assert_eq!(ids.source_url().as_deref(), Some("https://example.org/paper.pdf"));

        let ids = Identifiers::extract("Smith (2019) doi:10.1000/xyz123");
        assert_eq!(ids.source_url().as_deref(), Some("https://doi.org/10.1000/xyz123"));

        let ids = Identifiers::extract("Brown (2020) arXiv:2005.14165v2");
        assert_eq!(
            ids.source_url().as_deref(),
            Some("https://arxiv.org/abs/2005.14165v2")
        );
    }

    #[test]
    fn skips_leading_non_author_words() {
        let ids = Identifiers::extract("The Smith report (2019)");
        assert_eq!(ids.claimed_author.as_deref(), Some("Smith"));
    }

    #[test]
    fn years_are_distinct_and_ordered() {
        assert_eq!(extract_years("1999, 2005 and again 1999"), vec![1999, 2005]);
        assert!(extract_years("in 1850 and 2150").is_empty());
    }
}
