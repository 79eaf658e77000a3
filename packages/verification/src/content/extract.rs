//! Main-text extraction from scholarly landing pages.

use scraper::{ElementRef, Html, Selector};

/// Elements whose text never counts as content.
const STRIPPED: &[&str] = &[
    "script", "style", "noscript", "nav", "header", "footer", "aside", "iframe", "form",
];

/// Elements that start a new line in [`html_to_text`].
const BLOCKS: &[&str] = &[
    "p", "div", "li", "br", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "section", "article",
    "blockquote", "pre", "dd", "dt",
];

const ABSTRACT_SELECTORS: &[&str] = &[
    "section.abstract",
    "div.abstract",
    "blockquote.abstract",
    "#abstract",
    "div[class*='abstract']",
    "p[class*='abstract']",
    "section[id*='abstract']",
];

const MAIN_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role='main']",
    "div[class*='content']",
    "div[class*='article']",
    "section[class*='body']",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedContent {
    pub abstract_text: Option<String>,
    pub main_text: Option<String>,
    /// Abstract and main text joined, or all paragraphs when neither exists.
    pub text: String,
}

/// Pull readable text out of `html`: abstract first, then the article
/// container, then every paragraph.
pub fn extract_main_text(html: &str) -> ExtractedContent {
    let document = Html::parse_document(html);

    let abstract_text = first_match(&document, ABSTRACT_SELECTORS);
    let main_text = first_match(&document, MAIN_SELECTORS);

    let joined = [abstract_text.as_deref(), main_text.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

    let text = if joined.trim().is_empty() {
        paragraphs(&document)
    } else {
        joined
    };

    ExtractedContent {
        abstract_text,
        main_text,
        text,
    }
}

/// Visible text of a whole document, one line per block element.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut raw = String::new();
    for node in document.root_element().descendants() {
        if let Some(element) = node.value().as_element() {
            if BLOCKS.contains(&element.name()) {
                raw.push('\n');
            }
        } else if let Some(text) = node.value().as_text() {
            if !is_hidden(node.ancestors().filter_map(|a| a.value().as_element().map(|e| e.name()))) {
                raw.push_str(text);
                raw.push(' ');
            }
        }
    }
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn first_match(document: &Html, selectors: &[&str]) -> Option<String> {
    selectors
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|selector| {
            document
                .select(&selector)
                .map(visible_text)
                .find(|text| !text.is_empty())
        })
}

fn paragraphs(document: &Html) -> String {
    let Ok(selector) = Selector::parse("p") else {
        return String::new();
    };
    document
        .select(&selector)
        .map(visible_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text nodes under `element`, skipping boilerplate subtrees, with
/// whitespace collapsed.
fn visible_text(element: ElementRef<'_>) -> String {
    let mut words = Vec::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        if !is_hidden(node.ancestors().filter_map(|a| a.value().as_element().map(|e| e.name()))) {
            words.extend(text.split_whitespace());
        }
    }
    words.join(" ")
}

/// True when any enclosing element is boilerplate.
fn is_hidden<'a>(mut ancestors: impl Iterator<Item = &'a str>) -> bool {
    ancestors.any(|name| STRIPPED.contains(&name))
}
