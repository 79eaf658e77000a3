//! Caller-facing inputs: the citation itself and the per-request switches.

use serde::{Deserialize, Serialize};

/// A citation string as written by an author, plus the surrounding prose.
///
/// Identifiers (DOI, arXiv id, URL) are extracted from `text`; they are not
/// separate input fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub text: String,

    /// The claim the citation is supposed to support.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Citation {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.context = if context.trim().is_empty() {
            None
        } else {
            Some(context)
        };
        self
    }
}

fn enabled() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    30
}

/// Per-request layer switches.
///
/// Every field has a serde default so partial JSON bodies deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOptions {
    /// Run the generative-model assessment. Default: true.
    #[serde(default = "enabled")]
    pub enable_ai_scoring: bool,

    /// Fetch the cited page and compare it to the context. Default: true.
    #[serde(default = "enabled")]
    pub check_content: bool,

    /// Query citation-network reputation. Default: true.
    #[serde(default = "enabled")]
    pub enable_citation_graph: bool,

    /// Run the date-impossibility checks. Default: true.
    #[serde(default = "enabled")]
    pub check_temporal: bool,

    /// Run the rule-based hallucination detector. Default: true.
    #[serde(default = "enabled")]
    pub check_patterns: bool,

    /// Read and write the registry cache. Default: true.
    #[serde(default = "enabled")]
    pub use_cache: bool,

    /// Overall budget for one citation. Default: 30.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for VerificationOptions {
    fn default() -> Self {
        Self {
            enable_ai_scoring: true,
            check_content: true,
            enable_citation_graph: true,
            check_temporal: true,
            check_patterns: true,
            use_cache: true,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl VerificationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ai_scoring(mut self, enabled: bool) -> Self {
        self.enable_ai_scoring = enabled;
        self
    }

    pub fn with_content_check(mut self, enabled: bool) -> Self {
        self.check_content = enabled;
        self
    }

    pub fn with_citation_graph(mut self, enabled: bool) -> Self {
        self.enable_citation_graph = enabled;
        self
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.use_cache = enabled;
        self
    }
}

/// Batch execution profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Cheap layers only: no content fetch, no AI.
    Speed,
    /// All layers with trimmed timeouts.
    #[default]
    Balanced,
    /// All layers with full timeouts.
    Accuracy,
}

/// Markup of a free-text body passed to verify-text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFormat {
    #[default]
    Plain,
    Markdown,
    Html,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_options_fill_defaults() {
        let opts: VerificationOptions =
            serde_json::from_str(r#"{"enable_ai_scoring": false}"#).unwrap();
        assert!(!opts.enable_ai_scoring);
        assert!(opts.check_content);
        assert!(opts.use_cache);
        assert_eq!(opts.timeout_seconds, 30);
    }

    #[test]
    fn blank_context_is_dropped() {
        let c = Citation::new("Smith (2019)").with_context("   ");
        assert!(c.context.is_none());
    }

    #[test]
    fn priority_parses_lowercase() {
        let p: Priority = serde_json::from_str(r#""speed""#).unwrap();
        assert_eq!(p, Priority::Speed);
        assert_eq!(Priority::default(), Priority::Balanced);
    }
}
