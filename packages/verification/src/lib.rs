//! Multi-layer Citation Verification Engine
//!
//! Decides whether an academic citation is real, correctly attributed and
//! supports the claim made with it. Independent evidence layers each report
//! a status and a confidence; a precedence-ordered aggregator turns them
//! into one verdict: `verified`, `suspicious`, `fake`, `url_broken` or
//! `unknown`.
//!
//! # Design
//!
//! - Every external signal sits behind a trait (registries, URL check, page
//!   fetcher, embedder, completion providers) so it can be mocked
//! - A failing signal degrades its layer, never the whole verification
//! - Identifier existence is not enough: year and author are cross-checked
//!   against the canonical record
//! - Registry lookups are memoized in a pluggable cache
//!
//! # Usage
//!
//! ```rust,ignore
//! use verification::{Citation, VerificationOptions, Verifier};
//!
//! let verifier = Verifier::builder().build();
//! let citation = Citation::new("Brown et al. (2020), arXiv:2005.14165")
//!     .with_context("Large language models are few-shot learners.");
//!
//! let result = verifier.verify(&citation, &VerificationOptions::default()).await?;
//! println!("{} ({:.1})", result.status.as_str(), result.confidence);
//! ```
//!
//! # Modules
//!
//! - [`engine`] - The verifier, aggregation and citation segmentation
//! - [`clients`] - Crossref, arXiv, OpenAlex and the URL check
//! - [`content`] - Page fetching, text extraction and semantic alignment
//! - [`ai`] - Ranked completion providers and score extraction
//! - [`detector`] - Rule-based hallucination patterns
//! - [`metadata`] - Year/author cross-checks and network reputation
//! - [`temporal`] - Date impossibility checks
//! - [`cache`] - Cache facade and stores
//! - [`security`] - Credential handling and SSRF protection
//! - [`testing`] - Mock implementations for testing

pub mod ai;
pub mod cache;
pub mod claims;
pub mod clients;
pub mod content;
pub mod detector;
pub mod engine;
pub mod error;
pub mod identifiers;
pub mod metadata;
pub mod security;
pub mod temporal;
pub mod testing;
pub mod types;

// Re-export core types at crate root
pub use ai::{AiScorer, CompletionProvider, GeminiProvider, OpenAIProvider};
pub use cache::{Cache, CacheStore, MemoryCacheStore};
pub use claims::ClaimExtractor;
pub use clients::{
    ArxivClient, CitationNetworkSource, CrossrefClient, HttpUrlChecker, MetadataSource,
    OpenAlexClient, PreprintSource, RateLimited, UrlChecker,
};
pub use content::embedding::Embedder;
pub use content::fetch::PageFetcher;
pub use content::{ClaimTermEmbedder, FirecrawlFetcher, HttpPageFetcher, OpenAIEmbedder};
pub use detector::HallucinationDetector;
pub use engine::{Verifier, VerifierBuilder};
pub use error::{ClientError, Result, SecurityError, VerificationError};
pub use identifiers::Identifiers;
pub use security::{ExposeSecret, SecretString, UrlValidator, VettedUrl};
pub use types::{
    BatchOutcome, BatchVerificationResult, Citation, CitationSuggestion, Claim, ClaimType,
    HallucinationReport, LayerResult, LayerStatus, LayerTimeouts, LayerWeights, Priority,
    TextFormat, TextVerificationResult, VerificationLayers, VerificationOptions,
    VerificationResult, VerificationStatus, VerifierConfig,
};
