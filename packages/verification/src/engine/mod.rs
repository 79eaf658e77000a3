//! The verification engine.
//!
//! [`Verifier`] runs every applicable layer for one citation and merges the
//! evidence into a [`VerificationResult`]. Layer order:
//!
//! 1. URL check. A network failure ends verification with `url_broken`.
//! 2. Evidence layers, concurrently: patterns, metadata, content, temporal,
//!    citation graph. Each has its own deadline; one that runs out becomes
//!    `skipped` without disturbing the others.
//! 3. AI scoring, which sees a summary of the evidence layers.
//!
//! Input validation is the only error path. Every external failure is
//! recorded in the layer that hit it.

pub mod aggregate;
mod batch;
pub mod segment;

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Datelike, Utc};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ai::{AiOutcome, AiScorer, CompletionProvider, EvidenceSummary};
use crate::cache::Cache;
use crate::claims::ClaimExtractor;
use crate::clients::{
    ArxivClient, Cached, CitationNetworkSource, CrossrefClient, HttpUrlChecker, MetadataSource,
    OpenAlexClient, PreprintSource, UrlCheck, UrlChecker,
};
use crate::content::embedding::Embedder;
use crate::content::fetch::{FetchPool, HttpPageFetcher, PageFetcher};
use crate::content::ContentAligner;
use crate::detector::HallucinationDetector;
use crate::error::{Result, VerificationError};
use crate::identifiers::Identifiers;
use crate::metadata::{
    MetadataCheck, MetadataVerdict, NetworkAssessment, ARXIV_CONFIDENCE, CROSSREF_CONFIDENCE,
};
use crate::temporal::check_temporal_consistency;
use crate::types::{
    Citation, Claim, LayerResult, LayerTimeouts, VerificationLayers, VerificationOptions,
    VerificationResult, VerificationStatus, VerifierConfig,
};
use aggregate::{decide, DecisionRule};

const DEFAULT_CACHE_ENTRIES: u64 = 10_000;
const DEFAULT_FETCH_CONCURRENCY: usize = 4;

/// A registry client with and without its cache decorator.
struct Registry<T: ?Sized> {
    direct: Arc<T>,
    cached: Arc<T>,
}

impl<T: ?Sized> Registry<T> {
    fn pick(&self, use_cache: bool) -> &T {
        if use_cache {
            &*self.cached
        } else {
            &*self.direct
        }
    }
}

pub struct Verifier {
    config: VerifierConfig,
    detector: HallucinationDetector,
    claims: ClaimExtractor,
    crossref: Registry<dyn MetadataSource>,
    arxiv: Registry<dyn PreprintSource>,
    openalex: Registry<dyn CitationNetworkSource>,
    url_check: Arc<dyn UrlChecker>,
    aligner: ContentAligner,
    ai: AiScorer,
    cache: Cache,
    current_year: Option<i32>,
}

impl Verifier {
    pub fn builder() -> VerifierBuilder {
        VerifierBuilder::default()
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn ai_providers(&self) -> Vec<&'static str> {
        self.ai.provider_names()
    }

    pub fn detector(&self) -> &HallucinationDetector {
        &self.detector
    }

    pub fn claim_extractor(&self) -> &ClaimExtractor {
        &self.claims
    }

    fn current_year(&self) -> i32 {
        self.current_year.unwrap_or_else(|| Utc::now().year())
    }

    /// Verify one citation with the full deadlines.
    pub async fn verify(
        &self,
        citation: &Citation,
        options: &VerificationOptions,
    ) -> Result<VerificationResult> {
        self.verify_with(citation, options, &self.config.timeouts).await
    }

    pub(crate) fn validate(&self, text: &str) -> Result<()> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(VerificationError::EmptyCitation);
        }
        let len = trimmed.chars().count();
        if len > self.config.max_citation_length {
            return Err(VerificationError::CitationTooLong {
                len,
                max: self.config.max_citation_length,
            });
        }
        Ok(())
    }

    pub(crate) async fn verify_with(
        &self,
        citation: &Citation,
        options: &VerificationOptions,
        timeouts: &LayerTimeouts,
    ) -> Result<VerificationResult> {
        self.validate(&citation.text)?;
        let start = Instant::now();
        let text = citation.text.trim();
        let context = citation.context.as_deref().filter(|c| !c.trim().is_empty());
        let identifiers = Identifiers::extract(text);
        let claims = context.map(|c| self.claims.extract(c)).unwrap_or_default();

        debug!(
            doi = ?identifiers.doi,
            arxiv_id = ?identifiers.arxiv_id,
            url = ?identifiers.url,
            "verifying citation"
        );

        let (url_layer, url_check) = self.url_layer(&identifiers, timeouts).await;
        if let Some(UrlCheck::Broken { reason }) = &url_check {
            warn!(url = ?identifiers.url, reason = %reason, "cited URL is broken");
            let layers = VerificationLayers {
                url_validation: url_layer,
                ..VerificationLayers::all_skipped("Not run: cited URL is unreachable")
            };
            return Ok(VerificationResult {
                citation: text.to_string(),
                status: VerificationStatus::UrlBroken,
                confidence: 0.0,
                layers,
                reasoning: None,
                suggestions: Vec::new(),
                metadata: result_metadata(
                    &identifiers,
                    &claims,
                    DecisionRule::UrlBroken,
                    None,
                    start.elapsed(),
                ),
            });
        }

        let patterns = async {
            if !options.check_patterns {
                return LayerResult::skipped("Disabled");
            }
            pattern_layer(&self.detector, text, context)
        };
        let metadata = self.metadata_layer(&identifiers, options.use_cache, timeouts);
        let content = self.content_layer(&identifiers, context, options, timeouts);
        let temporal = async {
            if !options.check_temporal {
                return LayerResult::skipped("Disabled");
            }
            check_temporal_consistency(text, context, self.current_year()).to_layer()
        };
        let graph = async {
            if !options.enable_citation_graph {
                return None;
            }
            Some(self.graph_layer(&identifiers, options.use_cache, timeouts).await)
        };

        let (
            hallucination_patterns,
            (metadata_check, metadata_outcome),
            content_verification,
            temporal_consistency,
            citation_graph,
        ) = tokio::join!(patterns, metadata, content, temporal, graph);

        let mut layers = VerificationLayers {
            url_validation: url_layer,
            metadata_check,
            content_verification,
            temporal_consistency,
            hallucination_patterns,
            ai_scoring: LayerResult::skipped("Disabled"),
            citation_graph,
        };

        let ai = if options.enable_ai_scoring {
            let summary = evidence_summary(&layers, url_check.as_ref(), metadata_outcome.as_ref());
            self.ai
                .assess(text, context, &summary, timeouts.provider())
                .await
        } else {
            AiOutcome::NoProviders
        };
        if options.enable_ai_scoring {
            layers.ai_scoring = ai.to_layer();
        }

        let decision = decide(
            &layers,
            metadata_outcome.as_ref().map(|m| m.verdict),
            &self.config.weights,
        );
        let ai_provider = ai.assessment().map(|a| a.provider.clone());

        let mut result = VerificationResult {
            citation: text.to_string(),
            status: decision.status,
            confidence: decision.confidence,
            layers,
            reasoning: ai.assessment().map(|a| a.reasoning.clone()),
            suggestions: metadata_outcome
                .as_ref()
                .and_then(MetadataCheck::suggestion)
                .into_iter()
                .collect(),
            metadata: result_metadata(
                &identifiers,
                &claims,
                decision.rule,
                ai_provider,
                start.elapsed(),
            ),
        };
        result.sort_suggestions();

        info!(
            status = result.status.as_str(),
            confidence = result.confidence,
            rule = ?decision.rule,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "citation verified"
        );
        Ok(result)
    }

    async fn url_layer(
        &self,
        identifiers: &Identifiers,
        timeouts: &LayerTimeouts,
    ) -> (LayerResult, Option<UrlCheck>) {
        let Some(url) = identifiers.url.as_deref() else {
            return (LayerResult::skipped("No URL in citation"), None);
        };

        let Some(outcome) = with_deadline(timeouts.registry(), self.url_check.check_url(url)).await
        else {
            return (LayerResult::skipped("URL check timed out"), None);
        };

        let check = UrlCheck::classify(&outcome);
        let layer = match &check {
            UrlCheck::Reachable { status } => {
                LayerResult::passed(1.0, format!("URL reachable (HTTP {})", status))
                    .with_metadata("http_status", status)
            }
            UrlCheck::Restricted { status } => LayerResult::warning(
                0.6,
                format!("URL exists but refused access (HTTP {})", status),
            )
            .with_metadata("http_status", status),
            UrlCheck::Broken { reason } => LayerResult::failed(0.0, reason),
            UrlCheck::Blocked { reason } => {
                LayerResult::failed(0.0, format!("URL refused: {}", reason))
            }
        };
        (layer.with_metadata("url", url), Some(check))
    }

    async fn metadata_layer(
        &self,
        identifiers: &Identifiers,
        use_cache: bool,
        timeouts: &LayerTimeouts,
    ) -> (LayerResult, Option<MetadataCheck>) {
        if !identifiers.has_registry_identifier() {
            return (LayerResult::skipped("No DOI or arXiv identifier"), None);
        }

        let crossref = async {
            let doi = identifiers.doi.as_deref()?;
            let lookup = self.crossref.pick(use_cache).work_by_doi(doi);
            let outcome = with_deadline(timeouts.registry(), lookup).await?;
            Some(match outcome {
                Ok(work) => MetadataCheck::cross_check(identifiers, work.into(), CROSSREF_CONFIDENCE),
                Err(e) => MetadataCheck::from_error("crossref", doi, &e),
            })
        };
        let arxiv = async {
            let id = identifiers.arxiv_id.as_deref()?;
            let lookup = self.arxiv.pick(use_cache).preprint_by_id(id);
            let outcome = with_deadline(timeouts.registry(), lookup).await?;
            Some(match outcome {
                Ok(preprint) => {
                    MetadataCheck::cross_check(identifiers, preprint.into(), ARXIV_CONFIDENCE)
                }
                Err(e) => MetadataCheck::from_error("arxiv", id, &e),
            })
        };

        let (crossref, arxiv) = tokio::join!(crossref, arxiv);
        match MetadataCheck::dominant(crossref.into_iter().chain(arxiv).collect()) {
            Some(check) => (check.to_layer(), Some(check)),
            None => (LayerResult::skipped("Metadata lookup timed out"), None),
        }
    }

    async fn content_layer(
        &self,
        identifiers: &Identifiers,
        context: Option<&str>,
        options: &VerificationOptions,
        timeouts: &LayerTimeouts,
    ) -> LayerResult {
        if !options.check_content {
            return LayerResult::skipped("Disabled");
        }
        let Some(context) = context else {
            return LayerResult::skipped("No claim context provided");
        };
        let Some(url) = identifiers.source_url() else {
            return LayerResult::skipped("No source URL to compare against");
        };

        let deadline = timeouts.fetch() + timeouts.settle() + timeouts.registry();
        match with_deadline(deadline, self.aligner.align(&url, context, timeouts)).await {
            Some(alignment) => alignment.to_layer().with_metadata("url", &url),
            None => LayerResult::skipped("Content check timed out"),
        }
    }

    async fn graph_layer(
        &self,
        identifiers: &Identifiers,
        use_cache: bool,
        timeouts: &LayerTimeouts,
    ) -> LayerResult {
        let Some(doi) = identifiers.doi.as_deref() else {
            return LayerResult::skipped("No DOI for citation network lookup");
        };
        let lookup = self.openalex.pick(use_cache).network_by_doi(doi);
        match with_deadline(timeouts.registry(), lookup).await {
            Some(Ok(record)) => NetworkAssessment::assess(&record, self.current_year()).to_layer(),
            Some(Err(e)) if e.is_not_found() => {
                LayerResult::warning(0.3, "Not indexed in the citation network")
            }
            Some(Err(e)) => {
                warn!(doi = %doi, error = %e, "citation network unavailable");
                LayerResult::skipped(format!("Citation network unavailable: {}", e))
            }
            None => LayerResult::skipped("Citation network lookup timed out"),
        }
    }
}

/// `None` when the deadline passes first.
async fn with_deadline<F: Future>(deadline: Duration, fut: F) -> Option<F::Output> {
    tokio::time::timeout(deadline, fut).await.ok()
}

fn pattern_layer(detector: &HallucinationDetector, text: &str, context: Option<&str>) -> LayerResult {
    let report = detector.detect(text, context);
    let p = report.hallucination_probability;
    let layer = if p < 0.3 {
        LayerResult::passed(report.credibility_score, &report.recommendation)
    } else if p < 0.5 {
        LayerResult::warning(report.credibility_score, &report.recommendation)
    } else {
        LayerResult::failed(report.credibility_score, &report.recommendation)
    };
    layer
        .with_metadata("hallucination_probability", p)
        .with_metadata("flags", &report.flags)
}

fn evidence_summary(
    layers: &VerificationLayers,
    url: Option<&UrlCheck>,
    metadata: Option<&MetadataCheck>,
) -> EvidenceSummary {
    EvidenceSummary {
        url_status: url.map(|check| match check {
            UrlCheck::Reachable { status } => format!("reachable (HTTP {})", status),
            UrlCheck::Restricted { status } => format!("access restricted (HTTP {})", status),
            UrlCheck::Broken { reason } => format!("broken: {}", reason),
            UrlCheck::Blocked { reason } => format!("refused: {}", reason),
        }),
        metadata_status: metadata.map(|m| {
            match m.verdict {
                MetadataVerdict::Verified => "verified",
                MetadataVerdict::PartialHallucination => "partial hallucination",
                MetadataVerdict::NotFound => "not found",
                MetadataVerdict::Unreachable => "registry unreachable",
            }
            .to_string()
        }),
        metadata_details: metadata.map(|m| m.reason.clone()),
        content_confidence: if layers.content_verification.is_skipped() {
            None
        } else {
            layers.content_verification.confidence
        },
    }
}

fn result_metadata(
    identifiers: &Identifiers,
    claims: &[Claim],
    rule: DecisionRule,
    ai_provider: Option<String>,
    elapsed: Duration,
) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("verification_id".into(), json!(Uuid::new_v4()));
    metadata.insert("timestamp".into(), json!(Utc::now().to_rfc3339()));
    metadata.insert("processing_time_ms".into(), json!(elapsed.as_millis() as u64));
    metadata.insert("identifiers".into(), json!(identifiers));
    metadata.insert("claims".into(), json!(claims));
    metadata.insert("decision_rule".into(), json!(rule));
    if let Some(provider) = ai_provider {
        metadata.insert("ai_provider".into(), json!(provider));
    }
    metadata
}

/// Assembles a [`Verifier`]. Every collaborator has a production default.
pub struct VerifierBuilder {
    config: VerifierConfig,
    crossref: Option<Arc<dyn MetadataSource>>,
    arxiv: Option<Arc<dyn PreprintSource>>,
    openalex: Option<Arc<dyn CitationNetworkSource>>,
    url_check: Option<Arc<dyn UrlChecker>>,
    fetcher: Option<Arc<dyn PageFetcher>>,
    fetch_concurrency: usize,
    embedder: Option<Arc<dyn Embedder>>,
    ai: AiScorer,
    cache: Option<Cache>,
    current_year: Option<i32>,
}

impl Default for VerifierBuilder {
    fn default() -> Self {
        Self {
            config: VerifierConfig::default(),
            crossref: None,
            arxiv: None,
            openalex: None,
            url_check: None,
            fetcher: None,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            embedder: None,
            ai: AiScorer::new(),
            cache: None,
            current_year: None,
        }
    }
}

impl VerifierBuilder {
    pub fn config(mut self, config: VerifierConfig) -> Self {
        self.config = config;
        self
    }

    pub fn crossref(mut self, source: Arc<dyn MetadataSource>) -> Self {
        self.crossref = Some(source);
        self
    }

    pub fn arxiv(mut self, source: Arc<dyn PreprintSource>) -> Self {
        self.arxiv = Some(source);
        self
    }

    pub fn openalex(mut self, source: Arc<dyn CitationNetworkSource>) -> Self {
        self.openalex = Some(source);
        self
    }

    pub fn url_check(mut self, checker: Arc<dyn UrlChecker>) -> Self {
        self.url_check = Some(checker);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Page fetches allowed in flight at once. Default: 4.
    pub fn fetch_concurrency(mut self, size: usize) -> Self {
        self.fetch_concurrency = size.max(1);
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Register an AI provider below those already added.
    pub fn ai_provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.ai = self.ai.with_provider(provider);
        self
    }

    pub fn cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Pin the calendar year used by the temporal and network checks.
    pub fn current_year(mut self, year: i32) -> Self {
        self.current_year = Some(year);
        self
    }

    pub fn build(self) -> Verifier {
        let cache = self
            .cache
            .unwrap_or_else(|| Cache::memory(DEFAULT_CACHE_ENTRIES));
        let ttls = self.config.cache_ttls;
        let registry_timeout = self.config.timeouts.registry();

        let crossref: Arc<dyn MetadataSource> = self
            .crossref
            .unwrap_or_else(|| Arc::new(CrossrefClient::new().with_timeout(registry_timeout)));
        let arxiv: Arc<dyn PreprintSource> = self
            .arxiv
            .unwrap_or_else(|| Arc::new(ArxivClient::new().with_timeout(registry_timeout)));
        let openalex: Arc<dyn CitationNetworkSource> = self
            .openalex
            .unwrap_or_else(|| Arc::new(OpenAlexClient::new().with_timeout(registry_timeout)));

        let fetcher = self
            .fetcher
            .unwrap_or_else(|| Arc::new(HttpPageFetcher::new()));
        let pool: Arc<dyn PageFetcher> = Arc::new(FetchPool::new(fetcher, self.fetch_concurrency));
        let aligner = ContentAligner::new(pool).with_window(self.config.embedding_window);
        let aligner = match self.embedder {
            Some(embedder) => aligner.with_embedder(embedder),
            None => aligner,
        };

        Verifier {
            crossref: Registry {
                cached: Arc::new(Cached::new(
                    crossref.clone(),
                    cache.clone(),
                    Duration::from_secs(ttls.crossref_secs),
                )),
                direct: crossref,
            },
            arxiv: Registry {
                cached: Arc::new(Cached::new(
                    arxiv.clone(),
                    cache.clone(),
                    Duration::from_secs(ttls.arxiv_secs),
                )),
                direct: arxiv,
            },
            openalex: Registry {
                cached: Arc::new(Cached::new(
                    openalex.clone(),
                    cache.clone(),
                    Duration::from_secs(ttls.openalex_secs),
                )),
                direct: openalex,
            },
            url_check: self.url_check.unwrap_or_else(|| {
                Arc::new(HttpUrlChecker::new().with_timeout(registry_timeout))
            }),
            detector: HallucinationDetector::new(),
            claims: ClaimExtractor::new(),
            aligner,
            ai: self.ai,
            cache,
            current_year: self.current_year,
            config: self.config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{NetworkRecord, PreprintRecord, WorkRecord};
    use crate::testing::{
        MockEmbedder, MockMetadataSource, MockNetworkSource, MockPageFetcher, MockPreprintSource,
        MockProvider, MockUrlChecker,
    };
    use crate::types::LayerStatus;

    fn gpt3() -> PreprintRecord {
        PreprintRecord {
            arxiv_id: "2005.14165".into(),
            title: "Language Models are Few-Shot Learners".into(),
            authors: vec!["Tom B. Brown".into(), "Benjamin Mann".into()],
            year: Some(2020),
        }
    }

    fn alphafold() -> WorkRecord {
        WorkRecord {
            doi: "10.1038/s41586-021-03819-2".into(),
            title: Some("Highly accurate protein structure prediction with AlphaFold".into()),
            authors: vec!["Jumper".into(), "Evans".into()],
            year: Some(2021),
            container_title: Some("Nature".into()),
        }
    }

    fn offline() -> VerifierBuilder {
        Verifier::builder()
            .crossref(Arc::new(MockMetadataSource::new().with_work(alphafold())))
            .arxiv(Arc::new(MockPreprintSource::new().with_preprint(gpt3())))
            .openalex(Arc::new(MockNetworkSource::new()))
            .url_check(Arc::new(MockUrlChecker::new()))
            .fetcher(Arc::new(MockPageFetcher::new()))
            .cache(Cache::memory(100))
            .current_year(2025)
    }

    #[tokio::test]
    async fn empty_citation_is_rejected() {
        let verifier = offline().build();
        let err = verifier
            .verify(&Citation::new("   "), &VerificationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VerificationError::EmptyCitation));
    }

    #[tokio::test]
    async fn oversized_citation_is_rejected() {
        let verifier = offline().build();
        let err = verifier
            .verify(&Citation::new("a".repeat(5001)), &VerificationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VerificationError::CitationTooLong { len: 5001, max: 5000 }
        ));
    }

    #[tokio::test]
    async fn arxiv_citation_verifies() {
        let verifier = offline().build();
        let result = verifier
            .verify(
                &Citation::new("Brown et al. (2020), arXiv:2005.14165"),
                &VerificationOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.status, VerificationStatus::Verified);
        assert_eq!(result.layers.metadata_check.status, LayerStatus::Passed);
        assert_eq!(result.layers.temporal_consistency.status, LayerStatus::Passed);
        assert!(result.layers.ai_scoring.is_skipped());
        assert_eq!(result.metadata["decision_rule"], "weighted_score");
    }

    #[tokio::test]
    async fn unknown_doi_is_fake() {
        let verifier = offline().build();
        let result = verifier
            .verify(
                &Citation::new("Nobody, A. (2022). Invented work. doi:10.9999/made-up.2022"),
                &VerificationOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(result.status, VerificationStatus::Fake);
        assert!(result.confidence < 50.0);
        assert_eq!(result.metadata["decision_rule"], "metadata_not_found");
    }

    #[tokio::test]
    async fn wrong_year_offers_suggestion() {
        let verifier = offline().build();
        let result = verifier
            .verify(
                &Citation::new("Jumper, J. (2019). Protein folding. doi:10.1038/s41586-021-03819-2"),
                &VerificationOptions::default(),
            )
            .await
            .unwrap();
        assert_ne!(result.status, VerificationStatus::Verified);
        assert_eq!(result.suggestions.len(), 1);
        assert_eq!(result.suggestions[0].year, Some(2021));
        assert_eq!(result.layers.metadata_check.metadata["partial_hallucination"], true);
    }

    #[tokio::test]
    async fn broken_url_short_circuits() {
        let checker = Arc::new(MockUrlChecker::new().with_unreachable("https://dead.example.org/paper"));
        let crossref = Arc::new(MockMetadataSource::new());
        let verifier = offline()
            .url_check(checker)
            .crossref(crossref.clone())
            .build();

        let result = verifier
            .verify(
                &Citation::new("Smith (2019). https://dead.example.org/paper doi:10.1000/abc"),
                &VerificationOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(result.status, VerificationStatus::UrlBroken);
        assert_eq!(result.confidence, 0.0);
        assert!(result.layers.metadata_check.is_skipped());
        assert!(crossref.calls().is_empty());
    }

    #[tokio::test]
    async fn restricted_url_is_only_a_warning() {
        let checker = Arc::new(MockUrlChecker::new().with_status("https://journal.org/p", 403));
        let verifier = offline().url_check(checker).build();
        let result = verifier
            .verify(
                &Citation::new("Smith (2019). Paper. https://journal.org/p"),
                &VerificationOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(result.layers.url_validation.status, LayerStatus::Warning);
        assert_ne!(result.status, VerificationStatus::UrlBroken);
    }

    #[tokio::test]
    async fn slow_fetch_times_out_without_aborting_siblings() {
        let fetcher = MockPageFetcher::new()
            .with_page("https://arxiv.org/abs/2005.14165", "<p>late</p>")
            .with_delay(Duration::from_secs(5));
        let verifier = offline()
            .fetcher(Arc::new(fetcher))
            .embedder(Arc::new(MockEmbedder::uniform()))
            .config(VerifierConfig::default().with_timeouts(LayerTimeouts {
                registry_secs: 1,
                fetch_secs: 1,
                settle_ms: 0,
                provider_secs: 1,
            }))
            .build();

        let citation = Citation::new("Brown et al. (2020), arXiv:2005.14165")
            .with_context("GPT-3 shows strong few-shot performance.");
        let result = verifier
            .verify(&citation, &VerificationOptions::default())
            .await
            .unwrap();
        assert!(result.layers.content_verification.is_skipped());
        assert_eq!(result.layers.content_verification.details, "Content check timed out");
        assert_eq!(result.layers.metadata_check.status, LayerStatus::Passed);
    }

    #[tokio::test]
    async fn ai_layer_sees_evidence_and_records_provider() {
        let provider = Arc::new(MockProvider::answering("openai", "Credible. Confidence score: 92"));
        let verifier = offline().ai_provider(provider.clone()).build();
        let result = verifier
            .verify(
                &Citation::new("Brown et al. (2020), arXiv:2005.14165"),
                &VerificationOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.layers.ai_scoring.confidence, Some(0.92));
        assert_eq!(result.metadata["ai_provider"], "openai");
        assert!(result.reasoning.as_deref().unwrap().contains("Credible"));
        assert!(provider.calls()[0].contains("Bibliographic metadata: verified"));
    }

    #[tokio::test]
    async fn disabled_graph_is_absent() {
        let verifier = offline().build();
        let options = VerificationOptions::default().with_citation_graph(false);
        let result = verifier
            .verify(&Citation::new("Brown et al. (2020), arXiv:2005.14165"), &options)
            .await
            .unwrap();
        assert!(result.layers.citation_graph.is_none());
    }

    #[tokio::test]
    async fn well_cited_doi_passes_graph_layer() {
        let network = MockNetworkSource::new().with_record(NetworkRecord {
            doi: "10.1038/s41586-021-03819-2".into(),
            cited_by_count: 20_000,
            publication_year: Some(2021),
            author_count: 30,
        });
        let verifier = offline().openalex(Arc::new(network)).build();
        let result = verifier
            .verify(
                &Citation::new("Jumper, J. et al. (2021). doi:10.1038/s41586-021-03819-2"),
                &VerificationOptions::default(),
            )
            .await
            .unwrap();
        let graph = result.layers.citation_graph.unwrap();
        assert_eq!(graph.status, LayerStatus::Passed);
        assert_eq!(result.status, VerificationStatus::Verified);
    }

    #[tokio::test]
    async fn cache_bypass_hits_the_registry_every_time() {
        let arxiv = Arc::new(MockPreprintSource::new().with_preprint(gpt3()));
        let verifier = offline().arxiv(arxiv.clone()).build();
        let citation = Citation::new("Brown et al. (2020), arXiv:2005.14165");

        let cached = VerificationOptions::default();
        verifier.verify(&citation, &cached).await.unwrap();
        verifier.verify(&citation, &cached).await.unwrap();
        assert_eq!(arxiv.calls().len(), 1);

        let uncached = VerificationOptions::default().with_cache(false);
        verifier.verify(&citation, &uncached).await.unwrap();
        assert_eq!(arxiv.calls().len(), 2);
    }
}
