//! Text embedders and vector similarity.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::EmbeddingError;
use crate::security::SecretString;

/// Turns text into a fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Model label recorded in layer metadata.
    fn name(&self) -> &str;
}

/// OpenAI embeddings endpoint.
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl OpenAIEmbedder {
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "embedding request failed");
                EmbeddingError::Request(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %body, "embedding API error");
            return Err(EmbeddingError::Request(format!("HTTP {}: {}", status, body)));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(EmbeddingError::MissingData)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Function words that say nothing about what a claim asserts. Negations
/// stay out of this list.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "been", "by", "for", "from", "has", "have", "in",
    "is", "it", "its", "of", "on", "or", "that", "the", "their", "this", "to", "was", "were",
    "which", "with",
];

const NUMBER_WEIGHT: f32 = 2.0;
const NAME_WEIGHT: f32 = 1.5;
const PAIR_WEIGHT: f32 = 0.5;

/// Local embedder that needs no model: feature-hashed claim terms.
///
/// Stopwords are dropped and each remaining term goes to a signed bucket, so
/// unrelated terms sharing a bucket tend to cancel. Terms a reader could
/// check against the source weigh more: numbers, and capitalized names that
/// do not open a sentence. Adjacent term pairs are hashed as well, which
/// keeps "not effective" apart from "effective". Repeats are dampened with
/// `1 + ln(n)` so a long page that repeats one word does not dominate.
pub struct ClaimTermEmbedder {
    dimensions: usize,
}

impl Default for ClaimTermEmbedder {
    fn default() -> Self {
        Self::new(512)
    }
}

#[derive(Debug, PartialEq)]
struct Term {
    text: String,
    weight: f32,
}

impl ClaimTermEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn slot(&self, feature: &str) -> (usize, f32) {
        let mut hasher = DefaultHasher::new();
        feature.hash(&mut hasher);
        let h = hasher.finish();
        let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
        ((h % self.dimensions as u64) as usize, sign)
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let terms = claim_terms(text);

        // feature -> (occurrences, weight)
        let mut features: HashMap<String, (f32, f32)> = HashMap::new();
        for term in &terms {
            let entry = features.entry(term.text.clone()).or_insert((0.0, term.weight));
            entry.0 += 1.0;
            entry.1 = entry.1.max(term.weight);
        }
        for pair in terms.windows(2) {
            let key = format!("{} {}", pair[0].text, pair[1].text);
            features.entry(key).or_insert((0.0, PAIR_WEIGHT)).0 += 1.0;
        }

        let mut v = vec![0.0f32; self.dimensions];
        for (feature, (count, weight)) in features {
            let (bucket, sign) = self.slot(&feature);
            v[bucket] += sign * weight * (1.0 + count.ln());
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

/// Lowercased content terms with their salience weight.
fn claim_terms(text: &str) -> Vec<Term> {
    let mut terms = Vec::new();
    let mut sentence_start = true;

    for raw in text.split_whitespace() {
        let word = raw.trim_matches(|c: char| !c.is_alphanumeric());
        let opens_sentence = sentence_start;
        sentence_start = raw.ends_with(['.', '!', '?']);

        let Some(first) = word.chars().next() else {
            continue;
        };
        let lower = word.to_lowercase();
        if STOPWORDS.contains(&lower.as_str()) {
            continue;
        }

        let weight = if first.is_ascii_digit() {
            NUMBER_WEIGHT
        } else if word.chars().count() < 2 {
            continue;
        } else if first.is_uppercase() && !opens_sentence {
            NAME_WEIGHT
        } else {
            1.0
        };
        terms.push(Term { text: lower, weight });
    }
    terms
}

#[async_trait]
impl Embedder for ClaimTermEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.vectorize(text))
    }

    fn name(&self) -> &str {
        "claim-terms"
    }
}

/// Cosine similarity clamped to [0, 1]. Zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, EmbeddingError> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| (*x as f64) * (*y as f64)).sum();
    let na: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let nb: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if na <= f64::EPSILON || nb <= f64::EPSILON {
        return Ok(0.0);
    }
    Ok((dot / (na * nb)).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn similarity(e: &ClaimTermEmbedder, a: &str, b: &str) -> f64 {
        cosine_similarity(&e.embed(a).await.unwrap(), &e.embed(b).await.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn claim_vectors_are_normalized_and_deterministic() {
        let e = ClaimTermEmbedder::new(256);
        let a = e.embed("Protein structure prediction reached 92% accuracy.").await.unwrap();
        let b = e.embed("Protein structure prediction reached 92% accuracy.").await.unwrap();
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn stopwords_alone_carry_no_signal() {
        let e = ClaimTermEmbedder::default();
        let v = e.embed("It was of the and in to a").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
        assert_eq!(similarity(&e, "It was of the and in to a", "the of and").await, 0.0);
    }

    #[test]
    fn numbers_and_names_outweigh_plain_words() {
        let terms = claim_terms("Trials in Kenya cut deaths by 40%. Kenya later stopped.");
        let weight = |t: &str| terms.iter().find(|term| term.text == t).map(|term| term.weight);
        assert_eq!(weight("40"), Some(NUMBER_WEIGHT));
        assert_eq!(weight("kenya"), Some(NAME_WEIGHT));
        assert_eq!(weight("trials"), Some(1.0));
        assert_eq!(weight("in"), None);
    }

    #[tokio::test]
    async fn matching_figures_decide_between_similar_sources() {
        let e = ClaimTermEmbedder::default();
        let claim = "Mortality fell 40 percent after treatment";
        let same = similarity(&e, claim, "In the trial mortality fell 40 percent after treatment").await;
        let other = similarity(&e, claim, "In the trial mortality fell 12 percent after treatment").await;
        assert!(same > other);
    }

    #[tokio::test]
    async fn related_texts_score_higher() {
        let e = ClaimTermEmbedder::default();
        let claim = "protein folding structure prediction";
        let related = similarity(&e, claim, "accurate protein structure prediction").await;
        let unrelated = similarity(&e, claim, "medieval poetry and song").await;
        assert!(related > unrelated);
    }

    #[test]
    fn cosine_edge_cases() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).unwrap(), 0.0);
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]).unwrap() - 1.0).abs() < 1e-9);
        assert!(matches!(
            cosine_similarity(&[1.0], &[1.0, 2.0]),
            Err(EmbeddingError::DimensionMismatch { left: 1, right: 2 })
        ));
    }

    #[tokio::test]
    async fn openai_embedder_reads_first_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [0.1, 0.2, 0.3]}]
            })))
            .mount(&server)
            .await;

        let embedder = OpenAIEmbedder::new("sk-test").with_base_url(server.uri());
        assert_eq!(embedder.embed("hello").await.unwrap(), vec![0.1, 0.2, 0.3]);
        assert_eq!(embedder.name(), "text-embedding-3-small");
    }
}
