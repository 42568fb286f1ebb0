//! Embedding collaborator.
//!
//! Turns text into dense vectors for the vector collections. Requests carry a
//! list of strings and the reply holds one vector per input, in input order.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Dimension of [`HashEmbedder`] vectors.
pub const HASH_EMBEDDING_DIMENSIONS: usize = 256;

/// Errors that can arise from embedding requests.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// The HTTP request to the embedding endpoint failed (including timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The endpoint answered with an unexpected shape.
    #[error("Unexpected response format: {0}")]
    BadResponse(String),
}

/// Produces one embedding vector per input string.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed every string in `inputs`; the result is positional.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single string.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::BadResponse("no embedding returned".into()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OpenAiEmbedder
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Client for an OpenAI-compatible `POST /v1/embeddings` endpoint.
pub struct OpenAiEmbedder {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiEmbedder {
    /// Create an embedder for `base_url` (e.g. `"https://api.openai.com"`)
    /// using `model` (e.g. `"text-embedding-ada-002"`).
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
            client,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/v1/embeddings", self.base_url.trim_end_matches('/'));
        let body = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };

        let response: EmbeddingResponse = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.data.len() != inputs.len() {
            return Err(EmbeddingError::BadResponse(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                response.data.len()
            )));
        }
        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HashEmbedder
// ─────────────────────────────────────────────────────────────────────────────

/// Deterministic bag-of-words embedder that needs no network.
///
/// Each lower-cased alphanumeric word is hashed into one of
/// [`HASH_EMBEDDING_DIMENSIONS`] buckets and the histogram is L2-normalised,
/// so texts that share words have a positive cosine similarity. Identical
/// text always yields an identical vector, across builds too, so vectors
/// saved to a memory file stay comparable with later queries.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(HASH_EMBEDDING_DIMENSIONS)
    }
}

impl HashEmbedder {
    /// `dimensions` is clamped to at least 1.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed `text` synchronously.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = (fnv1a(&word.to_lowercase()) % self.dimensions as u64) as usize;
            v[bucket] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

/// 64-bit FNV-1a; fixed, unlike std's `DefaultHasher`.
fn fnv1a(word: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in word.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(inputs.iter().map(|t| self.embed_text(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::cosine_similarity;

    #[test]
    fn hash_embedder_is_deterministic() {
        let e = HashEmbedder::default();
        assert_eq!(e.embed_text("Ana likes tea"), e.embed_text("Ana likes tea"));
    }

    #[test]
    fn hash_embedder_buckets_are_stable() {
        // Reference FNV-1a values; persisted vectors depend on them.
        assert_eq!(fnv1a(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a("a"), 0xaf63_dc4c_8601_ec8c);
        let v = HashEmbedder::new(4).embed_text("a");
        assert_eq!(v, vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn hash_embedder_ignores_case_and_punctuation() {
        let e = HashEmbedder::default();
        assert_eq!(e.embed_text("Blue, blue!"), e.embed_text("blue BLUE"));
    }

    #[test]
    fn hash_embedder_output_is_unit_length() {
        let e = HashEmbedder::new(64);
        let v = e.embed_text("the robot waves with the right hand");
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert_eq!(v.len(), 64);
    }

    #[test]
    fn hash_embedder_empty_text_is_zero_vector() {
        let e = HashEmbedder::new(8);
        assert!(e.embed_text("  ?! ").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn shared_words_score_higher_than_disjoint_words() {
        let e = HashEmbedder::default();
        let fact = e.embed_text("Tamim's favourite color is blue");
        let related = e.embed_text("What is Tamim's favourite color?");
        let unrelated = e.embed_text("Fold the towel twice then roll");
        assert!(cosine_similarity(&fact, &related) > cosine_similarity(&fact, &unrelated));
    }

    #[tokio::test]
    async fn embed_is_positional() {
        let e = HashEmbedder::default();
        let inputs = vec!["one".to_string(), "two".to_string()];
        let out = e.embed(&inputs).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], e.embed_text("one"));
        assert_eq!(out[1], e.embed_text("two"));
    }

    #[tokio::test]
    async fn embed_one_returns_first_vector() {
        let e = HashEmbedder::default();
        let v = e.embed_one("hello there").await.unwrap();
        assert_eq!(v, e.embed_text("hello there"));
    }

    #[test]
    fn openai_embedder_constructs_without_network() {
        let e = OpenAiEmbedder::new(
            "http://localhost:1",
            "text-embedding-ada-002",
            "sk-test",
            Duration::from_secs(1),
        );
        assert!(e.is_ok());
    }

    #[tokio::test]
    async fn openai_embedder_reports_http_error_when_unreachable() {
        let e = OpenAiEmbedder::new(
            "http://127.0.0.1:1",
            "text-embedding-ada-002",
            "sk-test",
            Duration::from_secs(2),
        )
        .unwrap();
        let err = e.embed_one("hi").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Http(_)));
    }
}
