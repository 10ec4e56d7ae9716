//! Embedding Models for Text Vectorization
//!
//! Text-to-vector conversion for similarity search. Two implementations:
//!
//! - **HashEmbedder**: deterministic token-hashing embeddings. No model
//!   files, no network. Texts sharing vocabulary land close together, which
//!   is enough for near-duplicate retrieval and for tests; it is not a
//!   semantic model.
//! - **RemoteEmbedder**: OpenAI-style `/v1/embeddings` endpoint over HTTP
//!   (blocking client, since the store API is synchronous).

use serde::Deserialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Errors that can occur during embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Invalid input text
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Remote endpoint failure
    #[error("embedding request failed: {0}")]
    Request(String),

    /// Remote endpoint answered with an unusable payload
    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),
}

/// Trait for embedding models
pub trait EmbeddingModel: Send + Sync {
    /// Generate an embedding vector for the given text
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Dimension of the vectors this model produces
    fn dimension(&self) -> usize;
}

/// Deterministic token-hashing embedder.
///
/// Each whitespace token contributes a pseudo-random (but deterministic)
/// direction derived from its hash; the sum is normalized to unit length.
/// Same text, same vector; texts with heavy token overlap get high cosine
/// similarity.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    /// Create a new hash embedder with the given dimension
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn hash_component(token: &str, seed: u64) -> f32 {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        seed.hash(&mut hasher);
        let value = hasher.finish();
        ((value as f64 / u64::MAX as f64) * 2.0 - 1.0) as f32
    }
}

impl EmbeddingModel for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "empty text cannot be embedded".to_string(),
            ));
        }

        let mut embedding = vec![0.0f32; self.dimension];
        for raw in text.split_whitespace() {
            let token: String = raw
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(|c| c.to_lowercase())
                .collect();
            if token.is_empty() {
                continue;
            }
            for (i, slot) in embedding.iter_mut().enumerate() {
                *slot += Self::hash_component(&token, i as u64);
            }
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut embedding {
                *value /= magnitude;
            }
        }

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// OpenAI-style remote embeddings client
pub struct RemoteEmbedder {
    endpoint: String,
    api_key: String,
    model: String,
    dimension: usize,
    client: reqwest::blocking::Client,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingsItem>,
}

#[derive(Deserialize)]
struct EmbeddingsItem {
    embedding: Vec<f32>,
}

impl RemoteEmbedder {
    /// Create a new remote embedder
    ///
    /// # Parameters
    ///
    /// - `endpoint`: API base, e.g. `https://api.openai.com`
    /// - `model`: embedding model name, e.g. `text-embedding-3-small`
    /// - `dimension`: expected vector dimension (1536 for the small model)
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            dimension,
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl EmbeddingModel for RemoteEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "empty text cannot be embedded".to_string(),
            ));
        }

        let url = format!("{}/v1/embeddings", self.endpoint);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "input": text,
            }))
            .send()
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbeddingError::Request(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty data array".to_string()))?;

        if embedding.len() != self.dimension {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected dimension {}, got {}",
                self.dimension,
                embedding.len()
            )));
        }

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Cosine similarity between two vectors of equal length, in `[-1, 1]`
///
/// # Panics
///
/// Panics if the vectors have different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "vectors must have the same length");

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}
