//! Embedding model abstraction and implementations.
//!
//! Production embeddings come from Ollama's `/api/embeddings` endpoint;
//! tests use a deterministic bag-of-words hasher whose cosine similarity
//! tracks term overlap, so retrieval order is meaningful without a model.

use serde::{Deserialize, Serialize};

use super::RagError;

/// Embedding model abstraction
pub trait EmbeddingModel: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, RagError>;
    fn dimension(&self) -> usize;
}

/// Default dimension of the nomic-embed-text model.
const OLLAMA_EMBEDDING_DIM: usize = 768;

/// Ollama-backed embedder with a bounded per-request timeout.
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    dimension: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            dimension: OLLAMA_EMBEDDING_DIM,
        }
    }

    fn request(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let body = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                RagError::OllamaConnection(self.base_url.clone())
            } else {
                RagError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RagError::OllamaError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbeddingResponse = response
            .json()
            .map_err(|e| RagError::ResponseParsing(e.to_string()))?;

        Ok(parsed.embedding)
    }
}

impl EmbeddingModel for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        self.request(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, RagError> {
        texts.iter().map(|t| self.request(t)).collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Deterministic embedder for tests: hashes lowercased terms into buckets
/// and L2-normalizes the counts. Shared terms produce positive cosine
/// similarity, disjoint texts score near zero.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self { dimension: 384 }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingModel for MockEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        Ok(term_vector(text, self.dimension))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|t| term_vector(t, self.dimension)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn term_vector(text: &str, dim: usize) -> Vec<f32> {
    let mut vec = vec![0.0f32; dim];

    for term in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let mut hash: u64 = 1469598103934665603;
        for byte in term.to_lowercase().bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(1099511628211);
        }
        vec[(hash % dim as u64) as usize] += 1.0;
    }

    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in &mut vec {
            *val /= norm;
        }
    }

    vec
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn mock_embed_is_deterministic() {
        let embedder = MockEmbedder::new();
        assert_eq!(
            embedder.embed("same text").unwrap(),
            embedder.embed("same text").unwrap()
        );
    }

    #[test]
    fn mock_embed_is_l2_normalized() {
        let vec = embed("Vendor: Acme Corp");
        let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01, "norm = {norm}");
    }

    #[test]
    fn shared_terms_score_higher_than_disjoint() {
        let query = embed("Who is the vendor?");
        let relevant = embed("Vendor: Acme Corp");
        let unrelated = embed("Shipping terms FOB destination");

        assert!(cosine(&query, &relevant) > cosine(&query, &unrelated));
    }

    #[test]
    fn case_is_ignored() {
        let a = embed("VENDOR acme");
        let b = embed("vendor ACME");
        assert!((cosine(&a, &b) - 1.0).abs() < 0.01);
    }

    #[test]
    fn batch_matches_single() {
        let embedder = MockEmbedder::new();
        let batch = embedder.embed_batch(&["one two", "three"]).unwrap();
        assert_eq!(batch[0], embedder.embed("one two").unwrap());
        assert_eq!(batch[1], embedder.embed("three").unwrap());
    }

    fn embed(text: &str) -> Vec<f32> {
        MockEmbedder::new().embed(text).unwrap()
    }
}
