//! Embedding provider seam.
//!
//! The embedding capability is consumed, never reimplemented: a trait with
//! a fixed contract (dimension, soft failure) and a remote implementation
//! backed by the Gemini embedContent endpoint.

use crate::config::EmbeddingConfig;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Maps a non-empty text to a fixed-dimension dense vector.
///
/// Implementations must never be called with empty or whitespace-only
/// text; callers short-circuit that case upstream.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
    fn dimensions(&self) -> usize;

    /// Stable model identity, hashed into the index artifact header so a
    /// model swap invalidates persisted vectors.
    fn identity(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("refusing to embed empty text")]
    EmptyInput,

    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed embedding response: {0}")]
    Malformed(String),

    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    Dimension { expected: usize, got: usize },
}

/// SHA-256 of the provider identity, stored in the index file header.
pub fn model_id_hash(identity: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(identity.as_bytes());
    hasher.finalize().into()
}

/// Remote embedder against the Gemini embedContent API.
pub struct GeminiEmbedder {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: String,
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: Option<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

impl GeminiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            anyhow::anyhow!(
                "embedding api key not found in environment variable {}",
                config.api_key_env
            )
        })?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            dimensions: config.dimensions,
        })
    }
}

impl EmbeddingProvider for GeminiEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let url = format!(
            "{}/models/{}:embedContent?key={}",
            self.endpoint, self.model, self.api_key
        );

        let body = json!({
            "model": format!("models/{}", self.model),
            "content": { "parts": [{ "text": text }] },
            "taskType": "RETRIEVAL_DOCUMENT",
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()?
            .error_for_status()?;

        let parsed: EmbedContentResponse = response
            .json()
            .map_err(|e| EmbeddingError::Malformed(e.to_string()))?;

        let values = parsed
            .embedding
            .map(|e| e.values)
            .ok_or_else(|| EmbeddingError::Malformed("missing embedding field".to_string()))?;

        if values.len() != self.dimensions {
            return Err(EmbeddingError::Dimension {
                expected: self.dimensions,
                got: values.len(),
            });
        }

        Ok(values)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn identity(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_id_hash_is_deterministic() {
        assert_eq!(
            model_id_hash("text-embedding-004"),
            model_id_hash("text-embedding-004")
        );
        assert_ne!(
            model_id_hash("text-embedding-004"),
            model_id_hash("some-other-model")
        );
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        let config = EmbeddingConfig {
            api_key_env: "PANTRYD_TEST_NO_SUCH_KEY".to_string(),
            ..Default::default()
        };
        assert!(GeminiEmbedder::new(&config).is_err());
    }
}
