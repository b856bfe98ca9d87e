//! Integration tests: engine orchestration, offline ingestion and the HTTP
//! surface, wired against temp-dir stores and a deterministic embedder.

mod engine;
mod web;

use crate::matching::{EmbeddingError, EmbeddingProvider};
use std::path::Path;

/// Two recipe files in the shapes the original data dumps use: one bare
/// array, one `{"recipes": [...]}` wrapper.
pub fn write_data_files(data_dir: &Path) {
    std::fs::create_dir_all(data_dir).unwrap();

    std::fs::write(
        data_dir.join("baking.json"),
        serde_json::json!([
            {
                "id": "apple-pie",
                "name": "Apple Pie",
                "description": "A classic dessert",
                "maincategory": "Baking",
                "ingredients": ["2 cups flour", "1 apple"]
            }
        ])
        .to_string(),
    )
    .unwrap();

    std::fs::write(
        data_dir.join("recipes.json"),
        serde_json::json!({
            "recipes": [
                {
                    "id": "banana-bread",
                    "name": "Banana Bread",
                    "description": "Moist and sweet",
                    "maincategory": "Baking",
                    "ingredients": ["2 bananas", "1 cup flour"]
                },
                {
                    "name": "No Id Here",
                    "ingredients": ["1 egg"]
                }
            ]
        })
        .to_string(),
    )
    .unwrap();
}

/// Words the stub embedder counts. Small enough to eyeball distances.
const STUB_VOCAB: [&str; 6] = ["apple", "banana", "flour", "pie", "bread", "sugar"];

/// Deterministic embedder: one dimension per vocabulary word, valued by
/// occurrence count in the lowercased text. Euclidean distance over these
/// vectors behaves like a crude bag-of-words similarity, which is all the
/// ranking tests need.
pub struct StubEmbedder;

impl EmbeddingProvider for StubEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let lowered = text.to_lowercase();
        Ok(STUB_VOCAB
            .iter()
            .map(|word| lowered.matches(word).count() as f32)
            .collect())
    }

    fn dimensions(&self) -> usize {
        STUB_VOCAB.len()
    }

    fn identity(&self) -> &str {
        "stub-counts"
    }
}

/// Embedder that always fails, for exercising the soft-failure paths.
pub struct FailingEmbedder;

impl EmbeddingProvider for FailingEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Malformed("provider unavailable".to_string()))
    }

    fn dimensions(&self) -> usize {
        STUB_VOCAB.len()
    }

    fn identity(&self) -> &str {
        "stub-counts"
    }
}
