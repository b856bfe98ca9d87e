//! Recipe-matching subsystem.
//!
//! The pipeline that turns a pantry into ranked recipe suggestions:
//!
//! - `normalize`: raw ingredient phrase -> canonical tokens
//! - `corpus`: structured recipe/pantry fields -> one embedding string
//! - `embeddings`: text -> fixed-dimension vector (external capability)
//! - `index`: flat vector index + ordered ID map
//! - `storage`: binary index file + JSON ID map, persisted as a pair
//! - `engine`: search -> ID translation -> batch hydration -> ranked list

pub mod corpus;
pub mod embeddings;
pub mod engine;
pub mod index;
pub mod normalize;
pub mod storage;

pub use corpus::{pantry_text, recipe_text};
pub use embeddings::{model_id_hash, EmbeddingError, EmbeddingProvider, GeminiEmbedder};
pub use engine::{MatchEngine, MatchOutcome, MatchService, RecipeMatch};
pub use index::{IdMap, VectorIndex};
pub use normalize::{cleaned_ingredient_tokens, normalize_ingredient};
pub use storage::{IndexStorage, IndexStorageError};

/// Embedding dimension of the default provider model.
pub const DEFAULT_DIMENSIONS: usize = 768;
