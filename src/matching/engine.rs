//! Match engine and the pantry-facing match service.
//!
//! Two-stage protocol: an ANN search over the read-only vector index yields
//! `(internal_position, distance)` pairs, positions are translated to
//! recipe ids through the ID map, and the surviving ids are hydrated from
//! the record store in one batch. Nothing in here returns an error across
//! the public boundary; every failure degrades to an empty result with a
//! logged diagnostic.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::matching::corpus::pantry_text;
use crate::matching::embeddings::{model_id_hash, EmbeddingProvider};
use crate::matching::index::{IdMap, VectorIndex};
use crate::matching::storage::IndexStorage;
use crate::pantry::PantryStore;
use crate::recipes::{Recipe, RecipeStore};

/// A hydrated match: the full recipe plus its distance score
/// (squared Euclidean, lower = more similar).
#[derive(Debug, Clone, Serialize)]
pub struct RecipeMatch {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub score: f32,
}

/// Read-only serving engine over the index + ID-map artifact pair.
pub struct MatchEngine {
    index: VectorIndex,
    id_map: IdMap,
    recipes: Arc<dyn RecipeStore>,
    ready: bool,
}

impl MatchEngine {
    pub fn new(index: VectorIndex, id_map: IdMap, recipes: Arc<dyn RecipeStore>) -> Self {
        // An inconsistent pair is never trusted; serve the valid empty
        // state instead.
        if index.count() != id_map.len() {
            log::error!(
                "index/id-map pairing mismatch ({} vectors, {} ids), serving empty index",
                index.count(),
                id_map.len()
            );
            let dimensions = index.dimensions();
            return Self {
                index: VectorIndex::new(dimensions),
                id_map: IdMap::new(),
                recipes,
                ready: false,
            };
        }

        Self {
            index,
            id_map,
            recipes,
            ready: true,
        }
    }

    /// Load the artifact pair, falling back to a valid empty index when it
    /// is absent or unreadable. Startup never fails here; searches against
    /// the fallback deterministically return no matches.
    pub fn load(
        storage: &IndexStorage,
        model_identity: &str,
        dimensions: usize,
        recipes: Arc<dyn RecipeStore>,
    ) -> Self {
        let model_id = model_id_hash(model_identity);

        match storage.load(&model_id, dimensions) {
            Ok((index, id_map)) => {
                log::info!(
                    "loaded recipe index from {} with {} vectors",
                    storage.index_path().display(),
                    index.count()
                );
                Self::new(index, id_map, recipes)
            }
            Err(err) => {
                log::warn!(
                    "couldnt load recipe index from {}: {err}; serving empty index",
                    storage.index_path().display()
                );
                Self {
                    index: VectorIndex::new(dimensions),
                    id_map: IdMap::new(),
                    recipes,
                    ready: false,
                }
            }
        }
    }

    /// Whether a persisted artifact pair was actually loaded, as opposed
    /// to the empty-index fallback.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Number of indexed recipes.
    pub fn len(&self) -> usize {
        self.index.count()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Match recipes against a pantry embedding.
    ///
    /// Results are ordered by ascending distance, ranks established by the
    /// search and never re-sorted by hydrated fields. Corrupt positions
    /// and ids missing from the record store are dropped, not fatal.
    pub fn match_recipes(&self, pantry_vector: &[f32], k: usize) -> Vec<RecipeMatch> {
        if self.index.is_empty() {
            log::warn!("recipe index is empty, cannot match recipes");
            return vec![];
        }

        let neighbors = match self.index.search(pantry_vector, k) {
            Ok(neighbors) => neighbors,
            Err(err) => {
                log::error!("recipe search rejected: {err}");
                return vec![];
            }
        };

        let mut ranked: Vec<(String, f32)> = vec![];
        for (position, distance) in neighbors {
            match self.id_map.get(position) {
                Some(id) => ranked.push((id.to_string(), distance)),
                None => {
                    log::warn!("search returned out-of-bounds internal position {position}, skipping");
                }
            }
        }

        if ranked.is_empty() {
            log::info!("no valid recipe matches found");
            return vec![];
        }

        let ids: Vec<String> = ranked.iter().map(|(id, _)| id.clone()).collect();
        let fetched = match self.recipes.fetch_by_ids(&ids) {
            Ok(fetched) => fetched,
            Err(err) => {
                log::error!("recipe hydration failed: {err}");
                return vec![];
            }
        };

        let mut by_id: HashMap<String, Recipe> =
            fetched.into_iter().map(|r| (r.id.clone(), r)).collect();

        let mut matches = vec![];
        for (id, score) in ranked {
            match by_id.remove(&id) {
                Some(recipe) => matches.push(RecipeMatch { recipe, score }),
                None => {
                    log::warn!("matched recipe {id} has no record store row, skipping");
                }
            }
        }

        matches
    }
}

/// Outcome of a pantry match request, mapped to user-visible responses by
/// the route layer.
pub enum MatchOutcome {
    EmptyPantry,
    EmbeddingFailed,
    Matches(Vec<RecipeMatch>),
}

/// Service object owning the engine, the embedding provider and the pantry
/// handle. Constructed once at startup and shared read-only with request
/// handlers.
pub struct MatchService {
    engine: MatchEngine,
    embedder: Arc<dyn EmbeddingProvider>,
    pantry: Arc<dyn PantryStore>,
    default_k: usize,
}

impl MatchService {
    pub fn new(
        engine: MatchEngine,
        embedder: Arc<dyn EmbeddingProvider>,
        pantry: Arc<dyn PantryStore>,
        default_k: usize,
    ) -> Self {
        Self {
            engine,
            embedder,
            pantry,
            default_k,
        }
    }

    pub fn engine(&self) -> &MatchEngine {
        &self.engine
    }

    pub fn default_k(&self) -> usize {
        self.default_k
    }

    /// Compose the pantry text, embed it and match recipes.
    ///
    /// Invalid `k` (absent or zero) clamps to the configured default.
    pub fn suggest(&self, k: Option<usize>) -> MatchOutcome {
        let k = match k {
            Some(k) if k >= 1 => k,
            _ => self.default_k,
        };

        let items = match self.pantry.list() {
            Ok(items) => items,
            Err(err) => {
                log::error!("couldnt read pantry for matching: {err}");
                return MatchOutcome::EmptyPantry;
            }
        };

        let text = pantry_text(&items);
        if text.is_empty() {
            return MatchOutcome::EmptyPantry;
        }

        let vector = match self.embedder.embed(&text) {
            Ok(vector) => vector,
            Err(err) => {
                log::error!("pantry embedding failed: {err}");
                return MatchOutcome::EmbeddingFailed;
            }
        };

        MatchOutcome::Matches(self.engine.match_recipes(&vector, k))
    }
}
