//! Match engine behavior: ranking, degenerate inputs and recovery from
//! inconsistent artifacts.

use std::sync::Arc;

use crate::matching::{
    EmbeddingProvider, IdMap, IndexStorage, MatchEngine, MatchOutcome, MatchService, VectorIndex,
};
use crate::pantry::{BackendCsv, PantryItem, PantryItemDraft, PantryStore};
use crate::recipes::{BackendJson, Recipe, RecipeStore};
use crate::tests::{FailingEmbedder, StubEmbedder};

fn recipe(id: &str, name: &str) -> Recipe {
    Recipe {
        id: id.to_string(),
        name: name.to_string(),
        ..Default::default()
    }
}

fn recipe_store(recipes: Vec<Recipe>) -> (Arc<BackendJson>, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let store = BackendJson::load(&tmp.path().join("recipes.json")).unwrap();
    store.upsert(recipes).unwrap();
    (Arc::new(store), tmp)
}

/// Three 2-d vectors at known distances from the probe `[0, 0]`.
fn three_vector_engine(store: Arc<BackendJson>) -> MatchEngine {
    let mut index = VectorIndex::new(2);
    let mut id_map = IdMap::new();

    for (id, vector) in [
        ("far", [10.0, 0.0]),
        ("near", [1.0, 0.0]),
        ("mid", [3.0, 0.0]),
    ] {
        index.push(&vector).unwrap();
        id_map.push(id.to_string());
    }

    MatchEngine::new(index, id_map, store)
}

#[test]
fn test_empty_index_matches_nothing() {
    let (store, _tmp) = recipe_store(vec![]);
    let engine = MatchEngine::new(VectorIndex::new(2), IdMap::new(), store);

    assert!(engine.match_recipes(&[0.0, 0.0], 5).is_empty());
    assert!(engine.match_recipes(&[1.0], 1).is_empty());
}

#[test]
fn test_wrong_dimension_matches_nothing() {
    let (store, _tmp) = recipe_store(vec![recipe("near", "Near")]);
    let mut index = VectorIndex::new(2);
    index.push(&[1.0, 0.0]).unwrap();
    let mut id_map = IdMap::new();
    id_map.push("near".to_string());

    let engine = MatchEngine::new(index, id_map, store);

    assert!(engine.match_recipes(&[1.0, 0.0, 0.0], 5).is_empty());
}

#[test]
fn test_two_nearest_in_ascending_order() {
    let (store, _tmp) = recipe_store(vec![
        recipe("far", "Far"),
        recipe("near", "Near"),
        recipe("mid", "Mid"),
    ]);
    let engine = three_vector_engine(store);

    let matches = engine.match_recipes(&[0.0, 0.0], 2);

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].recipe.id, "near");
    assert_eq!(matches[0].score, 1.0);
    assert_eq!(matches[1].recipe.id, "mid");
    assert_eq!(matches[1].score, 9.0);
}

#[test]
fn test_k_larger_than_corpus_is_clamped() {
    let (store, _tmp) = recipe_store(vec![
        recipe("far", "Far"),
        recipe("near", "Near"),
        recipe("mid", "Mid"),
    ]);
    let engine = three_vector_engine(store);

    let matches = engine.match_recipes(&[0.0, 0.0], 50);
    assert_eq!(matches.len(), 3);
}

#[test]
fn test_missing_store_row_is_skipped_not_fatal() {
    // "mid" has a vector but no record store row.
    let (store, _tmp) = recipe_store(vec![recipe("far", "Far"), recipe("near", "Near")]);
    let engine = three_vector_engine(store);

    let matches = engine.match_recipes(&[0.0, 0.0], 3);

    let ids: Vec<&str> = matches.iter().map(|m| m.recipe.id.as_str()).collect();
    assert_eq!(ids, vec!["near", "far"]);
}

#[test]
fn test_inconsistent_pair_degrades_to_empty() {
    let (store, _tmp) = recipe_store(vec![recipe("near", "Near")]);

    let mut index = VectorIndex::new(2);
    index.push(&[1.0, 0.0]).unwrap();
    index.push(&[2.0, 0.0]).unwrap();
    let mut id_map = IdMap::new();
    id_map.push("near".to_string());

    let engine = MatchEngine::new(index, id_map, store);

    assert!(!engine.is_ready());
    assert_eq!(engine.len(), 0);
    assert!(engine.match_recipes(&[0.0, 0.0], 5).is_empty());
}

#[test]
fn test_load_missing_artifacts_falls_back_to_empty() {
    let tmp = tempfile::tempdir().unwrap();
    let (store, _store_tmp) = recipe_store(vec![]);

    let storage = IndexStorage::new(
        tmp.path().join("recipes.index"),
        tmp.path().join("recipes_id_map.json"),
    );
    let engine = MatchEngine::load(&storage, "stub-counts", 6, store);

    assert!(!engine.is_ready());
    assert_eq!(engine.len(), 0);
    assert!(engine.match_recipes(&[0.0; 6], 5).is_empty());
}

fn pantry_with(names: &[(&str, f64)]) -> (Arc<BackendCsv>, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let store = BackendCsv::load(&tmp.path().join("pantry.csv")).unwrap();

    let now = chrono::Utc::now();
    let items: Vec<PantryItem> = names
        .iter()
        .map(|(name, qty)| {
            let mut item = PantryItem::from_draft(
                PantryItemDraft {
                    name: Some(name.to_string()),
                    ..Default::default()
                },
                now,
            )
            .unwrap();
            item.quantity = *qty;
            item
        })
        .collect();
    store.insert_many(items).unwrap();

    (Arc::new(store), tmp)
}

#[test]
fn test_service_empty_pantry() {
    let (recipes, _rtmp) = recipe_store(vec![]);
    let (pantry, _ptmp) = pantry_with(&[]);

    let engine = MatchEngine::new(VectorIndex::new(6), IdMap::new(), recipes);
    let service = MatchService::new(engine, Arc::new(StubEmbedder), pantry, 5);

    assert!(matches!(service.suggest(None), MatchOutcome::EmptyPantry));
}

#[test]
fn test_service_embedding_failure_is_soft() {
    let (recipes, _rtmp) = recipe_store(vec![]);
    let (pantry, _ptmp) = pantry_with(&[("flour", 1.0)]);

    let engine = MatchEngine::new(VectorIndex::new(6), IdMap::new(), recipes);
    let service = MatchService::new(engine, Arc::new(FailingEmbedder), pantry, 5);

    assert!(matches!(
        service.suggest(Some(3)),
        MatchOutcome::EmbeddingFailed
    ));
}

#[test]
fn test_service_clamps_invalid_k_to_default() {
    let (recipes, _rtmp) = recipe_store(vec![recipe("r1", "Apple Pie")]);
    let (pantry, _ptmp) = pantry_with(&[("apple", 1.0)]);

    let embedder = StubEmbedder;
    let mut index = VectorIndex::new(6);
    let mut id_map = IdMap::new();
    index.push(&embedder.embed("apple pie").unwrap()).unwrap();
    id_map.push("r1".to_string());

    let engine = MatchEngine::new(index, id_map, recipes);
    let service = MatchService::new(engine, Arc::new(embedder), pantry, 1);

    // k = 0 falls back to default_k = 1
    let MatchOutcome::Matches(matches) = service.suggest(Some(0)) else {
        panic!("expected matches");
    };
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].recipe.id, "r1");
}
