//! HTTP surface tests against an in-process router with temp-dir stores
//! and the deterministic stub embedder.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::ingestion::ingest_recipes_and_build_index;
use crate::matching::{EmbeddingProvider, IndexStorage, MatchEngine, MatchService};
use crate::pantry::BackendCsv;
use crate::recipes::BackendJson;
use crate::tests::{write_data_files, StubEmbedder};
use crate::web::{router, SharedState};

struct WebHarness {
    state: SharedState,
    _tmp: tempfile::TempDir,
}

/// State over empty stores, with no persisted artifacts so the engine
/// serves its empty-index fallback.
fn empty_state() -> WebHarness {
    let tmp = tempfile::tempdir().unwrap();
    let recipes = Arc::new(BackendJson::load(&tmp.path().join("recipes-db.json")).unwrap());
    let pantry = Arc::new(BackendCsv::load(&tmp.path().join("pantry.csv")).unwrap());

    let embedder = Arc::new(StubEmbedder);
    let storage = IndexStorage::new(
        tmp.path().join("recipes.index"),
        tmp.path().join("recipes_id_map.json"),
    );
    let engine = MatchEngine::load(
        &storage,
        embedder.identity(),
        embedder.dimensions(),
        recipes.clone(),
    );
    let service = Arc::new(MatchService::new(engine, embedder, pantry.clone(), 5));

    WebHarness {
        state: SharedState {
            service,
            recipes,
            pantry,
        },
        _tmp: tmp,
    }
}

/// State with the two-recipe corpus ingested and artifacts loaded.
fn ingested_state() -> WebHarness {
    let tmp = tempfile::tempdir().unwrap();
    let data_dir = tmp.path().join("data");
    write_data_files(&data_dir);

    let recipes = Arc::new(BackendJson::load(&tmp.path().join("recipes-db.json")).unwrap());
    let pantry = Arc::new(BackendCsv::load(&tmp.path().join("pantry.csv")).unwrap());
    let embedder = Arc::new(StubEmbedder);

    let storage = IndexStorage::new(
        tmp.path().join("recipes.index"),
        tmp.path().join("recipes_id_map.json"),
    );
    ingest_recipes_and_build_index(&data_dir, &storage, embedder.as_ref(), recipes.as_ref())
        .unwrap();

    let engine = MatchEngine::load(
        &storage,
        embedder.identity(),
        embedder.dimensions(),
        recipes.clone(),
    );
    let service = Arc::new(MatchService::new(engine, embedder, pantry.clone(), 5));

    WebHarness {
        state: SharedState {
            service,
            recipes,
            pantry,
        },
        _tmp: tmp,
    }
}

async fn get(state: &SharedState, uri: &str) -> (StatusCode, Value) {
    let response = router(state.clone())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn send_json(
    state: &SharedState,
    method: &str,
    uri: &str,
    payload: Value,
) -> (StatusCode, Value) {
    let response = router(state.clone())
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_home() {
    let h = empty_state();
    let (status, body) = get(&h.state, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("pantryd"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_reports_fallback_state() {
    let h = empty_state();
    let (status, body) = get(&h.state, "/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], json!(false));
    assert_eq!(body["indexed"], json!(0));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_match_with_empty_pantry() {
    let h = ingested_state();
    let (status, body) = get(&h.state, "/recipes/match").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("pantry is empty"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_match_ranks_recipes() {
    let h = ingested_state();

    let (status, _) = send_json(
        &h.state,
        "POST",
        "/pantry/confirm-add",
        json!({"items": [
            {"name": "Flour", "quantity": 2.0},
            {"name": "Apple", "quantity": 1.0}
        ]}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = get(&h.state, "/recipes/match?k=2").await;
    assert_eq!(status, StatusCode::OK);

    let matched = body["matched_recipes"].as_array().unwrap();
    assert_eq!(matched.len(), 2);
    assert_eq!(matched[0]["name"], "Apple Pie");
    assert_eq!(matched[1]["name"], "Banana Bread");
    assert!(matched[0]["score"].as_f64().unwrap() <= matched[1]["score"].as_f64().unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_match_with_garbage_k_falls_back_to_default() {
    let h = ingested_state();

    send_json(
        &h.state,
        "POST",
        "/pantry/confirm-add",
        json!({"items": [{"name": "Flour"}]}),
    )
    .await;

    let (status, body) = get(&h.state, "/recipes/match?k=banana").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["matched_recipes"].is_array());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_search_requires_ingredients() {
    let h = ingested_state();

    let (status, body) = get(&h.state, "/recipes/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("ingredient"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_search_by_ingredient_tokens() {
    let h = ingested_state();

    let (status, body) = get(&h.state, "/recipes/search?ingredients=flour").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);

    let (_, body) = get(&h.state, "/recipes/search?ingredients=apple").await;
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["name"], "Apple Pie");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_confirm_add_empty_list() {
    let h = empty_state();

    let (status, body) =
        send_json(&h.state, "POST", "/pantry/confirm-add", json!({"items": []})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "No items to add.");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_confirm_add_skips_nameless_items() {
    let h = empty_state();

    let (status, body) = send_json(
        &h.state,
        "POST",
        "/pantry/confirm-add",
        json!({"items": [{"quantity": 3.0}, {"name": "Milk"}]}),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let inserted = body["inserted"].as_array().unwrap();
    assert_eq!(inserted.len(), 1);
    assert_eq!(inserted[0]["name"], "Milk");
    assert_eq!(inserted[0]["category"], "Uncategorized");
    assert_eq!(inserted[0]["location"], "Pantry");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_confirm_add_all_nameless_is_bad_request() {
    let h = empty_state();

    let (status, _) = send_json(
        &h.state,
        "POST",
        "/pantry/confirm-add",
        json!({"items": [{"quantity": 3.0}]}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pantry_update_and_delete() {
    let h = empty_state();

    let (_, body) = send_json(
        &h.state,
        "POST",
        "/api/pantry",
        json!({"name": "Butter", "quantity": 1.0}),
    )
    .await;
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = send_json(
        &h.state,
        "PUT",
        &format!("/api/pantry/{id}"),
        json!({"quantity": 2.0, "is_opened": true}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantity"], json!(2.0));
    assert_eq!(body["is_opened"], json!(true));

    let response = router(h.state.clone())
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/pantry/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (_, body) = get(&h.state, "/pantry").await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pantry_update_unknown_id_is_404() {
    let h = empty_state();

    let (status, _) = send_json(
        &h.state,
        "PUT",
        "/api/pantry/does-not-exist",
        json!({"quantity": 2.0}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_receipt_parse() {
    let h = empty_state();

    let (status, body) = send_json(
        &h.state,
        "POST",
        "/receipt/parse",
        json!({"text": "2 Bananas\nTOTAL $12.50\nWhole Milk"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["name"], "bananas");
    assert_eq!(items[0]["quantity"], json!(2.0));
    assert_eq!(items[1]["name"], "whole milk");
}
