use crate::{
    matching::{MatchOutcome, MatchService},
    pantry::{PantryItem, PantryItemDraft, PantryStore, PantryUpdate},
    receipt,
    recipes::RecipeStore,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::signal;

#[derive(Clone)]
pub struct SharedState {
    pub service: Arc<MatchService>,
    pub recipes: Arc<dyn RecipeStore>,
    pub pantry: Arc<dyn PantryStore>,
}

async fn start_app(state: SharedState, listen_addr: &str) {
    async fn shutdown_signal() {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(listen_addr).await.unwrap();
    log::info!("listening on {listen_addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/status", get(status))
        .route("/recipes/match", get(match_recipes))
        .route("/recipes/search", get(search_recipes))
        .route("/pantry", get(list_pantry))
        .route("/pantry/confirm-add", post(confirm_add))
        .route("/api/pantry", post(add_pantry_item))
        .route("/api/pantry/:id", put(update_pantry_item))
        .route("/api/pantry/:id", delete(delete_pantry_item))
        .route("/receipt/parse", post(parse_receipt))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(Arc::new(state))
}

pub fn start_daemon(state: SharedState, listen_addr: String) {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async { start_app(state, &listen_addr).await });
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}

// Wrapper so `?` converts store errors into responses without leaking a
// stack trace to the client.
#[derive(Debug)]
pub struct HttpError(ApiError);

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        match self.0 {
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                json!({"error": self.0.to_string()}).to_string(),
            ),
            ApiError::BadRequest(_) => (
                StatusCode::BAD_REQUEST,
                json!({"error": self.0.to_string()}).to_string(),
            ),
            ApiError::Other(_) => {
                log::error!("{self:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": "Internal server error"}).to_string(),
                )
            }
        }
        .into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<ApiError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

async fn home() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Welcome to pantryd! Use /recipes/match or /recipes/search."
    }))
}

async fn status(State(state): State<Arc<SharedState>>) -> Result<Json<serde_json::Value>, HttpError> {
    let engine = state.service.engine();
    let total = tokio::task::block_in_place(|| state.recipes.total()).map_err(ApiError::Other)?;

    Ok(Json(json!({
        "ready": engine.is_ready(),
        "indexed": engine.len(),
        "recipes": total,
    })))
}

#[derive(Debug, Clone, Default, Deserialize)]
struct MatchParams {
    /// Number of suggestions; non-numeric or missing values fall back to
    /// the configured default.
    k: Option<String>,
}

async fn match_recipes(
    State(state): State<Arc<SharedState>>,
    Query(params): Query<MatchParams>,
) -> Response {
    let k = params.k.and_then(|k| k.parse::<usize>().ok());

    let outcome = tokio::task::block_in_place(|| state.service.suggest(k));

    match outcome {
        MatchOutcome::EmptyPantry => (
            StatusCode::OK,
            Json(json!({
                "message": "Your pantry is empty. Please add items to get recipe suggestions."
            })),
        )
            .into_response(),
        MatchOutcome::EmbeddingFailed => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Failed to generate embedding for your pantry items. Please try again."
            })),
        )
            .into_response(),
        MatchOutcome::Matches(matches) => {
            (StatusCode::OK, Json(json!({ "matched_recipes": matches }))).into_response()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SearchParams {
    ingredients: Option<String>,
}

async fn search_recipes(
    State(state): State<Arc<SharedState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<serde_json::Value>, HttpError> {
    let tokens: Vec<String> = params
        .ingredients
        .unwrap_or_default()
        .split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.is_empty() {
        return Err(ApiError::BadRequest(
            "Please provide at least one ingredient".to_string(),
        ))?;
    }

    log::info!("searching for recipes with ingredients: {tokens:?}");

    let results = tokio::task::block_in_place(|| state.recipes.search_by_ingredients(&tokens))
        .map_err(ApiError::Other)?;

    Ok(Json(json!({ "results": results })))
}

async fn list_pantry(
    State(state): State<Arc<SharedState>>,
) -> Result<Json<Vec<PantryItem>>, HttpError> {
    let items = tokio::task::block_in_place(|| state.pantry.list()).map_err(ApiError::Other)?;
    Ok(Json(items))
}

#[derive(Debug, Clone, Deserialize)]
struct ConfirmAddRequest {
    items: Vec<PantryItemDraft>,
}

async fn confirm_add(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<ConfirmAddRequest>,
) -> Result<Response, HttpError> {
    if payload.items.is_empty() {
        return Ok((StatusCode::OK, Json(json!({"message": "No items to add."}))).into_response());
    }

    let now = Utc::now();
    let mut items = vec![];
    for draft in payload.items {
        match PantryItem::from_draft(draft, now) {
            Some(item) => items.push(item),
            None => log::warn!("skipping pantry draft without a name"),
        }
    }

    if items.is_empty() {
        return Err(ApiError::BadRequest(
            "No valid items to insert after server-side processing.".to_string(),
        ))?;
    }

    let inserted =
        tokio::task::block_in_place(|| state.pantry.insert_many(items)).map_err(ApiError::Other)?;

    Ok((StatusCode::CREATED, Json(json!({ "inserted": inserted }))).into_response())
}

async fn add_pantry_item(
    State(state): State<Arc<SharedState>>,
    Json(draft): Json<PantryItemDraft>,
) -> Result<Response, HttpError> {
    let item = PantryItem::from_draft(draft, Utc::now())
        .ok_or_else(|| ApiError::BadRequest("item has no name".to_string()))?;

    let inserted = tokio::task::block_in_place(|| state.pantry.insert_many(vec![item]))
        .map_err(ApiError::Other)?;

    Ok((StatusCode::CREATED, Json(inserted.into_iter().next())).into_response())
}

async fn update_pantry_item(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<String>,
    Json(update): Json<PantryUpdate>,
) -> Result<Json<PantryItem>, HttpError> {
    let updated = tokio::task::block_in_place(|| state.pantry.update(&id, update))
        .map_err(ApiError::Other)?;

    match updated {
        Some(item) => Ok(Json(item)),
        None => Err(ApiError::NotFound)?,
    }
}

async fn delete_pantry_item(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, HttpError> {
    let deleted =
        tokio::task::block_in_place(|| state.pantry.delete(&id)).map_err(ApiError::Other)?;

    if !deleted {
        return Err(ApiError::NotFound)?;
    }

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Clone, Deserialize)]
struct ReceiptParseRequest {
    text: String,
}

async fn parse_receipt(Json(payload): Json<ReceiptParseRequest>) -> Json<serde_json::Value> {
    let items = receipt::parse_items(&payload.text);
    Json(json!({ "items": items }))
}
