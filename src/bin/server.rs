//! RedCache Server
//!
//! HTTP API over a single memory store.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use redcache::{
    config::Config,
    error::Error,
    memory::{Memory, MemoryEvent, MemoryStore, ScoredMemory, DEFAULT_CATEGORY, DEFAULT_NUM_RESULTS},
};

/// The store is the single owner of its persistence target; the lock
/// serializes every request against it.
type SharedState = Arc<RwLock<MemoryStore>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match std::env::var("REDCACHE_CONFIG") {
        Ok(path) => {
            tracing::info!("Loading configuration from {}", path);
            Config::from_file(&path)?
        }
        Err(_) => Config::default(),
    };
    tracing::info!("Starting RedCache Server on port {}", config.server_port);
    tracing::info!("Data directory: {:?}", config.data_dir);
    tracing::info!("Storage backend: {}", config.storage.backend);

    config.ensure_dirs()?;
    let store = MemoryStore::from_config(&config)?;
    let state: SharedState = Arc::new(RwLock::new(store));

    // Build router
    let app = Router::new()
        // Health check
        .route("/health", get(health))
        // Memory CRUD
        .route(
            "/users/:user_id/memories",
            get(list_memories).post(create_memory).delete(delete_all_memories),
        )
        .route(
            "/users/:user_id/memories/:id",
            put(update_memory).delete(delete_memory),
        )
        // Retrieval
        .route("/users/:user_id/search", post(search_memories))
        // Text generation
        .route("/users/:user_id/enhance", post(enhance_memory))
        .route("/users/:user_id/summary", get(summarize_memories))
        // Maintenance
        .route("/reset", post(reset))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state);

    let port = config.server_port;
    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("Server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn status_for(err: Error) -> StatusCode {
    match err {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Config(msg) => {
            tracing::warn!("Rejected request: {}", msg);
            StatusCode::BAD_REQUEST
        }
        other => {
            tracing::error!("Request failed: {}", other);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

// === Handlers ===

async fn health() -> &'static str {
    "ok"
}

// --- Memory handlers ---

async fn list_memories(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Json<Vec<MemoryResponse>> {
    let store = state.read().await;
    Json(store.get_all(&user_id).into_iter().map(MemoryResponse::from).collect())
}

#[derive(Debug, Deserialize)]
struct CreateMemoryRequest {
    text: String,
    category: Option<String>,
}

async fn create_memory(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    Json(req): Json<CreateMemoryRequest>,
) -> Result<Json<MemoryEvent>, StatusCode> {
    let mut store = state.write().await;
    let category = req.category.as_deref().unwrap_or(DEFAULT_CATEGORY);

    let event = store
        .add_with_category(&req.text, &user_id, category)
        .map_err(status_for)?;

    Ok(Json(event))
}

#[derive(Debug, Deserialize)]
struct UpdateMemoryRequest {
    data: String,
}

async fn update_memory(
    State(state): State<SharedState>,
    Path((user_id, id)): Path<(String, Uuid)>,
    Json(req): Json<UpdateMemoryRequest>,
) -> Result<Json<MemoryEvent>, StatusCode> {
    let mut store = state.write().await;
    let event = store.update(&id, &req.data, &user_id).map_err(status_for)?;
    Ok(Json(event))
}

async fn delete_memory(
    State(state): State<SharedState>,
    Path((user_id, id)): Path<(String, Uuid)>,
) -> Result<StatusCode, StatusCode> {
    let mut store = state.write().await;
    store.delete(&id, &user_id).map_err(status_for)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_all_memories(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let mut store = state.write().await;
    store.delete_all(&user_id).map_err(status_for)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reset(State(state): State<SharedState>) -> Result<StatusCode, StatusCode> {
    let mut store = state.write().await;
    store.reset().map_err(status_for)?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Retrieval handlers ---

#[derive(Debug, Deserialize)]
struct SearchRequest {
    query: String,
    num_results: Option<usize>,
}

async fn search_memories(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    Json(req): Json<SearchRequest>,
) -> Json<Vec<SearchHitResponse>> {
    // Search grows the vocabulary, so it needs the write lock.
    let mut store = state.write().await;
    let hits = store.search(
        &req.query,
        &user_id,
        req.num_results.unwrap_or(DEFAULT_NUM_RESULTS),
    );
    Json(hits.into_iter().map(SearchHitResponse::from).collect())
}

// --- Text generation handlers ---

#[derive(Debug, Deserialize)]
struct EnhanceRequest {
    text: String,
    category: Option<String>,
}

async fn enhance_memory(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    Json(req): Json<EnhanceRequest>,
) -> Result<Json<MemoryEvent>, StatusCode> {
    let mut store = state.write().await;
    let category = req.category.as_deref().unwrap_or(DEFAULT_CATEGORY);

    let event = store
        .enhance_memory(&req.text, &user_id, category)
        .await
        .map_err(status_for)?;

    Ok(Json(event))
}

#[derive(Debug, Serialize)]
struct SummaryResponse {
    summary: String,
}

async fn summarize_memories(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Result<Json<SummaryResponse>, StatusCode> {
    let store = state.read().await;
    let summary = store.generate_summary(&user_id).await.map_err(status_for)?;
    Ok(Json(SummaryResponse { summary }))
}

// === Response types ===

#[derive(Debug, Serialize)]
struct MemoryResponse {
    id: String,
    text: String,
    category: String,
    created_at: String,
    updated_at: Option<String>,
}

impl From<Memory> for MemoryResponse {
    fn from(m: Memory) -> Self {
        Self {
            id: m.id.to_string(),
            text: m.text,
            category: m.category,
            created_at: m.created_at.to_rfc3339(),
            updated_at: m.updated_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
struct SearchHitResponse {
    #[serde(flatten)]
    memory: MemoryResponse,
    score: f32,
}

impl From<ScoredMemory> for SearchHitResponse {
    fn from(hit: ScoredMemory) -> Self {
        Self {
            memory: MemoryResponse::from(hit.memory),
            score: hit.score,
        }
    }
}
