// Thought Capture - Web Server
// REST API over the entry store with Axum

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use thought_capture::{
    explain, notify, Config, Entry, EntryStore, ExportOutcome, Filter, SqliteStorage,
    StoreError, Transport,
};

/// Shared application state
///
/// The store is single-writer: every request takes the same async lock,
/// held across the export await, so mutations never interleave.
#[derive(Clone)]
struct AppState {
    store: Arc<Mutex<EntryStore<SqliteStorage>>>,
    transport: Arc<dyn Transport>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: String) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message),
        }
    }
}

/// Entry response with display labels resolved
#[derive(Serialize)]
struct EntryResponse {
    id: i64,
    text: String,
    category: String,
    category_label: String,
    created_at: String,
    formatted_date: String,
    completed: bool,
}

impl From<&Entry> for EntryResponse {
    fn from(entry: &Entry) -> Self {
        Self {
            id: entry.id,
            text: entry.text.clone(),
            category: entry.category.as_str().to_string(),
            category_label: entry.category.label().to_string(),
            created_at: entry.created_at.to_rfc3339(),
            formatted_date: entry.formatted_timestamp(),
            completed: entry.completed,
        }
    }
}

#[derive(Deserialize)]
struct ListQuery {
    filter: Option<String>,
}

#[derive(Deserialize)]
struct TextBody {
    text: String,
}

#[derive(Deserialize)]
struct CategoryBody {
    category: String,
}

#[derive(Deserialize)]
struct ClassifyQuery {
    text: String,
}

#[derive(Serialize)]
struct ClassifyResponse {
    category: String,
    category_label: String,
    keyword: Option<String>,
}

#[derive(Serialize)]
struct ExportResponse {
    exported: usize,
    message: String,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ApiResponse::err(message))).into_response()
}

fn store_error_response(err: StoreError) -> Response {
    let status = match &err {
        StoreError::InvalidCategory(_) => StatusCode::BAD_REQUEST,
        StoreError::ExportFailed(_) => StatusCode::BAD_GATEWAY,
        StoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    log::error!("store error: {}", err);
    error_response(status, err.to_string())
}

fn not_found(id: i64) -> Response {
    error_response(StatusCode::NOT_FOUND, format!("No entry with id {}", id))
}

/// Respond with the entry after a mutation that reported whether it applied
fn entry_or_not_found(store: &EntryStore<SqliteStorage>, id: i64, applied: bool) -> Response {
    match store.get(id) {
        Some(entry) if applied => {
            (StatusCode::OK, Json(ApiResponse::ok(EntryResponse::from(entry)))).into_response()
        }
        _ => not_found(id),
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/entries?filter=task - Entries matching a filter (default: all)
async fn list_entries(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Response {
    let filter = match query.filter.as_deref().map(str::parse::<Filter>) {
        None => Filter::All,
        Some(Ok(filter)) => filter,
        Some(Err(bad)) => {
            return error_response(StatusCode::BAD_REQUEST, format!("Unknown filter {:?}", bad))
        }
    };

    let mut store = state.store.lock().await;
    store.set_filter(filter);
    let response: Vec<EntryResponse> = store.visible().map(EntryResponse::from).collect();

    (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
}

/// POST /api/entries - Capture a new entry
async fn create_entry(State(state): State<AppState>, Json(body): Json<TextBody>) -> Response {
    let mut store = state.store.lock().await;

    match store.add(&body.text) {
        Ok(Some(entry)) => {
            let message = notify::added(&entry);
            log::info!("{}", message);
            (StatusCode::CREATED, Json(ApiResponse::ok(EntryResponse::from(&entry)))).into_response()
        }
        Ok(None) => error_response(StatusCode::UNPROCESSABLE_ENTITY, "Text is empty".to_string()),
        Err(e) => store_error_response(e),
    }
}

/// POST /api/entries/:id/toggle - Flip completed
async fn toggle_entry(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let mut store = state.store.lock().await;

    match store.toggle(id) {
        Ok(applied) => entry_or_not_found(&store, id, applied),
        Err(e) => store_error_response(e),
    }
}

/// PUT /api/entries/:id - Replace text (re-classified)
async fn edit_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<TextBody>,
) -> Response {
    let mut store = state.store.lock().await;

    if store.get(id).is_none() {
        return not_found(id);
    }

    match store.edit(id, &body.text) {
        Ok(true) => entry_or_not_found(&store, id, true),
        Ok(false) => error_response(StatusCode::UNPROCESSABLE_ENTITY, "Text is empty".to_string()),
        Err(e) => store_error_response(e),
    }
}

/// PUT /api/entries/:id/category - Explicit category override
async fn retype_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<CategoryBody>,
) -> Response {
    let mut store = state.store.lock().await;

    match store.retype(id, &body.category) {
        Ok(applied) => entry_or_not_found(&store, id, applied),
        Err(e) => store_error_response(e),
    }
}

/// DELETE /api/entries/:id - Delete one entry
async fn delete_entry(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let mut store = state.store.lock().await;

    match store.delete(id) {
        Ok(true) => (StatusCode::OK, Json(ApiResponse::ok(id))).into_response(),
        Ok(false) => not_found(id),
        Err(e) => store_error_response(e),
    }
}

/// DELETE /api/entries - Delete everything
async fn clear_entries(State(state): State<AppState>) -> Response {
    let mut store = state.store.lock().await;
    let count = store.len();

    match store.clear() {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::ok(count))).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// POST /api/export - Send everything to the configured transport, clear on success
async fn export_entries(State(state): State<AppState>) -> Response {
    let mut store = state.store.lock().await;

    let result = store.export_and_clear(state.transport.as_ref()).await;
    let message = notify::export_result(&result);

    match result {
        Ok(outcome) => {
            let exported = match outcome {
                ExportOutcome::NothingToExport => 0,
                ExportOutcome::Exported { count } => count,
            };
            (StatusCode::OK, Json(ApiResponse::ok(ExportResponse { exported, message })))
                .into_response()
        }
        Err(e) => store_error_response(e),
    }
}

/// GET /api/classify?text=... - Preview the category without storing
async fn classify_text(Query(query): Query<ClassifyQuery>) -> impl IntoResponse {
    let result = explain(query.text.trim());
    Json(ApiResponse::ok(ClassifyResponse {
        category: result.category.as_str().to_string(),
        category_label: result.category.label().to_string(),
        keyword: result.keyword.map(str::to_string),
    }))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    println!("🌐 Thought Capture - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = Config::from_env()?;

    let storage = SqliteStorage::open(&config.db_path)?;
    let store = EntryStore::open(storage)?;
    println!("✓ Database opened: {:?} ({} entries)", config.db_path, store.len());

    let transport: Arc<dyn Transport> = Arc::from(config.transport()?);
    println!("✓ Export target: {}", transport.describe());

    // Create shared state
    let state = AppState {
        store: Arc::new(Mutex::new(store)),
        transport,
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/entries", get(list_entries).post(create_entry).delete(clear_entries))
        .route("/entries/:id", put(edit_entry).delete(delete_entry))
        .route("/entries/:id/toggle", post(toggle_entry))
        .route("/entries/:id/category", put(retype_entry))
        .route("/export", post(export_entries))
        .route("/classify", get(classify_text))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("\n🚀 Server running on http://localhost:{}", config.port);
    println!("   API: http://localhost:{}/api/entries", config.port);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await?;
    Ok(())
}
