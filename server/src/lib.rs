use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use repofinder_core::document::DocumentSummary;
use repofinder_core::error::SearchError;
use repofinder_core::fusion::{FusionWeights, SearchContext, SearchFilters};
use repofinder_core::licenses::LicenseCategory;
use repofinder_core::persist::{load_corpus, CorpusPaths};
use repofinder_core::store::DocumentStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub language: Option<String>,
    pub license_category: Option<String>,
    #[serde(default)]
    pub exclude_forks: bool,
    #[serde(default)]
    pub exclude_inactive: bool,
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}
fn default_limit() -> usize {
    100
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_count: usize,
    /// Ranked repository summaries; ranking scores are not exposed.
    pub results: Vec<DocumentSummary>,
}

#[derive(Clone)]
pub struct AppState {
    pub corpus_root: PathBuf,
    /// Swapped atomically on refresh so a reader sees either the fully-old
    /// or fully-new context, never a half-built one.
    pub ctx: Arc<RwLock<Arc<SearchContext>>>,
    /// Serializes concurrent refreshes; async so it can be held across the
    /// blocking rebuild without pinning an executor thread.
    pub refresh_guard: Arc<tokio::sync::Mutex<()>>,
    pub admin_token: Option<String>,
}

fn load_context(corpus_root: &Path) -> Result<SearchContext> {
    let documents = load_corpus(&CorpusPaths::new(corpus_root))?;
    let store = DocumentStore::load(documents)?;
    let ctx = SearchContext::build(store, FusionWeights::default(), None)?;
    Ok(ctx)
}

pub fn build_app(corpus_dir: String) -> Result<Router> {
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    build_app_with_token(corpus_dir, admin_token)
}

pub fn build_app_with_token(corpus_dir: String, admin_token: Option<String>) -> Result<Router> {
    // Load corpus and build the search context at startup
    let ctx = load_context(Path::new(&corpus_dir))?;
    let state = AppState {
        corpus_root: PathBuf::from(&corpus_dir),
        ctx: Arc::new(RwLock::new(Arc::new(ctx))),
        refresh_guard: Arc::new(tokio::sync::Mutex::new(())),
        admin_token,
    };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/statistics", get(statistics_handler))
        .route("/refresh", post(refresh_handler))
        .with_state(state)
        .layer(cors);
    Ok(app)
}

type HandlerError = (StatusCode, String);

fn status_for(err: &SearchError) -> StatusCode {
    match err {
        SearchError::NotLoaded => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_REQUEST,
    }
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, HandlerError> {
    let start = std::time::Instant::now();

    let filters = build_filters(&params).map_err(|e| (status_for(&e), e.to_string()))?;
    let limit = params.limit.clamp(1, 100);

    let ctx = Arc::clone(&state.ctx.read());
    let page = ctx
        .search_for_results(&params.q, &filters, params.offset, limit)
        .map_err(|e| (status_for(&e), e.to_string()))?;

    let results = page.results.into_iter().map(|hit| hit.document).collect();
    Ok(Json(SearchResponse {
        query: params.q,
        took_s: start.elapsed().as_secs_f64(),
        total_count: page.total_count,
        results,
    }))
}

fn build_filters(params: &SearchParams) -> Result<SearchFilters, SearchError> {
    // "*" is the UI's wildcard for "any"
    let language = params
        .language
        .clone()
        .filter(|v| !v.is_empty() && v.as_str() != "*");
    let license_category = match params.license_category.as_deref() {
        Some(value) if !value.is_empty() && value != "*" => {
            Some(value.parse::<LicenseCategory>()?)
        }
        _ => None,
    };
    Ok(SearchFilters {
        language,
        license_category,
        exclude_forks: params.exclude_forks,
        exclude_inactive: params.exclude_inactive,
    })
}

pub async fn statistics_handler(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, HandlerError> {
    let ctx = Arc::clone(&state.ctx.read());
    let stats = ctx
        .store()
        .statistics()
        .map_err(|e| (status_for(&e), e.to_string()))?;
    let value = serde_json::to_value(stats)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(value))
}

async fn refresh_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, HandlerError> {
    authorize(&state, &headers)?;
    let _guard = state.refresh_guard.lock().await;
    tracing::info!("corpus refresh started");
    // The load and index build are CPU/IO bound, keep them off the executor.
    let root = state.corpus_root.clone();
    let loaded = tokio::task::spawn_blocking(move || load_context(&root))
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("refresh task failed: {e}"),
            )
        })?;
    match loaded {
        Ok(ctx) => {
            *state.ctx.write() = Arc::new(ctx);
            tracing::info!("corpus refresh complete");
            Ok(Json(serde_json::json!({ "status": "refreshed" })))
        }
        Err(e) => {
            // Failed rebuild leaves the serving context untouched.
            tracing::error!(error = %e, "corpus refresh failed, keeping previous corpus");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("refresh failed: {e}"),
            ))
        }
    }
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), HandlerError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers
        .get("X-ADMIN-TOKEN")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
