use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    models::{Movie, MovieDetailView, QueryMode},
    services::{
        apply_filters, FilterFields, FilterSet, LoadMore, SessionSnapshot, TrendingSnapshot,
    },
};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub term: String,
}

/// The live session as the results list shows it, filters applied
#[derive(Debug, Serialize)]
pub struct BrowseView {
    pub effective_term: String,
    pub mode: QueryMode,
    pub page: u32,
    pub total_pages: Option<u32>,
    pub has_more: bool,
    pub is_loading: bool,
    pub error_message: Option<String>,
    /// Items accumulated in the session before filtering
    pub loaded_count: usize,
    pub filters: FilterSet,
    pub movies: Vec<Movie>,
}

impl BrowseView {
    fn new(snapshot: SessionSnapshot, filters: FilterSet) -> Self {
        Self {
            movies: apply_filters(&snapshot.items, &filters),
            loaded_count: snapshot.items.len(),
            effective_term: snapshot.effective_term,
            mode: snapshot.mode,
            page: snapshot.page,
            total_pages: snapshot.total_pages,
            has_more: snapshot.has_more,
            is_loading: snapshot.is_loading,
            error_message: snapshot.error_message,
            filters,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoadMoreResponse {
    pub result: LoadMore,
    pub view: BrowseView,
}

async fn current_view(state: &AppState) -> BrowseView {
    let snapshot = state.controller.snapshot().await;
    let filters = state.filters.read().await.clone();
    BrowseView::new(snapshot, filters)
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Raw search text; becomes effective once typing pauses
pub async fn push_search_input(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> AppResult<StatusCode> {
    state.search_input.push(request.term)?;
    Ok(StatusCode::ACCEPTED)
}

/// Starts a session immediately, bypassing the debouncer
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Json<BrowseView> {
    let outcome = state.controller.start_session(&request.term).await;
    tracing::info!(term = %request.term, outcome = ?outcome, "Search session started");
    Json(current_view(&state).await)
}

/// Current results with the active filters applied
pub async fn browse(State(state): State<AppState>) -> Json<BrowseView> {
    Json(current_view(&state).await)
}

/// Next page for the live session (infinite scroll)
pub async fn load_more(State(state): State<AppState>) -> Json<LoadMoreResponse> {
    let result = state.controller.load_more().await;
    Json(LoadMoreResponse {
        result,
        view: current_view(&state).await,
    })
}

pub async fn get_filters(State(state): State<AppState>) -> Json<FilterSet> {
    Json(state.filters.read().await.clone())
}

pub async fn set_filters(
    State(state): State<AppState>,
    Json(fields): Json<FilterFields>,
) -> AppResult<Json<FilterSet>> {
    let parsed = FilterSet::from_fields(&fields)?;
    *state.filters.write().await = parsed.clone();
    tracing::debug!(filters = ?parsed, "Filters updated");
    Ok(Json(parsed))
}

pub async fn clear_filters(State(state): State<AppState>) -> Json<FilterSet> {
    let mut filters = state.filters.write().await;
    filters.clear();
    Json(filters.clone())
}

pub async fn trending(State(state): State<AppState>) -> Json<TrendingSnapshot> {
    Json(state.controller.trending().await)
}

pub async fn movie_detail(
    State(state): State<AppState>,
    Path(movie_id): Path<u64>,
) -> AppResult<Json<MovieDetailView>> {
    let view = state.details.movie_detail(movie_id).await?;
    Ok(Json(view))
}
