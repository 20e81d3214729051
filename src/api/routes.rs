use axum::{
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Search session
        .route("/search/input", post(handlers::push_search_input))
        .route("/search", post(handlers::search))
        .route("/movies", get(handlers::browse))
        .route("/movies/more", post(handlers::load_more))
        .route("/movies/:id", get(handlers::movie_detail))
        // Client-side filters
        .route(
            "/filters",
            put(handlers::set_filters)
                .get(handlers::get_filters)
                .delete(handlers::clear_filters),
        )
        // Trending
        .route("/trending", get(handlers::trending))
}
