//! Router assembly: HTTP endpoints, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - REST-ish API under `/api/v1/...`
/// - CORS (allow any origin/method/headers) – adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(http::http_health))
        // Challenge engine
        .route("/api/v1/challenges/submit", post(http::http_post_submit))
        .route("/api/v1/challenges/progress", get(http::http_get_progress))
        .route("/api/v1/challenges/:exercise", get(http::http_get_challenge_meta))
        .route("/api/v1/challenges/:exercise/page/:page", get(http::http_get_challenge_page))
        .route(
            "/api/v1/challenges/:exercise/public-params",
            get(http::http_get_public_params),
        )
        // Leaderboards
        .route("/api/v1/leaderboard", get(http::http_get_leaderboard))
        .route(
            "/api/v1/leaderboard/exercise/:exercise",
            get(http::http_get_exercise_leaderboard),
        )
        .route("/api/v1/leaderboard/recent", get(http::http_get_recent_completions))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}
