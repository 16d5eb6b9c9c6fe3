//! Router assembly: HTTP endpoints, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers) – adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        .route("/api/v1/health", get(http::http_health))
        // Quizzes
        .route("/api/v1/quizzes", get(http::http_list_quizzes).post(http::http_save_quiz))
        .route("/api/v1/quizzes/filtered", get(http::http_filtered_quizzes))
        .route(
            "/api/v1/quizzes/:id",
            get(http::http_quiz_detail).delete(http::http_delete_quiz),
        )
        .route("/api/v1/quizzes/:id/edit", get(http::http_quiz_for_edit))
        .route("/api/v1/quizzes/:id/publish", post(http::http_toggle_publish))
        // Attempts
        .route("/api/v1/attempts", get(http::http_attempt_history).post(http::http_submit_attempt))
        // Auth
        .route("/api/v1/auth/register", post(http::http_register))
        .route("/api/v1/auth/login", post(http::http_login))
        .route("/api/v1/auth/logout", post(http::http_logout))
        .route("/api/v1/auth/password", post(http::http_change_password))
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
        // Frontend fallback
        .fallback_service(static_service)
}
