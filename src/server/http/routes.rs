//! HTTP API route definitions

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, AppState};

/// Create the API router with all routes mounted under `/api/v1`.
pub fn create_router(app_state: AppState) -> Router {
    let api_v1 = Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/crawl", post(handlers::start_crawl))
        .route("/jobs/:job_id", get(handlers::job_status))
        .route("/jobs/:job_id/results", get(handlers::job_results))
        .route("/jobs/:job_id/cancel", post(handlers::cancel_job))
        .with_state(app_state);

    Router::new().nest("/api/v1", api_v1)
}
