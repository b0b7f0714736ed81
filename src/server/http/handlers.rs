//! HTTP API request handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;
use url::Url;

use crate::crawl::JobParams;
use crate::server::jobs::JobManager;

use super::types::*;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<JobManager>,
}

/// Parse a job id path segment, mapping failures to a 400 response.
fn parse_job_id(job_id: &str) -> Result<uuid::Uuid, Response> {
    uuid::Uuid::parse_str(job_id).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("INVALID_JOB_ID", "Invalid job ID format")),
        )
            .into_response()
    })
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [("content-type", "text/plain; version=0.0.4")],
        state.jobs.metrics().render_prometheus(),
    )
}

/// Submit a crawl job
pub async fn start_crawl(
    State(state): State<AppState>,
    Json(request): Json<CrawlRequest>,
) -> impl IntoResponse {
    let parsed = Url::parse(&request.start_url);
    let valid = parsed
        .as_ref()
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false);
    if !valid {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "INVALID_URL",
                "start_url must be an absolute http or https URL",
            )),
        )
            .into_response();
    }

    let max_depth = request.max_depth.clamp(0, 5) as usize;
    debug!(
        start_url = %request.start_url,
        max_depth,
        respect_robots = request.respect_robots,
        "HTTP crawl request"
    );

    let job_id = state.jobs.start(JobParams {
        start_url: request.start_url,
        max_depth,
        respect_robots: request.respect_robots,
    });

    (
        StatusCode::OK,
        Json(JobStartedResponse {
            job_id: job_id.to_string(),
        }),
    )
        .into_response()
}

/// Job status: lifecycle state plus progress counters
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let job_id = match parse_job_id(&job_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.jobs.snapshot(job_id) {
        Some(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("JOB_NOT_FOUND", "No such job")),
        )
            .into_response(),
    }
}

/// Collected link records, optionally filtered by scope and status class
pub async fn job_results(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(query): Query<ResultsQuery>,
) -> impl IntoResponse {
    let job_id = match parse_job_id(&job_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.jobs.results(job_id) {
        Some(records) => {
            let filtered = filter_results(records, &query);
            (StatusCode::OK, Json(filtered)).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("JOB_NOT_FOUND", "No such job")),
        )
            .into_response(),
    }
}

/// Cancel a running job
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let job_id = match parse_job_id(&job_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    if state.jobs.snapshot(job_id).is_none() {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("JOB_NOT_FOUND", "No such job")),
        )
            .into_response();
    }

    let canceled = state.jobs.cancel(job_id);
    (
        StatusCode::OK,
        Json(JobCancelResponse {
            success: canceled,
            message: if canceled {
                "Job canceled".to_string()
            } else {
                "Job already finished".to_string()
            },
        }),
    )
        .into_response()
}
