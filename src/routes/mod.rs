pub mod analyze;
pub mod form;
pub mod health;
pub mod jobs;
pub mod metrics;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// API routes with tracing, compression, permissive CORS and an upload size limit.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/analyze", post(analyze::analyze_sync))
        .route("/analyze_async", post(analyze::analyze_async))
        .route("/job/{job_id}/status", get(jobs::get_job_status))
        .route("/job/{job_id}/result", get(jobs::get_job_result))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
}
