use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::analysis::JobStatusResponse;
use crate::models::job::{Job, JobStatus};

async fn find_job(state: &AppState, job_id: &str) -> Option<Job> {
    let id = Uuid::parse_str(job_id).ok()?;
    state.engine.store().get(id).await
}

/// GET /job/{job_id}/status: current status and progress.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> (StatusCode, Json<JobStatusResponse>) {
    match find_job(&state, &job_id).await {
        Some(job) => (
            StatusCode::OK,
            Json(JobStatusResponse {
                status: job.status.to_string(),
                progress: job.progress,
            }),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(JobStatusResponse {
                status: "not_found".to_string(),
                progress: 0,
            }),
        ),
    }
}

/// GET /job/{job_id}/result: full result once the job has completed.
pub async fn get_job_result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Response {
    let Some(job) = find_job(&state, &job_id).await else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "status": "not_found", "detail": "job not found" })),
        )
            .into_response();
    };

    match (job.status, job.result) {
        (JobStatus::Completed, Some(result)) => Json(result).into_response(),
        (JobStatus::Failed, _) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "status": job.status,
                "error": job.error,
                "trace": job.trace,
            })),
        )
            .into_response(),
        (status, _) => (StatusCode::ACCEPTED, Json(json!({ "status": status }))).into_response(),
    }
}
