use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use tracing::debug;

use crate::app_state::AppState;
use crate::models::analysis::{AnalysisRequest, SubmitResponse, SyncAnalysisResponse};
use crate::routes::form::read_analysis_form;

/// User-facing message returned when synchronous analysis hits an internal fault.
pub const SYNC_FAILURE_DETAIL: &str = "حدث خطأ داخلي أثناء تحليل المحتوى، يرجى المحاولة مرة أخرى.";

/// POST /analyze: analyze text, link and a single file, blocking until done.
pub async fn analyze_sync(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SyncAnalysisResponse>, (StatusCode, Json<Value>)> {
    let (form, mut files) = read_analysis_form(multipart)
        .await
        .map_err(|status| (status, Json(json!({ "detail": "invalid analysis form" }))))?;
    if files.len() > 1 {
        let ignored: Vec<&str> = files[1..].iter().map(|f| f.filename.as_str()).collect();
        debug!(?ignored, "Synchronous analysis uses only the first uploaded file");
        files.truncate(1);
    }

    let request = AnalysisRequest::from_form(form, files);
    match state.engine.analyze_now(request).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            tracing::error!(error = %e, "Synchronous analysis failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": SYNC_FAILURE_DETAIL, "error": e.to_string() })),
            ))
        }
    }
}

/// POST /analyze_async: submit text, link and any number of files as a background job.
pub async fn analyze_async(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SubmitResponse>, StatusCode> {
    let (form, files) = read_analysis_form(multipart).await?;
    let job_id = state
        .engine
        .submit(AnalysisRequest::from_form(form, files))
        .await;

    Ok(Json(SubmitResponse { job_id }))
}
