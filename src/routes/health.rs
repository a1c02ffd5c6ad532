use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;
use crate::services::extract::Capabilities;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub generation_configured: bool,
    pub capabilities: Capabilities,
    pub jobs_retained: usize,
}

/// GET /health: which optional capabilities this process can use right now.
///
/// Missing capabilities degrade answers but never stop the service, so this
/// always returns 200.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let generation_configured = state.engine.generation_configured();

    Json(HealthResponse {
        status: if generation_configured {
            "ok".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        generation_configured,
        capabilities: state.engine.capabilities(),
        jobs_retained: state.engine.store().len().await,
    })
}
