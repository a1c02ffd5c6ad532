use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

use content_relay::app_state::AppState;
use content_relay::config::AppConfig;
use content_relay::routes;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing content-relay server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    metrics::describe_counter!(
        "analysis_jobs_submitted_total",
        "Total asynchronous analysis jobs submitted"
    );
    metrics::describe_counter!(
        "analysis_jobs_completed_total",
        "Total analysis jobs completed"
    );
    metrics::describe_counter!(
        "analysis_jobs_failed_total",
        "Total analysis jobs that failed"
    );
    metrics::describe_counter!(
        "analysis_chunk_fallbacks_total",
        "Chunks analyzed locally because generation failed"
    );
    metrics::describe_histogram!(
        "analysis_job_seconds",
        "Time to process an asynchronous analysis job"
    );
    metrics::describe_gauge!(
        "analysis_jobs_retained",
        "Jobs currently held in the in-memory store"
    );

    let state = AppState::from_config(&config).expect("Failed to initialize analysis engine");

    if !state.engine.generation_configured() {
        tracing::warn!("CF_ACCOUNT_ID / CF_API_TOKEN not set; every chunk will use the local analyzer");
    }
    let capabilities = state.engine.capabilities();
    tracing::info!(
        ocr = capabilities.ocr,
        transcription = capabilities.transcription,
        "Extraction capabilities"
    );

    state
        .engine
        .store()
        .spawn_sweeper(Duration::from_secs(config.job_sweep_interval_secs.max(1)));

    let app = routes::router(state, config.max_upload_bytes).merge(
        Router::new()
            .route("/metrics", get(routes::metrics::prometheus_metrics))
            .with_state(prometheus_handle),
    );

    tracing::info!("Starting content-relay on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
