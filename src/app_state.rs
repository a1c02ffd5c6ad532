use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::services::{
    engine::AnalysisEngine,
    extract::DefaultExtractor,
    generation::GenerationError,
    job_store::JobStore,
    ocr::TesseractOcr,
    workers_ai::WorkersAiClient,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AnalysisEngine>,
}

impl AppState {
    pub fn new(engine: Arc<AnalysisEngine>) -> Self {
        Self { engine }
    }

    /// Wire the production Workers AI client, extractors and job store.
    pub fn from_config(config: &AppConfig) -> Result<Self, GenerationError> {
        let workers_ai = Arc::new(WorkersAiClient::new(config)?);
        let extractor = DefaultExtractor::new(
            TesseractOcr::new(config.ocr_languages.clone()),
            Arc::clone(&workers_ai),
        );
        let store = Arc::new(JobStore::new(Duration::from_secs(config.job_retention_secs)));

        Ok(Self::new(Arc::new(AnalysisEngine::new(
            store,
            workers_ai,
            Arc::new(extractor),
            config.max_chunk_chars,
        ))))
    }
}
