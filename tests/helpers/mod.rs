//! Stub collaborators and polling helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use content_relay::models::job::Job;
use content_relay::models::upload::{FileKind, UploadedFile};
use content_relay::services::engine::AnalysisEngine;
use content_relay::services::extract::{Capabilities, ContentExtractor, Extraction};
use content_relay::services::generation::{Generation, GenerationError, Generator};
use content_relay::services::job_store::JobStore;
use uuid::Uuid;

pub const IMAGE_TEXT: &str = "نص من صورة للاختبار";
pub const AUDIO_TEXT: &str = "نص من ملف صوتي";

/// Succeeds with the prompt echoed back.
pub struct EchoGenerator;

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(&self, prompt: &str) -> Result<Generation, GenerationError> {
        Ok(Generation::Success(format!("تحليل: {prompt}")))
    }
}

/// Always answers with the failure marker, optionally after a delay.
pub struct FailingGenerator {
    pub delay: Duration,
}

impl FailingGenerator {
    pub fn new() -> Self {
        Self {
            delay: Duration::ZERO,
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<Generation, GenerationError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(Generation::from_text("خطأ: محاكاة خطأ في خدمة التوليد"))
    }

    fn is_configured(&self) -> bool {
        false
    }
}

/// Returns `Err` on every call.
pub struct ErroringGenerator;

#[async_trait]
impl Generator for ErroringGenerator {
    async fn generate(&self, _prompt: &str) -> Result<Generation, GenerationError> {
        Err(GenerationError::Api("connection reset".to_string()))
    }
}

/// Succeeds on analysis calls and errors on every second call (the question call).
#[derive(Default)]
pub struct AlternatingGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl Generator for AlternatingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<Generation, GenerationError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 1 {
            Err(GenerationError::Api("question call exploded".to_string()))
        } else {
            Ok(Generation::Success("تحليل المقطع".to_string()))
        }
    }
}

/// Panics inside the generation call.
pub struct PanickingGenerator;

#[async_trait]
impl Generator for PanickingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<Generation, GenerationError> {
        panic!("generator exploded");
    }
}

/// Returns fixed text for images and audio; everything else is skipped with a note.
pub struct StubExtractor;

#[async_trait]
impl ContentExtractor for StubExtractor {
    async fn extract(&self, file: &UploadedFile) -> Extraction {
        match file.kind() {
            FileKind::Image => Extraction::text(IMAGE_TEXT),
            FileKind::Audio => Extraction::text(AUDIO_TEXT),
            _ => Extraction::degraded(format!("skipped {}", file.filename)),
        }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            docx: true,
            pptx: true,
            ocr: true,
            transcription: true,
        }
    }
}

pub fn engine_with<G: Generator + 'static>(generator: G, max_chunk_chars: usize) -> Arc<AnalysisEngine> {
    let store = Arc::new(JobStore::new(Duration::from_secs(3600)));
    Arc::new(AnalysisEngine::new(
        store,
        Arc::new(generator),
        Arc::new(StubExtractor),
        max_chunk_chars,
    ))
}

/// Poll until the job leaves pending/running, or panic after ~5 seconds.
pub async fn wait_for_terminal(engine: &AnalysisEngine, job_id: Uuid) -> Job {
    for _ in 0..500 {
        if let Some(job) = engine.store().get(job_id).await {
            if job.status.is_terminal() {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} did not finish in time");
}
