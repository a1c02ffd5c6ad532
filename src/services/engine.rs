//! Chunked analysis pipeline and job runner.
//!
//! A request's sources (typed text, extracted files, link) are combined,
//! chunked, and sent chunk by chunk to the generator. Chunks whose generation
//! fails are analyzed locally instead, so only empty input or an internal fault
//! can fail a job. Each asynchronous job runs on its own task and is the only
//! writer of its store entry.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::analysis::{
    AnalysisRequest, AnalysisResult, AnalysisType, InteractiveQuestion, SourceRecord,
    SyncAnalysisResponse,
};
use crate::services::chunker::chunk_text;
use crate::services::extract::{Capabilities, ContentExtractor};
use crate::services::fallback::fallback_analyze;
use crate::services::generation::{Generation, GenerationError, Generator};
use crate::services::job_store::JobStore;
use crate::services::prompts::{analysis_prompt, questions_prompt};
use crate::services::questions::generate_questions;

/// Local questions generated for a chunk when the model gives none.
const QUESTIONS_PER_CHUNK: usize = 20;

/// Cap applied when the question call itself errors, to bound cost.
const QUESTIONS_AFTER_ERROR: usize = 2;

const SNIPPET_CHARS: usize = 200;
const ANALYSIS_SEPARATOR: &str = "\n\n";
const KEY_POINTS_PER_TOPIC: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Insufficient data: no analyzable content after combining all sources")]
    InsufficientData,

    #[error("Generation call failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Analysis task panicked: {0}")]
    Panicked(String),
}

/// Orchestrates extraction, chunking, generation and fallback for analysis requests.
pub struct AnalysisEngine {
    store: Arc<JobStore>,
    generator: Arc<dyn Generator>,
    extractor: Arc<dyn ContentExtractor>,
    max_chunk_chars: usize,
}

/// Combined text of all sources plus notes about degraded extractions.
struct AssembledContent {
    combined: String,
    notes: Vec<String>,
}

/// Partial results accumulated chunk by chunk.
#[derive(Default)]
struct Aggregate {
    analyses: Vec<String>,
    fallback: bool,
    notes: Vec<String>,
    questions: Vec<InteractiveQuestion>,
    sources: Vec<SourceRecord>,
}

impl Aggregate {
    fn with_notes(notes: Vec<String>) -> Self {
        let mut aggregate = Self::default();
        for note in notes {
            aggregate.add_note(note);
        }
        aggregate
    }

    fn add_note(&mut self, note: String) {
        if !self.notes.contains(&note) {
            self.notes.push(note);
        }
    }

    fn main_topics(&self) -> u32 {
        let non_blank = self.analyses.iter().filter(|a| !a.trim().is_empty()).count();
        non_blank.max(1) as u32
    }

    fn into_result(self) -> AnalysisResult {
        let main_topics = self.main_topics();
        AnalysisResult {
            analysis: self.analyses.join(ANALYSIS_SEPARATOR),
            main_topics,
            key_points: main_topics * KEY_POINTS_PER_TOPIC,
            fallback: self.fallback,
            note: self.notes.join("\n"),
            interactive_questions: self.questions,
            sources: self.sources,
        }
    }
}

impl AnalysisEngine {
    pub fn new(
        store: Arc<JobStore>,
        generator: Arc<dyn Generator>,
        extractor: Arc<dyn ContentExtractor>,
        max_chunk_chars: usize,
    ) -> Self {
        Self {
            store,
            generator,
            extractor,
            max_chunk_chars,
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn generation_configured(&self) -> bool {
        self.generator.is_configured()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.extractor.capabilities()
    }

    /// Register a pending job and start processing it in the background.
    ///
    /// Returns as soon as the job is stored.
    pub async fn submit(self: &Arc<Self>, request: AnalysisRequest) -> Uuid {
        let job_id = self.store.create().await;
        metrics::counter!("analysis_jobs_submitted_total").increment(1);
        info!(
            %job_id,
            files = request.files.len(),
            analysis_type = %request.analysis_type,
            "Analysis job submitted"
        );

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.run_job(job_id, request).await;
        });

        job_id
    }

    /// Process a job to completion and record its final state.
    pub async fn run_job(&self, job_id: Uuid, request: AnalysisRequest) {
        let started = Instant::now();

        let outcome = AssertUnwindSafe(self.process(job_id, request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(JobError::Panicked(panic_message(panic.as_ref()))));

        match outcome {
            Ok(result) => {
                info!(
                    %job_id,
                    fallback = result.fallback,
                    questions = result.interactive_questions.len(),
                    "Analysis job completed"
                );
                self.store.complete(job_id, result).await;
                metrics::counter!("analysis_jobs_completed_total").increment(1);
            }
            Err(e) => {
                error!(%job_id, error = %e, "Analysis job failed");
                self.store.fail(job_id, e.to_string(), Some(error_trace(&e))).await;
                metrics::counter!("analysis_jobs_failed_total").increment(1);
            }
        }

        metrics::histogram!("analysis_job_seconds").record(started.elapsed().as_secs_f64());
    }

    /// Run the chunk pipeline for one job, publishing progress as chunks finish.
    pub async fn process(
        &self,
        job_id: Uuid,
        request: AnalysisRequest,
    ) -> Result<AnalysisResult, JobError> {
        if !self.store.mark_running(job_id).await {
            return Err(JobError::Internal(format!("job {job_id} is not pending")));
        }

        let content = self.assemble(&request).await;
        if content.combined.trim().is_empty() {
            return Err(JobError::InsufficientData);
        }

        let chunks = chunk_text(&content.combined, self.max_chunk_chars);
        let total = chunks.len();
        debug!(%job_id, chunks = total, chars = content.combined.chars().count(), "Content chunked");

        let mut aggregate = Aggregate::with_notes(content.notes);
        for (idx, chunk) in chunks.iter().enumerate() {
            let position = idx + 1;
            self.store
                .set_progress(job_id, progress_before(position, total))
                .await;

            let source = format!("chunk-{position}");
            self.analyze_chunk(chunk, &source, request.analysis_type, true, &mut aggregate)
                .await?;

            self.store
                .set_progress(job_id, progress_after(position, total))
                .await;
        }

        Ok(aggregate.into_result())
    }

    /// Analyze a request on the caller's task, without question synthesis.
    ///
    /// Blank input is answered with the local analyzer's insufficient-data result.
    pub async fn analyze_now(
        &self,
        request: AnalysisRequest,
    ) -> Result<SyncAnalysisResponse, JobError> {
        AssertUnwindSafe(self.analyze_now_inner(request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(JobError::Panicked(panic_message(panic.as_ref()))))
    }

    async fn analyze_now_inner(
        &self,
        request: AnalysisRequest,
    ) -> Result<SyncAnalysisResponse, JobError> {
        let content = self.assemble(&request).await;

        if content.combined.trim().is_empty() {
            let local = fallback_analyze("");
            return Ok(SyncAnalysisResponse {
                analysis: local.summary,
                main_topics: local.main_topics,
                key_points: local.key_points,
                fallback: true,
                note: Some(local.note),
            });
        }

        let mut aggregate = Aggregate::with_notes(content.notes);
        for (idx, chunk) in chunk_text(&content.combined, self.max_chunk_chars)
            .iter()
            .enumerate()
        {
            let source = format!("chunk-{}", idx + 1);
            self.analyze_chunk(chunk, &source, request.analysis_type, false, &mut aggregate)
                .await?;
        }

        let result = aggregate.into_result();
        Ok(SyncAnalysisResponse {
            analysis: result.analysis,
            main_topics: result.main_topics,
            key_points: result.key_points,
            fallback: result.fallback,
            note: Some(result.note).filter(|n| !n.is_empty()),
        })
    }

    async fn assemble(&self, request: &AnalysisRequest) -> AssembledContent {
        let mut parts = Vec::new();
        let mut notes = Vec::new();

        if !request.text.trim().is_empty() {
            parts.push(request.text.trim().to_string());
        }

        for file in &request.files {
            let extraction = self.extractor.extract(file).await;
            if !extraction.text.trim().is_empty() {
                parts.push(extraction.text.trim().to_string());
            }
            if let Some(note) = extraction.note {
                notes.push(note);
            }
        }

        if let Some(link) = request.link.as_deref().map(str::trim) {
            if !link.is_empty() {
                parts.push(link.to_string());
            }
        }

        AssembledContent {
            combined: parts.join(ANALYSIS_SEPARATOR),
            notes,
        }
    }

    async fn analyze_chunk(
        &self,
        chunk: &str,
        source: &str,
        analysis_type: AnalysisType,
        with_questions: bool,
        aggregate: &mut Aggregate,
    ) -> Result<(), JobError> {
        let prompt = analysis_prompt(chunk, analysis_type);

        match self.generator.generate(&prompt).await? {
            Generation::Success(text) => {
                aggregate.analyses.push(text);
                if with_questions {
                    let questions = self.synthesize_questions(chunk, source).await;
                    aggregate.questions.extend(questions);
                }
            }
            Generation::Failure(reason) => {
                warn!(source, reason = %reason, "Generation failed, using local analyzer");
                metrics::counter!("analysis_chunk_fallbacks_total").increment(1);

                let local = fallback_analyze(chunk);
                aggregate.analyses.push(local.summary);
                aggregate.fallback = true;
                aggregate.add_note(local.note);
                if with_questions {
                    aggregate
                        .questions
                        .extend(generate_questions(chunk, QUESTIONS_PER_CHUNK, source));
                }
            }
        }

        aggregate.sources.push(SourceRecord {
            source: source.to_string(),
            snippet: chunk.chars().take(SNIPPET_CHARS).collect(),
        });

        Ok(())
    }

    /// Ask the model for quiz questions, falling back to local ones.
    ///
    /// The model's free-form answer is kept as a single question body.
    async fn synthesize_questions(&self, chunk: &str, source: &str) -> Vec<InteractiveQuestion> {
        match self.generator.generate(&questions_prompt(chunk)).await {
            Ok(Generation::Success(text)) => vec![InteractiveQuestion {
                question: text,
                options: Vec::new(),
                correct_index: 0,
                source: source.to_string(),
            }],
            Ok(Generation::Failure(reason)) => {
                debug!(source, reason = %reason, "Question generation failed, using local questions");
                generate_questions(chunk, QUESTIONS_PER_CHUNK, source)
            }
            Err(e) => {
                warn!(source, error = %e, "Question generation errored, using capped local questions");
                generate_questions(chunk, QUESTIONS_AFTER_ERROR, source)
            }
        }
    }
}

/// Progress published before chunk `position` (1-based) of `total` starts.
fn progress_before(position: usize, total: usize) -> u8 {
    ((position - 1) * 100 / total) as u8
}

/// Progress published after chunk `position` finishes. 100 is reserved for completion.
fn progress_after(position: usize, total: usize) -> u8 {
    ((position * 100 / total) as u8).min(99)
}

/// The error and its source chain, one cause per line.
fn error_trace(err: &(dyn std::error::Error + 'static)) -> String {
    let mut lines = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        lines.push(format!("caused by: {cause}"));
        source = cause.source();
    }
    lines.join("\n")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_staircase() {
        let total = 3;
        let steps: Vec<(u8, u8)> = (1..=total)
            .map(|p| (progress_before(p, total), progress_after(p, total)))
            .collect();
        assert_eq!(steps, vec![(0, 33), (33, 66), (66, 99)]);
    }

    #[test]
    fn test_single_chunk_progress() {
        assert_eq!(progress_before(1, 1), 0);
        assert_eq!(progress_after(1, 1), 99);
    }

    #[test]
    fn test_error_trace_includes_sources() {
        let err = JobError::Generation(GenerationError::Api("quota exceeded".to_string()));
        let trace = error_trace(&err);
        assert!(trace.starts_with("Generation call failed"));
        assert!(trace.contains("caused by: Model API returned an error: quota exceeded"));
    }

    #[test]
    fn test_main_topics_counts_non_blank_analyses() {
        let aggregate = Aggregate {
            analyses: vec!["a".to_string(), "  ".to_string(), "b".to_string()],
            ..Default::default()
        };
        let result = aggregate.into_result();
        assert_eq!(result.main_topics, 2);
        assert_eq!(result.key_points, 6);
        assert_eq!(result.analysis, "a\n\n  \n\nb");

        let empty = Aggregate::default().into_result();
        assert_eq!(empty.main_topics, 1);
    }

    #[test]
    fn test_duplicate_notes_collapsed() {
        let mut aggregate = Aggregate::with_notes(vec!["x".to_string(), "x".to_string()]);
        aggregate.add_note("y".to_string());
        assert_eq!(aggregate.into_result().note, "x\ny");
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
