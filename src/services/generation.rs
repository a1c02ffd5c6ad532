use async_trait::async_trait;

/// Prefix that marks a failed generation when results travel as plain text.
pub const FAILURE_MARKER: &str = "خطأ:";

/// Outcome of one call to the language model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Success(String),
    Failure(String),
}

impl Generation {
    /// Classify raw model text. Text starting with [`FAILURE_MARKER`] is a failure.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim_start().starts_with(FAILURE_MARKER) {
            Generation::Failure(text)
        } else {
            Generation::Success(text)
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Generation::Failure(_))
    }
}

/// A text generation backend.
///
/// Implementations report service problems as `Ok(Generation::Failure(_))`.
/// `Err` is reserved for faults the caller did not anticipate: the engine
/// fails the job when the primary call returns one, and tightens the question
/// budget when the question call does.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Generation, GenerationError>;

    /// Whether credentials for the backing service are present.
    fn is_configured(&self) -> bool {
        true
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse model response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Model API returned an error: {0}")]
    Api(String),

    #[error("Generation service is not configured")]
    NotConfigured,
}
