use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::services::generation::{Generation, GenerationError, Generator, FAILURE_MARKER};

const API_BASE: &str = "https://api.cloudflare.com/client/v4/accounts";
const MAX_TOKENS: u32 = 1024;
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Client for Cloudflare Workers AI text generation and Whisper transcription.
pub struct WorkersAiClient {
    http: Client,
    account_id: Option<String>,
    api_token: Option<String>,
    text_model: String,
    transcription_model: String,
}

#[derive(Serialize)]
struct TextRequest<'a> {
    prompt: &'a str,
    max_tokens: u32,
}

#[derive(Serialize)]
struct WhisperRequest<'a> {
    audio: &'a [u8],
}

/// Common Workers AI response envelope.
#[derive(Deserialize)]
struct AiEnvelope<T> {
    result: Option<T>,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<AiMessage>,
}

#[derive(Deserialize)]
struct AiMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
struct TextResult {
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhisperResult {
    text: String,
}

impl WorkersAiClient {
    pub fn new(config: &AppConfig) -> Result<Self, GenerationError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.generation_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            account_id: config.cf_account_id.clone().filter(|s| !s.is_empty()),
            api_token: config.cf_api_token.clone().filter(|s| !s.is_empty()),
            text_model: config.text_model.clone(),
            transcription_model: config.transcription_model.clone(),
        })
    }

    fn credentials(&self) -> Result<(&str, &str), GenerationError> {
        match (&self.account_id, &self.api_token) {
            (Some(account), Some(token)) => Ok((account.as_str(), token.as_str())),
            _ => Err(GenerationError::NotConfigured),
        }
    }

    async fn run<B: Serialize, T: DeserializeOwned>(
        &self,
        model: &str,
        body: &B,
    ) -> Result<T, GenerationError> {
        let (account_id, api_token) = self.credentials()?;
        let url = format!("{API_BASE}/{account_id}/ai/run/{model}");

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        decode_envelope(status, &bytes)
    }

    async fn run_text(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = TextRequest {
            prompt,
            max_tokens: MAX_TOKENS,
        };
        let result: TextResult = self.run(&self.text_model, &request).await?;
        result
            .response
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| GenerationError::Api("empty response".to_string()))
    }

    /// Transcribe audio bytes with the Whisper model.
    pub async fn transcribe(&self, audio: &[u8]) -> Result<String, GenerationError> {
        let result: WhisperResult = self
            .run(&self.transcription_model, &WhisperRequest { audio })
            .await?;
        Ok(result.text)
    }
}

/// Decode a Workers AI response. Non-2xx statuses become `Api` errors carrying
/// the status, whether or not the body is a JSON envelope.
fn decode_envelope<T: DeserializeOwned>(
    status: StatusCode,
    bytes: &[u8],
) -> Result<T, GenerationError> {
    if !status.is_success() {
        let detail = match serde_json::from_slice::<AiEnvelope<serde::de::IgnoredAny>>(bytes) {
            Ok(envelope) => join_messages(envelope.errors),
            Err(_) => String::from_utf8_lossy(bytes)
                .chars()
                .take(MAX_ERROR_BODY_CHARS)
                .collect(),
        };
        return Err(GenerationError::Api(format!("{status}: {}", detail.trim())));
    }

    let envelope: AiEnvelope<T> = serde_json::from_slice(bytes)?;
    if !envelope.success {
        return Err(GenerationError::Api(format!(
            "{status}: {}",
            join_messages(envelope.errors)
        )));
    }

    envelope
        .result
        .ok_or_else(|| GenerationError::Api("response without result".to_string()))
}

fn join_messages(errors: Vec<AiMessage>) -> String {
    errors
        .into_iter()
        .map(|e| e.message)
        .collect::<Vec<_>>()
        .join("; ")
}

#[async_trait]
impl Generator for WorkersAiClient {
    /// Never returns `Err`: every problem becomes a marked failure.
    async fn generate(&self, prompt: &str) -> Result<Generation, GenerationError> {
        debug!(model = %self.text_model, prompt_chars = prompt.chars().count(), "Calling Workers AI");

        match self.run_text(prompt).await {
            Ok(text) => {
                let generation = Generation::from_text(text);
                if generation.is_failure() {
                    warn!(model = %self.text_model, "Model answered with the failure marker");
                }
                Ok(generation)
            }
            Err(e) => {
                warn!(error = %e, "Workers AI generation failed");
                Ok(Generation::Failure(format!("{FAILURE_MARKER} {e}")))
            }
        }
    }

    fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }
}
