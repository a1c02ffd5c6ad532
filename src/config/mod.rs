use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:8080")
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Cloudflare account ID. Generation falls back locally when unset.
    #[serde(default)]
    pub cf_account_id: Option<String>,

    /// Cloudflare Workers AI API token
    #[serde(default)]
    pub cf_api_token: Option<String>,

    /// Workers AI text generation model
    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// Workers AI speech-to-text model
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,

    /// Per-call timeout for Workers AI requests
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,

    /// Character budget per analysis chunk
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// Request body limit for uploads
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// How long finished jobs stay queryable
    #[serde(default = "default_job_retention_secs")]
    pub job_retention_secs: u64,

    /// Period of the finished-job eviction sweep
    #[serde(default = "default_job_sweep_interval_secs")]
    pub job_sweep_interval_secs: u64,

    /// Tesseract language list (e.g., "ara+eng")
    #[serde(default = "default_ocr_languages")]
    pub ocr_languages: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_text_model() -> String {
    "@cf/meta/llama-3.1-8b-instruct".to_string()
}

fn default_transcription_model() -> String {
    "@cf/openai/whisper".to_string()
}

fn default_generation_timeout_secs() -> u64 {
    60
}

fn default_max_chunk_chars() -> usize {
    3000
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

fn default_job_retention_secs() -> u64 {
    3600
}

fn default_job_sweep_interval_secs() -> u64 {
    60
}

fn default_ocr_languages() -> String {
    "ara+eng".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            cf_account_id: None,
            cf_api_token: None,
            text_model: default_text_model(),
            transcription_model: default_transcription_model(),
            generation_timeout_secs: default_generation_timeout_secs(),
            max_chunk_chars: default_max_chunk_chars(),
            max_upload_bytes: default_max_upload_bytes(),
            job_retention_secs: default_job_retention_secs(),
            job_sweep_interval_secs: default_job_sweep_interval_secs(),
            ocr_languages: default_ocr_languages(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
