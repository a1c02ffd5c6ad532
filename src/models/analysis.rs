use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::models::upload::UploadedFile;

/// Prompt template requested by the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AnalysisType {
    #[default]
    Summary,
    Concepts,
    Questions,
    Mindmap,
}

impl AnalysisType {
    /// Unrecognized or missing values silently select the summary template.
    pub fn from_form(value: Option<&str>) -> Self {
        value
            .map(str::trim)
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }
}

/// Text fields of an analysis form, validated before any work is scheduled.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct AnalysisForm {
    #[garde(skip)]
    pub text: Option<String>,

    #[garde(length(max = 2048))]
    pub link: Option<String>,

    #[garde(length(max = 32))]
    pub analysis_type: Option<String>,
}

/// Everything one analysis needs, owned so it can move into a background task.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub text: String,
    pub link: Option<String>,
    pub files: Vec<UploadedFile>,
    pub analysis_type: AnalysisType,
}

impl AnalysisRequest {
    pub fn from_form(form: AnalysisForm, files: Vec<UploadedFile>) -> Self {
        Self {
            analysis_type: AnalysisType::from_form(form.analysis_type.as_deref()),
            text: form.text.unwrap_or_default(),
            link: form.link.filter(|l| !l.trim().is_empty()),
            files,
        }
    }
}

/// A quiz item. `correct_index` is `-1` when no single option is correct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractiveQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: i32,
    pub source: String,
}

/// Links part of the final analysis back to the chunk that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub source: String,
    pub snippet: String,
}

/// Final payload of a completed asynchronous job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis: String,
    pub main_topics: u32,
    pub key_points: u32,
    pub fallback: bool,
    pub note: String,
    pub interactive_questions: Vec<InteractiveQuestion>,
    pub sources: Vec<SourceRecord>,
}

/// Response of the synchronous `/analyze` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncAnalysisResponse {
    pub analysis: String,
    pub main_topics: u32,
    pub key_points: u32,
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Response after submitting an asynchronous job.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub job_id: uuid::Uuid,
}

/// Response for polling job status.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub status: String,
    pub progress: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_type_parsing() {
        assert_eq!(AnalysisType::from_form(Some("concepts")), AnalysisType::Concepts);
        assert_eq!(AnalysisType::from_form(Some("MindMap")), AnalysisType::Mindmap);
        assert_eq!(AnalysisType::from_form(Some(" questions ")), AnalysisType::Questions);
    }

    #[test]
    fn test_unknown_analysis_type_defaults_to_summary() {
        assert_eq!(AnalysisType::from_form(Some("poetry")), AnalysisType::Summary);
        assert_eq!(AnalysisType::from_form(Some("")), AnalysisType::Summary);
        assert_eq!(AnalysisType::from_form(None), AnalysisType::Summary);
    }

    #[test]
    fn test_form_validation_rejects_long_analysis_type() {
        let form = AnalysisForm {
            analysis_type: Some("x".repeat(64)),
            ..Default::default()
        };
        assert!(form.validate().is_err());

        let ok = AnalysisForm {
            text: Some("نص".to_string()),
            link: Some("https://example.com/video".to_string()),
            analysis_type: Some("summary".to_string()),
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_blank_link_is_dropped() {
        let form = AnalysisForm {
            link: Some("   ".to_string()),
            ..Default::default()
        };
        let request = AnalysisRequest::from_form(form, Vec::new());
        assert!(request.link.is_none());
        assert_eq!(request.analysis_type, AnalysisType::Summary);
    }
}
