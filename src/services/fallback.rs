use serde::Serialize;

use crate::services::chunker::split_sentences;

/// Phrase present in every note produced by the local analyzer.
pub const LOCAL_FALLBACK_MARKER: &str = "تم استخدام محلل محلي";

/// Summary returned when there is nothing to analyze.
pub const INSUFFICIENT_DATA_SUMMARY: &str = "لا توجد بيانات كافية للتحليل.";

const EMPTY_INPUT_NOTE: &str = "لم يتم تقديم أي محتوى قابل للتحليل.";

/// Inputs shorter than this many characters are flagged as low-reliability.
const SHORT_CONTENT_CHARS: usize = 80;

const SUMMARY_SENTENCES: usize = 3;
const MAX_TOPICS: usize = 5;
const KEY_POINTS_PER_TOPIC: u32 = 3;

/// Deterministic analysis used when the generation service is unavailable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackAnalysis {
    pub summary: String,
    pub main_topics: u32,
    pub key_points: u32,
    pub note: String,
}

/// Summarize `text` locally: first sentences as summary, sentence count as topic estimate.
pub fn fallback_analyze(text: &str) -> FallbackAnalysis {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return FallbackAnalysis {
            summary: INSUFFICIENT_DATA_SUMMARY.to_string(),
            main_topics: 0,
            key_points: 0,
            note: EMPTY_INPUT_NOTE.to_string(),
        };
    }

    let sentences = split_sentences(trimmed);
    let summary = match sentences.as_slice() {
        [single] => single.to_string(),
        many => many
            .iter()
            .take(SUMMARY_SENTENCES)
            .copied()
            .collect::<Vec<_>>()
            .join(" "),
    };

    let main_topics = sentences.len().clamp(1, MAX_TOPICS) as u32;

    let note = if trimmed.chars().count() < SHORT_CONTENT_CHARS {
        format!("{LOCAL_FALLBACK_MARKER}: المحتوى قصير جداً، لذا قد تكون النتائج محدودة الدقة.")
    } else {
        format!("{LOCAL_FALLBACK_MARKER} لأن خدمة التوليد غير متاحة حالياً.")
    };

    FallbackAnalysis {
        summary,
        main_topics,
        key_points: main_topics * KEY_POINTS_PER_TOPIC,
        note,
    }
}
