//! Heuristic quiz generation used when the model cannot produce questions.
//!
//! Every sentence becomes one question, cycling through three templates. Short
//! inputs are padded with numbered review questions so callers always receive
//! exactly the number they asked for.

use crate::models::analysis::InteractiveQuestion;
use crate::services::chunker::split_sentences;

/// Correct-index value for open questions with no single right option.
pub const NO_SINGLE_ANSWER: i32 = -1;

const CORE_IDEA_OPTIONS: [&str; 4] = [
    "الفكرة كما وردت في النص",
    "فكرة معاكسة لما ورد في النص",
    "تفصيل ثانوي غير مرتبط بالنص",
    "لا شيء مما سبق",
];

const CORRECT_ANSWER_OPTIONS: [&str; 4] = [
    "صحيح وفق ما ورد في النص",
    "خطأ وفق ما ورد في النص",
    "غير مذكور في النص",
    "لا يمكن تحديده",
];

const REVIEW_OPTIONS: [&str; 2] = ["نعم", "لا"];

/// Build exactly `max_count` questions from `text`, labelled with `source`.
///
/// Blank input yields no questions.
pub fn generate_questions(text: &str, max_count: usize, source: &str) -> Vec<InteractiveQuestion> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut questions: Vec<InteractiveQuestion> = split_sentences(text)
        .into_iter()
        .take(max_count)
        .enumerate()
        .map(|(idx, sentence)| from_sentence(idx, sentence, source))
        .collect();

    while questions.len() < max_count {
        let number = questions.len() + 1;
        questions.push(InteractiveQuestion {
            question: format!("سؤال مراجعة رقم {number}: هل استوعبت الفكرة الرئيسية في هذا الجزء من المحتوى؟"),
            options: owned(&REVIEW_OPTIONS),
            correct_index: 0,
            source: source.to_string(),
        });
    }

    questions
}

fn from_sentence(idx: usize, sentence: &str, source: &str) -> InteractiveQuestion {
    let (question, options, correct_index) = match idx % 3 {
        0 => (
            format!("ما الفكرة الأساسية في العبارة التالية: «{sentence}»؟"),
            owned(&CORE_IDEA_OPTIONS),
            0,
        ),
        1 => (
            format!("ما الإجابة الصحيحة بخصوص العبارة التالية: «{sentence}»؟"),
            owned(&CORRECT_ANSWER_OPTIONS),
            0,
        ),
        _ => (
            format!("اشرح بأسلوبك الخاص: «{sentence}»"),
            Vec::new(),
            NO_SINGLE_ANSWER,
        ),
    };

    InteractiveQuestion {
        question,
        options,
        correct_index,
        source: source.to_string(),
    }
}

fn owned(options: &[&str]) -> Vec<String> {
    options.iter().map(|o| o.to_string()).collect()
}
