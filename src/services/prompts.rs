use crate::models::analysis::AnalysisType;

/// Prompt asking the model for the requested kind of analysis of one chunk.
pub fn analysis_prompt(chunk: &str, analysis_type: AnalysisType) -> String {
    let task = match analysis_type {
        AnalysisType::Summary => {
            "لخّص النص التالي تلخيصاً واضحاً، مع ذكر الموضوعات الرئيسية والنقاط المهمة."
        }
        AnalysisType::Concepts => {
            "استخرج المفاهيم الأساسية من النص التالي واشرح كل مفهوم في سطر أو سطرين."
        }
        AnalysisType::Questions => {
            "اكتب أسئلة مراجعة متنوعة تغطي أهم ما ورد في النص التالي مع إجاباتها."
        }
        AnalysisType::Mindmap => {
            "نظّم محتوى النص التالي في خريطة ذهنية نصية: فكرة مركزية ثم فروع وفروع فرعية."
        }
    };

    format!("قم بدور محلل محتوى تعليمي. المطلوب: {task} اكتب الإجابة باللغة العربية.\n\n{chunk}")
}

/// Prompt asking the model for quiz questions about one chunk.
pub fn questions_prompt(chunk: &str) -> String {
    format!(
        "أنشئ أسئلة اختيار من متعدد تفاعلية حول النص التالي. لكل سؤال اكتب أربعة خيارات \
         وحدد رقم الإجابة الصحيحة. اكتب الأسئلة باللغة العربية.\n\n{chunk}"
    )
}
