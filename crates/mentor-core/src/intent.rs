use std::fmt;

use serde::{Deserialize, Serialize};

/// Pedagogical intent behind a student query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Mcq,
    Summary,
    Explain,
    QuestionGeneration,
    ExamPrep,
    ConceptMap,
    Qa,
}

impl Intent {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mcq => "mcq",
            Self::Summary => "summary",
            Self::Explain => "explain",
            Self::QuestionGeneration => "question_generation",
            Self::ExamPrep => "exam_prep",
            Self::ConceptMap => "concept_map",
            Self::Qa => "qa",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const MCQ_KEYWORDS: &[&str] = &[
    "mcq",
    "multiple choice",
    "multiple choice questions",
    "quiz",
    "choose the correct answer",
    "select the correct option",
    "questionnaire",
    "multiple choice test",
    "choose one",
    "select the answer",
    "pick the right answer",
    "which one is correct",
    "quiz questions",
    "test questions",
    "choose the right answer",
    "answer options",
    "four options",
    "multiple selection",
    "question options",
];

const SUMMARY_KEYWORDS: &[&str] = &[
    "summary",
    "give me a summary",
    "short summary",
    "brief overview",
    "summarize",
    "quick overview",
    "main points",
    "key points",
    "overview",
    "summarize the content",
    "summarize this part",
    "give me the gist",
    "concise summary",
    "shortened version",
    "can you summarize",
    "tell me the summary",
    "short summary of",
    "quick recap",
    "summ",
];

const EXPLAIN_KEYWORDS: &[&str] = &[
    "explain",
    "can you explain",
    "please explain",
    "clarify",
    "how does it work",
    "what does it mean",
    "tell me about",
    "give me an explanation",
    "understand",
    "explanation of",
    "what is the meaning of",
    "define",
    "what is",
    "can you clarify",
    "what does it signify",
    "tell me what it means",
    "describe",
    "what is the significance of",
    "break down",
];

const QUESTION_GENERATION_KEYWORDS: &[&str] = &[
    "generate questions",
    "create questions",
    "give me questions",
    "write questions",
    "come up with questions",
    "make me a quiz",
    "create a test",
    "quiz questions",
    "generate a quiz",
    "test me with questions",
    "write me questions",
    "can you provide questions",
    "give me some questions",
    "create a set of questions",
    "can you prepare questions",
    "give me a quiz",
    "can you create a quiz",
];

const EXAM_PREP_KEYWORDS: &[&str] = &[
    "exam preparation",
    "how to study for the exam",
    "study tips",
    "prepare for the exam",
    "study guide",
    "how to prepare",
    "exam study",
    "study plan",
    "exam strategy",
    "test prep",
    "how to pass the exam",
    "study session",
    "exam checklist",
    "what to study for the exam",
    "preparing for a test",
    "revision tips",
    "study advice",
    "exam prep tips",
    "study schedule",
    "tips for passing the exam",
    "study method",
    "let me exam ready",
    "make me ready",
];

const CONCEPT_MAP_KEYWORDS: &[&str] = &[
    "concept map",
    "mind map",
    "create a concept map",
    "draw a concept map",
    "make a mind map",
    "map the concepts",
    "concept diagram",
    "create a diagram",
    "conceptual map",
    "make a diagram",
    "structure a concept map",
    "draw the concept",
    "concept map creation",
    "build a concept map",
    "make a visual map",
    "map the ideas",
    "visualize concepts",
    "draw a diagram for concepts",
];

/// Checked top to bottom; the first table row with any matching keyword wins.
pub const INTENT_TABLE: &[(Intent, &[&str])] = &[
    (Intent::Mcq, MCQ_KEYWORDS),
    (Intent::Summary, SUMMARY_KEYWORDS),
    (Intent::Explain, EXPLAIN_KEYWORDS),
    (Intent::QuestionGeneration, QUESTION_GENERATION_KEYWORDS),
    (Intent::ExamPrep, EXAM_PREP_KEYWORDS),
    (Intent::ConceptMap, CONCEPT_MAP_KEYWORDS),
];

/// Classifies a query by substring keyword matching over the lowercased,
/// trimmed text. Falls back to [`Intent::Qa`].
pub fn classify_intent(query: &str) -> Intent {
    let q = query.trim().to_lowercase();
    INTENT_TABLE
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| q.contains(kw)))
        .map_or(Intent::Qa, |(intent, _)| *intent)
}
