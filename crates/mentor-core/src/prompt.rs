use crate::intent::Intent;

/// Built-in tutor persona used when no persona file is configured.
pub const DEFAULT_PERSONA: &str = "You are Mentor, a curriculum tutor speaking to a student inside an immersive classroom. \
You know every chapter and lesson of the official curriculum and you answer only from it.

HOW YOU TEACH:
- Start from the core idea, then build up step by step.
- Connect concepts to everyday life so they are easy to remember.
- Stay patient and encouraging; never make the student feel slow.
- Keep every statement scientifically accurate.

HOW YOU SPEAK:
- Keep answers between 70 and 120 words.
- Use plain sentences that read well on a whiteboard and sound natural through text-to-speech.
- Never use markdown, bullet symbols, emojis or other formatting characters.
- Build on what was said earlier in the conversation when it helps.";

/// Returned instead of a model call when a query fails the curriculum gate.
pub const OUT_OF_CURRICULUM_MESSAGE: &str = "That question seems to be outside the curriculum I teach. \
Let's stay with the chapters we are studying; ask me about any lesson and we can explore it together.";

/// Context placeholder used when retrieval produced no passages.
pub const NO_CONTEXT_PLACEHOLDER: &str = "No specific context available.";

/// Mission paragraph appended to the persona for each intent.
pub const fn mission(intent: Intent) -> &'static str {
    match intent {
        Intent::Qa => {
            "Answer the question as a small moment of discovery. Begin with the core concept, \
             add understanding one layer at a time, tie it to a real-world example, and close \
             with one idea the student will remember."
        }
        Intent::Explain => {
            "Make the idea clear. Open with a familiar analogy, then walk through the process \
             step by step so the student can picture what happens, down to the molecular level \
             when it matters."
        }
        Intent::Summary => {
            "Condense the topic into the essentials. Arrange the key concepts in a logical order \
             that is easy to recall during an exam and highlight the most important relationships \
             and processes."
        }
        Intent::QuestionGeneration => {
            "Write four or five practice questions that go from simple recall to applying the \
             idea. Present them as a plain numbered list so the student can test themselves \
             progressively."
        }
        Intent::ExamPrep => {
            "Help the student get exam ready. Focus on high-yield concepts, memory techniques \
             and exam strategy, and point out what examiners usually look for."
        }
        Intent::ConceptMap => {
            "Show how the ideas connect. Describe how the relevant systems and processes relate \
             to and influence each other so the student sees the big picture instead of \
             scattered facts."
        }
        Intent::Mcq => {
            "Treat multiple choice as a chance to learn. If options are given, reason through \
             each one and explain why the correct answer is right. If there are no options, \
             explain the concept with tips for answering such questions."
        }
    }
}

/// Builds the system instruction from a persona, retrieved context and intent.
#[derive(Debug, Clone)]
pub struct PromptSynthesizer {
    persona: String,
}

impl Default for PromptSynthesizer {
    fn default() -> Self {
        Self::new(DEFAULT_PERSONA)
    }
}

impl PromptSynthesizer {
    pub fn new(persona: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
        }
    }

    pub fn synthesize(&self, intent: Intent, context_text: &str) -> String {
        format!(
            "{}\n\nCURRICULUM CONTENT:\n{}\n\nMISSION: {}",
            self.persona.trim_end(),
            context_text,
            mission(intent)
        )
    }
}

/// Retrieved passage rendered for the tutoring prompt.
pub fn format_passage(chapter: &str, lesson: &str, text: &str) -> String {
    format!("Chapter: {chapter} | Lesson: {lesson}\n{}", text.trim())
}

/// Joins formatted passages with blank lines, or yields the placeholder.
pub fn join_context<I, S>(passages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = passages
        .into_iter()
        .map(|p| p.as_ref().to_string())
        .collect::<Vec<_>>()
        .join("\n\n");
    if joined.is_empty() {
        NO_CONTEXT_PLACEHOLDER.to_string()
    } else {
        joined
    }
}

pub const QUIZ_QUESTION_COUNT: usize = 10;

/// System instruction for the quiz variant. The model must answer with one
/// JSON object and nothing else.
pub fn quiz_system_prompt() -> String {
    format!(
        "You write exams. You receive a quiz topic, supporting passages and instructor notes. \
         Reply with ONE JSON object that follows this schema exactly and output nothing else:\n\n\
         {{\n  \"questions\": [\n    {{\n      \"id\": 1,\n      \"text\": \"Question text\",\n      \
         \"options\": [\"First option\", \"Second option\", \"Third option\", \"Fourth option\"]\n    }}\n  ],\n  \
         \"answers\": {{\"1\": \"2\"}}\n}}\n\n\
         Rules:\n\
         1. Write exactly {QUIZ_QUESTION_COUNT} multiple-choice questions with 4 options each.\n\
         2. Each value in \"answers\" is the position of the correct option: 1, 2, 3 or 4.\n\
         3. Do not put the word \"Option\" or any numbering inside answers or options.\n\
         4. Do not write any text outside the JSON object.\n\
         5. Follow the instructor notes strictly, for example on difficulty, style or the mix of question types.\n"
    )
}

/// User message for the quiz variant.
pub fn quiz_user_message(title: &str, notes: &str, passages: &[String]) -> String {
    format!(
        "Quiz Title: {title}\n\nInstructor Notes: {notes}\n\nSupporting Passages:\n\n{}",
        passages.join("\n\n---\n\n")
    )
}
