use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const VALID_ANSWERS: [&str; 4] = ["1", "2", "3", "4"];
const DEFAULT_ANSWER: &str = "1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: u64,
    pub text: String,
    pub options: Vec<String>,
}

/// Normalized quiz: options carry no enumeration markers and every answer
/// is one of [`VALID_ANSWERS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizDocument {
    pub questions: Vec<QuizQuestion>,
    pub answers: BTreeMap<String, String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuizParseError {
    #[error("no JSON object found ({0})")]
    NoDocument(String),

    #[error("invalid quiz document: {0}")]
    Invalid(String),
}

/// Parses raw model output in stages: the whole text as JSON first, then
/// every ``` fenced segment, then gives up.
pub fn parse_quiz(raw: &str) -> Result<QuizDocument, QuizParseError> {
    let document = locate_document(raw)?;
    normalize_document(&document)
}

fn locate_document(raw: &str) -> Result<Map<String, Value>, QuizParseError> {
    let trimmed = raw.trim();
    let direct_error = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => return Ok(map),
        Ok(other) => format!("expected an object, found {}", value_kind(&other)),
        Err(err) => err.to_string(),
    };

    if trimmed.contains("```") {
        for segment in trimmed.split("```").map(strip_language_tag) {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(segment) {
                return Ok(map);
            }
        }
    }

    Err(QuizParseError::NoDocument(direct_error))
}

/// Drops a leading info string such as `json` from a fenced block.
fn strip_language_tag(segment: &str) -> &str {
    let segment = segment.trim();
    if segment.starts_with('{') {
        return segment;
    }
    match segment.split_once('\n') {
        Some((tag, rest)) if tag.trim().chars().all(|c| c.is_ascii_alphanumeric()) => rest.trim(),
        _ => segment,
    }
}

fn normalize_document(document: &Map<String, Value>) -> Result<QuizDocument, QuizParseError> {
    let questions = match document.get("questions") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(pos, item)| normalize_question(pos, item))
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(QuizParseError::Invalid(format!(
                "questions must be an array, found {}",
                value_kind(other)
            )))
        }
    };

    let mut answers = BTreeMap::new();
    match document.get("answers") {
        None | Some(Value::Null) => {}
        Some(Value::Object(map)) => {
            for (qid, value) in map {
                answers.insert(qid.trim().to_string(), coerce_answer(value));
            }
        }
        // Some models emit the key as a list in question order.
        Some(Value::Array(values)) => {
            for (pos, value) in values.iter().enumerate() {
                answers.insert((pos + 1).to_string(), coerce_answer(value));
            }
        }
        Some(other) => {
            return Err(QuizParseError::Invalid(format!(
                "answers must be an object, found {}",
                value_kind(other)
            )))
        }
    }

    for question in &questions {
        answers
            .entry(question.id.to_string())
            .or_insert_with(|| DEFAULT_ANSWER.to_string());
    }

    Ok(QuizDocument { questions, answers })
}

fn normalize_question(position: usize, item: &Value) -> Result<QuizQuestion, QuizParseError> {
    let Value::Object(fields) = item else {
        return Err(QuizParseError::Invalid(format!(
            "question {} is {}, expected an object",
            position + 1,
            value_kind(item)
        )));
    };

    let id = match fields.get("id") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .unwrap_or(position as u64 + 1);

    let text = match fields.get("text").or_else(|| fields.get("question")) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
        None => String::new(),
    };

    let options = match fields.get("options") {
        Some(Value::Array(raw)) => raw
            .iter()
            .map(|opt| match opt {
                Value::String(s) => Ok(strip_enumeration(s)),
                Value::Number(n) => Ok(n.to_string()),
                other => Err(QuizParseError::Invalid(format!(
                    "question {id} has a non-text option ({})",
                    value_kind(other)
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => {
            return Err(QuizParseError::Invalid(format!(
                "question {id} has no options array"
            )))
        }
    };

    Ok(QuizQuestion { id, text, options })
}

/// Anything outside `"1".."4"` becomes `"1"`.
pub fn coerce_answer(value: &Value) -> String {
    let candidate = match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    if VALID_ANSWERS.contains(&candidate.as_str()) {
        candidate
    } else {
        DEFAULT_ANSWER.to_string()
    }
}

/// Removes bullets and `1.`, `2)`, `(3)`, `4.Golgi` style markers from the
/// start of an option. Decimals that are part of the text, like
/// `3.5 litres`, stay.
pub fn strip_enumeration(option: &str) -> String {
    let mut text = option.trim().trim_start_matches(['-', '*', '•']).trim_start();

    let body = text.strip_prefix('(').unwrap_or(text);
    let after_digits = body.trim_start_matches(|c: char| c.is_ascii_digit());
    if after_digits.len() < body.len() {
        if let Some(rest) = after_digits.strip_prefix(['.', ')']) {
            if !rest.starts_with(|c: char| c.is_ascii_digit()) {
                text = rest.trim_start();
            }
        }
    }

    text.trim().to_string()
}

const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_json() -> String {
        json!({
            "questions": [
                {"id": 1, "text": "Powerhouse of the cell?", "options": ["1. Mitochondria", "2) Nucleus", "- Ribosome", "4.Golgi"]},
                {"id": 2, "text": "Volume?", "options": ["3.5 litres", "(2) two", "* 10", "none"]}
            ],
            "answers": {"1": "1", "2": 3}
        })
        .to_string()
    }

    #[test]
    fn parses_bare_json_and_strips_markers() {
        let quiz = parse_quiz(&sample_json()).expect("parse");
        assert_eq!(quiz.questions.len(), 2);
        assert_eq!(
            quiz.questions[0].options,
            vec!["Mitochondria", "Nucleus", "Ribosome", "Golgi"]
        );
        assert_eq!(quiz.questions[1].options, vec!["3.5 litres", "two", "10", "none"]);
        assert_eq!(quiz.answers["1"], "1");
        assert_eq!(quiz.answers["2"], "3");
    }

    #[test]
    fn markers_without_space_are_stripped() {
        let stripped = ["1.Mitochondria", "2.Nucleus", "3)Ribosome", "(4)Golgi"]
            .map(strip_enumeration);
        assert_eq!(stripped, ["Mitochondria", "Nucleus", "Ribosome", "Golgi"]);
        assert_eq!(strip_enumeration("3.5 litres"), "3.5 litres");
        assert_eq!(strip_enumeration("10 cells"), "10 cells");
        assert_eq!(strip_enumeration("7."), "");
    }

    #[test]
    fn finds_document_inside_fences() {
        let raw = format!("Here is your quiz:\n```json\n{}\n```\nGood luck!", sample_json());
        let quiz = parse_quiz(&raw).expect("parse fenced");
        assert_eq!(quiz.questions.len(), 2);

        let bare_fence = format!("```\n{}\n```", sample_json());
        assert!(parse_quiz(&bare_fence).is_ok());
    }

    #[test]
    fn invalid_answers_coerce_to_first_option() {
        let raw = json!({
            "questions": [
                {"id": 1, "text": "a", "options": ["w", "x", "y", "z"]},
                {"id": 2, "text": "b", "options": ["w", "x", "y", "z"]},
                {"id": 3, "text": "c", "options": ["w", "x", "y", "z"]},
                {"id": 4, "text": "d", "options": ["w", "x", "y", "z"]}
            ],
            "answers": {"1": "5", "2": "B", "3": " 4 "}
        })
        .to_string();
        let quiz = parse_quiz(&raw).expect("parse");
        assert_eq!(quiz.answers["1"], "1");
        assert_eq!(quiz.answers["2"], "1");
        assert_eq!(quiz.answers["3"], "4");
        // missing entry for question 4
        assert_eq!(quiz.answers["4"], "1");
        assert!(quiz.answers.values().all(|a| VALID_ANSWERS.contains(&a.as_str())));
    }

    #[test]
    fn coerce_answer_passes_valid_values() {
        for valid in VALID_ANSWERS {
            assert_eq!(coerce_answer(&json!(valid)), valid);
        }
        assert_eq!(coerce_answer(&json!(2)), "2");
        assert_eq!(coerce_answer(&json!(2.0)), "1");
        assert_eq!(coerce_answer(&json!(null)), "1");
        assert_eq!(coerce_answer(&json!("Option 2")), "1");
    }

    #[test]
    fn unparseable_output_is_an_error() {
        let err = parse_quiz("Sorry, I cannot help with that.").expect_err("must fail");
        assert!(matches!(err, QuizParseError::NoDocument(_)));

        let err = parse_quiz("```json\nnot json\n```").expect_err("must fail");
        assert!(matches!(err, QuizParseError::NoDocument(_)));

        let err = parse_quiz(r#"{"questions": "ten"}"#).expect_err("must fail");
        assert!(matches!(err, QuizParseError::Invalid(_)));

        let err = parse_quiz(r#"{"questions": [{"id": 1, "text": "x"}]}"#).expect_err("must fail");
        assert!(matches!(err, QuizParseError::Invalid(_)));
    }

    #[test]
    fn array_answer_keys_follow_question_order() {
        let raw = r#"{"questions": [{"id": 1, "text": "a", "options": ["p","q","r","s"]}], "answers": ["3", "9"]}"#;
        let quiz = parse_quiz(raw).expect("parse");
        assert_eq!(quiz.answers["1"], "3");
        assert_eq!(quiz.answers["2"], "1");
    }
}
