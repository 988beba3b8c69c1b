use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const NO_QUERY: &str = "No query provided";
pub const RETRIEVAL_UNAVAILABLE: &str = "Retrieval is temporarily unavailable";
pub const MISSING_TITLE: &str = "Missing quiz title";
pub const NO_PASSAGES: &str = "No relevant passages found";
pub const RETRIEVAL_FAILED: &str = "Retrieval failed";
pub const HISTORY_UNAVAILABLE: &str = "Conversation history is unavailable";

/// `{error}` reply, optionally stamped and carrying the raw model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl ErrorReply {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            timestamp: None,
            raw: None,
        }
    }

    pub fn stamped(error: impl Into<String>) -> Self {
        Self {
            timestamp: Some(now_timestamp()),
            ..Self::new(error)
        }
    }

    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }
}

/// Local wall-clock time, ISO-8601 with microseconds and no offset.
pub fn now_timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Trimmed string field; anything else counts as absent.
pub fn text_field<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
