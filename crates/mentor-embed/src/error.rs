use thiserror::Error;

/// Failures reaching an embedding backend or reading its reply.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("embedding provider misconfigured: {0}")]
    Config(String),

    #[error("embedding transport failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding payload could not be decoded: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("embedding reply carried {actual} vectors for {expected} inputs")]
    VectorCount { expected: usize, actual: usize },

    #[error("embedding provider answered with status {status}: {body}")]
    Api { status: u16, body: String },
}

impl ProviderError {
    /// Error text with credentials removed, safe for logs.
    pub fn redacted(&self, secrets: &[&str]) -> String {
        let mut out = self.to_string();
        for secret in secrets.iter().filter(|s| !s.is_empty()) {
            out = out.replace(secret, "[REDACTED]");
        }
        redact_query_param(&out, "key=")
    }
}

fn redact_query_param(input: &str, marker: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find(marker) {
        let (head, tail) = rest.split_at(pos + marker.len());
        out.push_str(head);
        out.push_str("[REDACTED]");
        let end = tail
            .find(|c: char| c == '&' || c == ' ' || c == '"' || c == ')')
            .unwrap_or(tail.len());
        rest = tail.get(end..).unwrap_or("");
    }
    out.push_str(rest);
    out
}
