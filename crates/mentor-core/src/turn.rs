use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    const fn id_suffix(self) -> &'static str {
        match self {
            Self::User => "a",
            Self::Assistant => "b",
        }
    }
}

/// One side of an exchange as stored in history and sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: String,
}

impl ConversationTurn {
    pub fn new(
        turn: u64,
        role: Role,
        content: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("{turn}-{}", role.id_suffix()),
            role,
            content: content.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Numeric prefix of the id, e.g. `12` for `"12-b"`.
    pub fn turn_number(&self) -> Option<u64> {
        self.id.split('-').next()?.trim().parse().ok()
    }
}

/// Successful chat reply: the turn number plus both sides of the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnResponse {
    pub turn: u64,
    pub student: ConversationTurn,
    pub assistant: ConversationTurn,
}
