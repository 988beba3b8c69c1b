use std::collections::VecDeque;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use mentor_core::{ConversationTurn, Role, TurnResponse};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_MAX_HISTORY_TURNS: usize = 5;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("turn counter exhausted at {0}")]
    TurnsExhausted(u64),
}

#[derive(Debug, Default)]
struct History {
    turns: VecDeque<ConversationTurn>,
    counter: u64,
}

/// Shared conversation log. Holds at most `2 * max_history_turns` entries
/// (one user and one assistant entry per exchange), oldest evicted first.
///
/// Turn numbers keep increasing across restarts: on open the counter is
/// restored from the highest id prefix in the persisted record.
#[derive(Debug)]
pub struct ConversationStore {
    path: PathBuf,
    max_history_turns: usize,
    state: Mutex<History>,
}

impl ConversationStore {
    /// Missing or unreadable records start an empty history rather than
    /// failing; only an uncreatable parent directory is an error.
    pub fn open(path: impl AsRef<Path>, max_history_turns: usize) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let max_history_turns = max_history_turns.max(1);
        let turns = load_record(&path);
        let counter = restored_counter(&path, &turns);

        let mut history = History {
            turns: turns.into(),
            counter,
        };
        truncate(&mut history.turns, 2 * max_history_turns);
        debug!(
            path = %path.display(),
            entries = history.turns.len(),
            counter,
            "conversation history loaded"
        );

        Ok(Self {
            path,
            max_history_turns,
            state: Mutex::new(history),
        })
    }

    /// Records one completed exchange under a fresh turn number. Fails only
    /// once every turn number has been handed out.
    pub fn append(
        &self,
        user_text: impl Into<String>,
        assistant_text: impl Into<String>,
        t_request: impl Into<String>,
        t_response: impl Into<String>,
    ) -> Result<TurnResponse, StorageError> {
        let mut state = self.state.lock();
        let turn = state
            .counter
            .checked_add(1)
            .ok_or(StorageError::TurnsExhausted(state.counter))?;
        state.counter = turn;

        let student = ConversationTurn::new(turn, Role::User, user_text, t_request);
        let assistant = ConversationTurn::new(turn, Role::Assistant, assistant_text, t_response);
        state.turns.push_back(student.clone());
        state.turns.push_back(assistant.clone());
        truncate(&mut state.turns, 2 * self.max_history_turns);

        Ok(TurnResponse {
            turn,
            student,
            assistant,
        })
    }

    /// The last `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<ConversationTurn> {
        let state = self.state.lock();
        let skip = state.turns.len().saturating_sub(n);
        state.turns.iter().skip(skip).cloned().collect()
    }

    pub fn snapshot(&self) -> Vec<ConversationTurn> {
        self.state.lock().turns.iter().cloned().collect()
    }

    pub fn turn_counter(&self) -> u64 {
        self.state.lock().counter
    }

    pub fn len(&self) -> usize {
        self.state.lock().turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the whole history as a pretty JSON array. The lock is held
    /// through the rename so an older snapshot never lands after a newer one.
    pub fn persist(&self) -> Result<(), StorageError> {
        let state = self.state.lock();
        let bytes = serde_json::to_vec_pretty(&state.turns)?;
        write_atomic(&self.path, &bytes)?;
        debug!(entries = state.turns.len(), "conversation history persisted");
        Ok(())
    }

    pub fn persist_best_effort(&self) {
        if let Err(err) = self.persist() {
            warn!(path = %self.path.display(), error = %err, "failed to persist conversation history");
        }
    }
}

fn load_record(path: &Path) -> Vec<ConversationTurn> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "cannot read conversation history, starting empty");
            return Vec::new();
        }
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Vec::new();
    }
    match serde_json::from_slice(&bytes) {
        Ok(turns) => turns,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "conversation history is corrupt, starting empty");
            Vec::new()
        }
    }
}

/// Highest turn number in the record. Ids at `u64::MAX` leave no room for
/// another turn and are ignored.
fn restored_counter(path: &Path, turns: &[ConversationTurn]) -> u64 {
    let mut counter = 0;
    for turn in turns {
        match turn.turn_number() {
            Some(u64::MAX) => {
                warn!(path = %path.display(), id = %turn.id, "ignoring exhausted turn id");
            }
            Some(n) => counter = counter.max(n),
            None => {}
        }
    }
    counter
}

fn truncate(turns: &mut VecDeque<ConversationTurn>, max_entries: usize) {
    while turns.len() > max_entries {
        turns.pop_front();
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}
