//! Conversation turns and the append-only turn log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Who produced a committed turn.
///
/// On the backend wire the coach is tagged `"npc"`, matching the avatar
/// service's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "npc")]
    Coach,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::User => write!(f, "user"),
            Speaker::Coach => write!(f, "npc"),
        }
    }
}

/// One committed utterance. Immutable once created; the turn log only ever
/// appends, never edits or reorders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: Uuid,
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Creates a turn stamped with the current time. Callers are expected to
    /// pass non-empty text; the aggregator enforces this before committing.
    pub(crate) fn new(speaker: Speaker, text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            speaker,
            text,
            timestamp: Utc::now(),
        }
    }
}

/// The ordered record of committed turns for one session.
///
/// Insertion order is the single source of truth for transcript order. The
/// log is monotonically non-decreasing in length while a session is live and
/// is frozen (moved into the result) when the session ends.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TurnLog {
    turns: Vec<Turn>,
}

impl TurnLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a committed turn. Crate-private so nothing outside the
    /// aggregation path can grow the log.
    pub(crate) fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    /// Consumes the log, yielding the turns in commit order.
    pub fn into_turns(self) -> Vec<Turn> {
        self.turns
    }
}
