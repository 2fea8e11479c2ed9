//! Session configuration and the terminal session result.

use crate::turn::Turn;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable input describing one practice session. Created once at setup
/// and read-only thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// The skill being practised, e.g. "speaking".
    pub skill: String,
    /// The learner's current proficiency level, e.g. "B2".
    pub level: String,
    /// How many questions the coach should aim to ask.
    pub num_questions: u32,
    /// Topics the coach should draw questions from.
    pub topics: Vec<String>,
    pub student_name: Option<String>,
    /// Free-form profile text forwarded to the prompt builder.
    pub student_info: Option<String>,
    /// The exam band the learner is working towards, when known.
    pub target_band: Option<f32>,
}

impl SessionConfig {
    /// Convenience constructor for the common case; optional fields default
    /// to absent and can be filled in by struct update.
    pub fn new(level: impl Into<String>, num_questions: u32, topics: Vec<String>) -> Self {
        Self {
            skill: "speaking".to_string(),
            level: level.into(),
            num_questions,
            topics,
            student_name: None,
            student_info: None,
            target_band: None,
        }
    }

    /// The topic sent to the backend: the first configured topic, or a
    /// general-conversation fallback when none was chosen.
    pub fn primary_topic(&self) -> &str {
        self.topics
            .first()
            .map(String::as_str)
            .unwrap_or("General conversation")
    }
}

/// The terminal summary of an ended session. Created exactly once, when the
/// controller leaves the session, and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResult {
    pub id: Uuid,
    pub config: SessionConfig,
    /// Score awarded by the backend, absent if the session ended without one.
    pub score: Option<f32>,
    /// Questions the coach asked, per the display heuristic.
    pub total_questions: u32,
    /// The full turn log in commit order.
    pub turns: Vec<Turn>,
    pub ended_at: DateTime<Utc>,
    pub feedback: Option<String>,
    pub suggested_level: Option<String>,
    pub suggested_topics: Vec<String>,
}

impl SessionResult {
    /// Folds the backend's end-of-session outcome into the result. Consuming
    /// rather than mutating keeps the handed-off value immutable.
    pub fn with_outcome(mut self, score: Option<f32>, feedback: Option<String>) -> Self {
        self.score = score;
        self.feedback = feedback;
        self
    }
}
