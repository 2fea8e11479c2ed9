//! Display heuristic for "questions asked so far".
//!
//! Counts question marks in the coach's committed and live text, clamped to
//! the configured target. This may over- or under-count (a rhetorical "?"
//! inflates it, a prompt phrased without one is missed) and must never gate
//! session completion; it exists purely for the progress indicator.

/// Tracks the approximate number of questions the coach has asked.
#[derive(Debug, Clone)]
pub struct QuestionProgress {
    target: u32,
    committed: u32,
}

fn count_question_marks(text: &str) -> u32 {
    text.chars().filter(|c| *c == '?').count() as u32
}

impl QuestionProgress {
    pub fn new(target: u32) -> Self {
        Self {
            target,
            committed: 0,
        }
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    /// Folds a committed coach turn into the running count.
    pub fn record_committed(&mut self, text: &str) {
        self.committed = self.committed.saturating_add(count_question_marks(text));
    }

    /// Current count including the coach's live (uncommitted) text, clamped
    /// to the target so the indicator never shows 4/3.
    pub fn current(&self, live_coach_text: &str) -> u32 {
        self.committed
            .saturating_add(count_question_marks(live_coach_text))
            .min(self.target)
    }

    pub fn is_target_reached(&self, live_coach_text: &str) -> bool {
        self.current(live_coach_text) >= self.target
    }
}
