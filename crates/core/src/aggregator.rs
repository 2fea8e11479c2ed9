//! Folds streaming partial/final transcript fragments into committed turns.
//!
//! Each speaker has at most one live buffer at a time. Partial fragments
//! extend the buffer; a final fragment (or an end-of-speech signal) commits
//! the trimmed buffer as exactly one [`Turn`] and clears it. Because the
//! buffer is empty after a commit, a trailing end-of-audio signal for the
//! same utterance is a no-op, which is what makes double finalization safe.

use crate::turn::{Speaker, Turn};
use serde::Serialize;

/// Read-only view of the in-progress text per speaker, handed to the UI
/// layer on each update instead of exposing the mutable buffers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LiveSnapshot {
    pub user: String,
    pub coach: String,
}

/// Per-speaker live buffers with exactly-once commit semantics.
#[derive(Debug, Default, Clone)]
pub struct TranscriptAggregator {
    user_buffer: String,
    coach_buffer: String,
}

impl TranscriptAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn buffer_mut(&mut self, speaker: Speaker) -> &mut String {
        match speaker {
            Speaker::User => &mut self.user_buffer,
            Speaker::Coach => &mut self.coach_buffer,
        }
    }

    /// The in-progress (unfinalized) text for one speaker.
    pub fn live(&self, speaker: Speaker) -> &str {
        match speaker {
            Speaker::User => &self.user_buffer,
            Speaker::Coach => &self.coach_buffer,
        }
    }

    /// Extends a speaker's live buffer with a partial fragment and returns
    /// the accumulated text for display. No turn is created.
    pub fn push_partial(&mut self, speaker: Speaker, fragment: &str) -> &str {
        let buffer = self.buffer_mut(speaker);
        buffer.push_str(fragment);
        buffer
    }

    /// Commits the speaker's accumulated buffer as one turn, appending the
    /// final fragment first. Returns `None` when the buffer is empty after
    /// trimming, so whitespace-only utterances never produce a turn.
    pub fn finalize(&mut self, speaker: Speaker, fragment: &str) -> Option<Turn> {
        self.push_partial(speaker, fragment);
        self.flush(speaker)
    }

    /// Commits whatever is buffered for the speaker, without new text. Used
    /// for explicit capture-stopped / speech-ended signals. Idempotent: a
    /// second flush after a commit finds an empty buffer and does nothing.
    pub fn flush(&mut self, speaker: Speaker) -> Option<Turn> {
        let buffer = self.buffer_mut(speaker);
        let text = buffer.trim().to_string();
        buffer.clear();
        if text.is_empty() {
            return None;
        }
        Some(Turn::new(speaker, text))
    }

    /// Drops any in-progress text for the speaker, e.g. when a new capture
    /// starts before the previous buffer was finalized.
    pub fn reset(&mut self, speaker: Speaker) {
        self.buffer_mut(speaker).clear();
    }

    /// Immutable copy of both live buffers for the UI layer.
    pub fn snapshot(&self) -> LiveSnapshot {
        LiveSnapshot {
            user: self.user_buffer.clone(),
            coach: self.coach_buffer.clone(),
        }
    }
}
