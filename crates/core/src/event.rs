//! The normalized event vocabulary emitted by an avatar SDK adapter.
//!
//! Any concrete SDK integration translates its callback surface into this
//! enum and pushes the events down a channel, so the aggregator and the
//! controller can be driven by synthetic event sequences in tests.

/// Events any avatar/speech provider can emit back to the session runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum AvatarEvent {
    /// A speech-to-text fragment of the learner's in-progress utterance.
    UserFragment { text: String, is_final: bool },
    /// A fragment of the coach's reply (spoken aloud by the avatar).
    CoachFragment { text: String, is_final: bool },
    /// The avatar started playing audio; capture must not start now.
    AudioStarted,
    /// The avatar finished playing audio; also finalizes the coach's
    /// utterance when no explicit final fragment arrived.
    AudioStopped,
    /// The SDK reported a runtime error.
    Error(String),
    /// The SDK connection was closed.
    Closed,
}

impl AvatarEvent {
    /// Convenience constructor for a partial user fragment.
    pub fn user_partial(text: impl Into<String>) -> Self {
        AvatarEvent::UserFragment {
            text: text.into(),
            is_final: false,
        }
    }

    /// Convenience constructor for a final user fragment.
    pub fn user_final(text: impl Into<String>) -> Self {
        AvatarEvent::UserFragment {
            text: text.into(),
            is_final: true,
        }
    }

    /// Convenience constructor for a partial coach fragment.
    pub fn coach_partial(text: impl Into<String>) -> Self {
        AvatarEvent::CoachFragment {
            text: text.into(),
            is_final: false,
        }
    }

    /// Convenience constructor for a final coach fragment.
    pub fn coach_final(text: impl Into<String>) -> Self {
        AvatarEvent::CoachFragment {
            text: text.into(),
            is_final: true,
        }
    }
}
