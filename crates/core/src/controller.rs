//! The session controller state machine.
//!
//! Owns all mutable session state: the per-speaker live buffers, the
//! append-only turn log, the question-progress counter, and the lifecycle
//! state. The controller performs no I/O; capture and teardown side effects
//! are returned as [`Command`]s for the runtime to execute against the SDK,
//! and transcript events are injected through [`handle_event`].
//!
//! Lifecycle: `Idle → Ready → Listening → Ready … → Ended`, with `Error`
//! reachable from any live state on an SDK or initialization failure. `Ended`
//! is terminal; nothing mutates the turn log afterwards.
//!
//! [`handle_event`]: SessionController::handle_event

use crate::aggregator::{LiveSnapshot, TranscriptAggregator};
use crate::avatar::AvatarConfig;
use crate::config::{SessionConfig, SessionResult};
use crate::error::SessionError;
use crate::event::AvatarEvent;
use crate::progress::QuestionProgress;
use crate::turn::{Speaker, Turn, TurnLog};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Lifecycle state of one practice session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Ready,
    Listening,
    Ended,
    Error { message: String },
}

/// Side effects the runtime must execute against the avatar SDK. Each
/// start/stop transition yields exactly one capture command; no retries are
/// issued on failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    StartCapture,
    StopCapture,
    SendText(String),
    /// Best-effort connection teardown after the session has ended; failures
    /// are logged and swallowed by the runtime.
    Teardown,
}

pub struct SessionController {
    session_id: Uuid,
    config: SessionConfig,
    state: SessionState,
    aggregator: TranscriptAggregator,
    log: TurnLog,
    progress: QuestionProgress,
    coach_speaking: bool,
}

impl SessionController {
    /// Creates a controller in the `Idle` state for the given configuration.
    pub fn new(config: SessionConfig) -> Self {
        let progress = QuestionProgress::new(config.num_questions);
        Self {
            session_id: Uuid::new_v4(),
            config,
            state: SessionState::Idle,
            aggregator: TranscriptAggregator::new(),
            log: TurnLog::new(),
            progress,
            coach_speaking: false,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn turns(&self) -> &[Turn] {
        self.log.turns()
    }

    pub fn coach_speaking(&self) -> bool {
        self.coach_speaking
    }

    /// Questions asked so far per the display heuristic, clamped to the
    /// configured target.
    pub fn questions_asked(&self) -> u32 {
        self.progress.current(self.aggregator.live(Speaker::Coach))
    }

    pub fn question_target(&self) -> u32 {
        self.progress.target()
    }

    /// Immutable copy of the live buffers for the UI layer.
    pub fn live_snapshot(&self) -> LiveSnapshot {
        self.aggregator.snapshot()
    }

    /// Validates the avatar credentials and moves `Idle → Ready`.
    ///
    /// A missing credential is fatal: the controller goes straight to
    /// `Error` with a descriptive message, and no capture command is ever
    /// produced afterwards.
    pub fn initialize(&mut self, avatar: &AvatarConfig) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::CaptureUnavailable(format!(
                "cannot initialize from state {:?}",
                self.state
            )));
        }
        if avatar.api_key.trim().is_empty() {
            return Err(self.fail(SessionError::MissingCredential("avatar API key")));
        }
        if avatar.character_id.trim().is_empty() {
            return Err(self.fail(SessionError::MissingCredential("avatar character id")));
        }
        info!(session_id = %self.session_id, level = %self.config.level, "Session initialized");
        self.state = SessionState::Ready;
        Ok(())
    }

    /// User pressed "start speaking". Allowed only in `Ready`, and not while
    /// the coach is still producing audio; a rejected attempt leaves all
    /// state untouched.
    pub fn start_capture(&mut self) -> Result<Command, SessionError> {
        match self.state {
            SessionState::Ready if self.coach_speaking => Err(SessionError::CaptureUnavailable(
                "the coach is still speaking".to_string(),
            )),
            SessionState::Ready => {
                // A fresh capture discards any stale half-utterance.
                self.aggregator.reset(Speaker::User);
                self.state = SessionState::Listening;
                debug!(session_id = %self.session_id, "Capture started");
                Ok(Command::StartCapture)
            }
            SessionState::Ended => Err(SessionError::Ended),
            ref other => Err(SessionError::CaptureUnavailable(format!(
                "cannot start capture from state {other:?}"
            ))),
        }
    }

    /// User pressed "stop speaking". Commits any live user buffer as a turn.
    pub fn stop_capture(&mut self) -> Result<(Command, Option<Turn>), SessionError> {
        match self.state {
            SessionState::Listening => {
                self.state = SessionState::Ready;
                let flushed = self.aggregator.flush(Speaker::User);
                let committed = self.commit(flushed);
                debug!(session_id = %self.session_id, committed = committed.is_some(), "Capture stopped");
                Ok((Command::StopCapture, committed))
            }
            SessionState::Ended => Err(SessionError::Ended),
            ref other => Err(SessionError::CaptureUnavailable(format!(
                "cannot stop capture from state {other:?}"
            ))),
        }
    }

    /// Sends typed text to the coach instead of speech. The text is committed
    /// as a user turn directly, bypassing the live buffer.
    pub fn submit_text(&mut self, text: &str) -> Result<(Command, Option<Turn>), SessionError> {
        match self.state {
            SessionState::Ready => {
                let finalized = self.aggregator.finalize(Speaker::User, text);
                let committed = self.commit(finalized);
                Ok((Command::SendText(text.to_string()), committed))
            }
            SessionState::Ended => Err(SessionError::Ended),
            ref other => Err(SessionError::CaptureUnavailable(format!(
                "cannot send text from state {other:?}"
            ))),
        }
    }

    /// Feeds one SDK event through the aggregator and state machine.
    /// Returns the turn committed by this event, if any. Events arriving
    /// after `Ended` are ignored entirely.
    pub fn handle_event(&mut self, event: AvatarEvent) -> Option<Turn> {
        if self.state == SessionState::Ended {
            debug!(session_id = %self.session_id, ?event, "Dropping event after session end");
            return None;
        }
        match event {
            AvatarEvent::UserFragment { text, is_final } => {
                if is_final {
                    let finalized = self.aggregator.finalize(Speaker::User, &text);
                    self.commit(finalized)
                } else {
                    self.aggregator.push_partial(Speaker::User, &text);
                    None
                }
            }
            AvatarEvent::CoachFragment { text, is_final } => {
                if is_final {
                    let finalized = self.aggregator.finalize(Speaker::Coach, &text);
                    self.commit(finalized)
                } else {
                    self.aggregator.push_partial(Speaker::Coach, &text);
                    None
                }
            }
            AvatarEvent::AudioStarted => {
                self.coach_speaking = true;
                None
            }
            AvatarEvent::AudioStopped => {
                self.coach_speaking = false;
                // End-of-audio doubles as the coach's finalization signal; a
                // no-op when an explicit final fragment already committed.
                let flushed = self.aggregator.flush(Speaker::Coach);
                self.commit(flushed)
            }
            AvatarEvent::Error(message) => {
                warn!(session_id = %self.session_id, %message, "Avatar SDK error");
                self.state = SessionState::Error { message };
                None
            }
            AvatarEvent::Closed => {
                warn!(session_id = %self.session_id, "Avatar connection closed mid-session");
                self.state = SessionState::Error {
                    message: "avatar connection closed".to_string(),
                };
                None
            }
        }
    }

    /// Ends the session from any live state, assembling the terminal
    /// [`SessionResult`] from the full turn log. Any live buffers are
    /// committed first so nothing the learner said is dropped. Terminal: a
    /// second call is refused and no event mutates the log afterwards.
    pub fn end_session(&mut self) -> Result<(SessionResult, Command), SessionError> {
        if self.state == SessionState::Ended {
            return Err(SessionError::Ended);
        }
        let user_leftover = self.aggregator.flush(Speaker::User);
        self.commit(user_leftover);
        let coach_leftover = self.aggregator.flush(Speaker::Coach);
        self.commit(coach_leftover);

        let total_questions = self.questions_asked();
        self.state = SessionState::Ended;
        self.coach_speaking = false;

        let turns = std::mem::take(&mut self.log).into_turns();
        info!(
            session_id = %self.session_id,
            turns = turns.len(),
            questions = total_questions,
            "Session ended"
        );
        let result = SessionResult {
            id: self.session_id,
            config: self.config.clone(),
            score: None,
            total_questions,
            turns,
            ended_at: Utc::now(),
            feedback: None,
            suggested_level: None,
            suggested_topics: vec![],
        };
        Ok((result, Command::Teardown))
    }

    /// Moves the controller to the error state, passing the error through so
    /// call sites can `return Err(self.fail(..))`.
    fn fail(&mut self, error: SessionError) -> SessionError {
        self.state = SessionState::Error {
            message: error.to_string(),
        };
        error
    }

    fn commit(&mut self, turn: Option<Turn>) -> Option<Turn> {
        let turn = turn?;
        if turn.speaker == Speaker::Coach {
            self.progress.record_committed(&turn.text);
        }
        self.log.push(turn.clone());
        Some(turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::AvatarConfig;

    fn avatar_config() -> AvatarConfig {
        AvatarConfig {
            api_key: "test-key".to_string(),
            character_id: "coach-7".to_string(),
            audio_enabled: true,
        }
    }

    fn ready_controller() -> SessionController {
        let config = SessionConfig::new("B2", 3, vec!["Work".to_string()]);
        let mut controller = SessionController::new(config);
        controller.initialize(&avatar_config()).unwrap();
        controller
    }

    #[test]
    fn test_missing_api_key_goes_to_error() {
        let mut controller = SessionController::new(SessionConfig::new("B2", 3, vec![]));
        let bad = AvatarConfig {
            api_key: "".to_string(),
            ..avatar_config()
        };

        let err = controller.initialize(&bad).unwrap_err();
        assert!(matches!(err, SessionError::MissingCredential(_)));
        assert!(matches!(controller.state(), SessionState::Error { .. }));

        // No capture command can ever be produced from the error state.
        assert!(controller.start_capture().is_err());
        assert!(controller.stop_capture().is_err());
    }

    #[test]
    fn test_missing_character_id_goes_to_error() {
        let mut controller = SessionController::new(SessionConfig::new("B2", 3, vec![]));
        let bad = AvatarConfig {
            character_id: "  ".to_string(),
            ..avatar_config()
        };

        assert!(controller.initialize(&bad).is_err());
        assert!(matches!(controller.state(), SessionState::Error { .. }));
    }

    #[test]
    fn test_capture_round_trip_commits_user_turn() {
        let mut controller = ready_controller();

        assert_eq!(controller.start_capture().unwrap(), Command::StartCapture);
        assert_eq!(*controller.state(), SessionState::Listening);

        controller.handle_event(AvatarEvent::user_partial("I work in "));
        controller.handle_event(AvatarEvent::user_partial("a hospital"));

        let (command, committed) = controller.stop_capture().unwrap();
        assert_eq!(command, Command::StopCapture);
        assert_eq!(committed.unwrap().text, "I work in a hospital");
        assert_eq!(*controller.state(), SessionState::Ready);
        assert_eq!(controller.turns().len(), 1);
    }

    #[test]
    fn test_start_capture_rejected_while_coach_speaks() {
        let mut controller = ready_controller();
        controller.handle_event(AvatarEvent::AudioStarted);

        let err = controller.start_capture().unwrap_err();
        assert!(matches!(err, SessionError::CaptureUnavailable(_)));
        // Rejection is a no-op, never silent state corruption.
        assert_eq!(*controller.state(), SessionState::Ready);

        controller.handle_event(AvatarEvent::AudioStopped);
        assert!(controller.start_capture().is_ok());
    }

    #[test]
    fn test_start_capture_rejected_while_already_listening() {
        let mut controller = ready_controller();
        controller.start_capture().unwrap();
        assert!(controller.start_capture().is_err());
        assert_eq!(*controller.state(), SessionState::Listening);
    }

    #[test]
    fn test_final_flag_then_audio_stop_commits_once() {
        let mut controller = ready_controller();
        controller.handle_event(AvatarEvent::AudioStarted);
        controller.handle_event(AvatarEvent::coach_partial("Where do you "));
        let committed = controller.handle_event(AvatarEvent::coach_final("live?"));
        assert_eq!(committed.unwrap().text, "Where do you live?");

        // The trailing end-of-audio signal finds an empty buffer.
        let again = controller.handle_event(AvatarEvent::AudioStopped);
        assert!(again.is_none());
        assert_eq!(controller.turns().len(), 1);
    }

    #[test]
    fn test_audio_stop_finalizes_coach_without_final_flag() {
        let mut controller = ready_controller();
        controller.handle_event(AvatarEvent::AudioStarted);
        controller.handle_event(AvatarEvent::coach_partial("Describe your hometown?"));
        let committed = controller.handle_event(AvatarEvent::AudioStopped);
        assert_eq!(committed.unwrap().text, "Describe your hometown?");
        assert!(!controller.coach_speaking());
    }

    #[test]
    fn test_submit_text_commits_and_yields_send_command() {
        let mut controller = ready_controller();
        let (command, committed) = controller.submit_text("I prefer typing.").unwrap();
        assert_eq!(command, Command::SendText("I prefer typing.".to_string()));
        assert_eq!(committed.unwrap().text, "I prefer typing.");
    }

    #[test]
    fn test_sdk_error_moves_to_error_state() {
        let mut controller = ready_controller();
        controller.handle_event(AvatarEvent::Error("mic permission denied".to_string()));
        assert_eq!(
            *controller.state(),
            SessionState::Error {
                message: "mic permission denied".to_string()
            }
        );
        assert!(controller.start_capture().is_err());
    }

    #[test]
    fn test_end_session_freezes_the_log() {
        let mut controller = ready_controller();
        controller.handle_event(AvatarEvent::coach_final("First question?"));
        controller.handle_event(AvatarEvent::user_final("First answer."));

        let (result, command) = controller.end_session().unwrap();
        assert_eq!(command, Command::Teardown);
        assert_eq!(result.turns.len(), 2);
        assert_eq!(*controller.state(), SessionState::Ended);

        // Late events are ignored and nothing is committed after the end.
        assert!(
            controller
                .handle_event(AvatarEvent::user_final("too late"))
                .is_none()
        );
        assert!(controller.turns().is_empty());
        assert!(controller.end_session().is_err());
    }

    #[test]
    fn test_end_session_commits_live_buffers() {
        let mut controller = ready_controller();
        controller.start_capture().unwrap();
        controller.handle_event(AvatarEvent::user_partial("an unfinished thought"));

        let (result, _) = controller.end_session().unwrap();
        assert_eq!(result.turns.len(), 1);
        assert_eq!(result.turns[0].text, "an unfinished thought");
    }

    #[test]
    fn test_end_session_allowed_from_error_state() {
        let mut controller = ready_controller();
        controller.handle_event(AvatarEvent::Closed);
        assert!(matches!(controller.state(), SessionState::Error { .. }));
        assert!(controller.end_session().is_ok());
    }

    #[test]
    fn test_three_question_scripted_session() {
        // The spec scenario: level B2, 3 questions, topic "Work". Three coach
        // turns each containing one "?", three user answers, interleaved.
        let mut controller = ready_controller();
        let questions = [
            "What do you do for work?",
            "Do you enjoy your job?",
            "Would you change careers?",
        ];
        let answers = ["I am a nurse.", "Yes, most days.", "Probably not."];

        for (question, answer) in questions.iter().zip(answers.iter()) {
            controller.handle_event(AvatarEvent::AudioStarted);
            controller.handle_event(AvatarEvent::coach_final(*question));
            controller.handle_event(AvatarEvent::AudioStopped);

            controller.start_capture().unwrap();
            controller.handle_event(AvatarEvent::user_partial(*answer));
            controller.stop_capture().unwrap();
        }

        assert_eq!(controller.questions_asked(), 3);
        assert_eq!(controller.question_target(), 3);

        let (result, _) = controller.end_session().unwrap();
        assert_eq!(result.total_questions, 3);
        assert_eq!(result.turns.len(), 6);

        // Commit order is event order: question then answer, three times.
        let speakers: Vec<Speaker> = result.turns.iter().map(|t| t.speaker).collect();
        assert_eq!(
            speakers,
            vec![
                Speaker::Coach,
                Speaker::User,
                Speaker::Coach,
                Speaker::User,
                Speaker::Coach,
                Speaker::User,
            ]
        );
        assert_eq!(result.turns[0].text, "What do you do for work?");
        assert_eq!(result.turns[5].text, "Probably not.");
    }

    #[test]
    fn test_live_snapshot_tracks_partials() {
        let mut controller = ready_controller();
        controller.start_capture().unwrap();
        controller.handle_event(AvatarEvent::user_partial("so far"));
        controller.handle_event(AvatarEvent::coach_partial("next up?"));

        let snap = controller.live_snapshot();
        assert_eq!(snap.user, "so far");
        assert_eq!(snap.coach, "next up?");
        // Live coach text already counts towards the heuristic.
        assert_eq!(controller.questions_asked(), 1);
    }
}
