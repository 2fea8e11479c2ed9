//! The seam to the external conversational-avatar SDK.
//!
//! The real SDK is callback-driven and lives outside this codebase. Adapters
//! translate its callbacks into [`AvatarEvent`]s pushed down a channel and
//! implement [`AvatarClient`] for the commands flowing the other way. The
//! [`ScriptedAvatarClient`] here replays a canned event script, so the whole
//! session flow runs deterministically in tests and in the demo binary
//! without any network.

use crate::error::SessionError;
use crate::event::AvatarEvent;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

/// Construction parameters for an avatar SDK connection. Both credentials
/// are required; the controller refuses to initialize without them.
#[derive(Debug, Clone)]
pub struct AvatarConfig {
    pub api_key: String,
    pub character_id: String,
    /// Whether the avatar should speak its replies aloud.
    pub audio_enabled: bool,
}

/// Commands a session runtime issues to an avatar SDK connection.
///
/// Implementations must not retry internally; a failure surfaces once and
/// moves the session to its error state.
#[async_trait]
pub trait AvatarClient: Send + Sync {
    /// Starts microphone capture for the learner's next utterance.
    async fn start_capture(&self) -> Result<(), SessionError>;

    /// Stops microphone capture.
    async fn stop_capture(&self) -> Result<(), SessionError>;

    /// Sends typed text to the avatar in place of speech.
    async fn send_text(&self, text: &str) -> Result<(), SessionError>;

    /// Closes the SDK connection. Called best-effort after session end;
    /// callers ignore the result.
    async fn teardown(&self) -> Result<(), SessionError>;
}

/// A deterministic [`AvatarClient`] that emits the next batch of scripted
/// events every time the learner finishes an exchange (capture stop or text
/// send). Exposes call counters so tests can assert how the SDK was driven.
pub struct ScriptedAvatarClient {
    script: Mutex<VecDeque<Vec<AvatarEvent>>>,
    events_tx: mpsc::Sender<AvatarEvent>,
    capture_starts: AtomicUsize,
    capture_stops: AtomicUsize,
    torn_down: AtomicUsize,
}

impl ScriptedAvatarClient {
    /// Builds the client and the receiving half of its event channel. Each
    /// inner `Vec` is one exchange: the events replayed after the learner's
    /// next capture-stop or text send.
    pub fn new(script: Vec<Vec<AvatarEvent>>) -> (Self, mpsc::Receiver<AvatarEvent>) {
        let (events_tx, events_rx) = mpsc::channel(64);
        (
            Self {
                script: Mutex::new(script.into_iter().collect()),
                events_tx,
                capture_starts: AtomicUsize::new(0),
                capture_stops: AtomicUsize::new(0),
                torn_down: AtomicUsize::new(0),
            },
            events_rx,
        )
    }

    /// A ready-made script for one coach opening plus `questions` scripted
    /// exchanges, each ending in a question mark.
    pub fn question_script(questions: u32) -> Vec<Vec<AvatarEvent>> {
        (1..=questions)
            .map(|n| {
                vec![
                    AvatarEvent::AudioStarted,
                    AvatarEvent::coach_partial(format!("Here is question number {n}: ")),
                    AvatarEvent::coach_final("could you tell me more?"),
                    AvatarEvent::AudioStopped,
                ]
            })
            .collect()
    }

    pub fn capture_starts(&self) -> usize {
        self.capture_starts.load(Ordering::SeqCst)
    }

    pub fn capture_stops(&self) -> usize {
        self.capture_stops.load(Ordering::SeqCst)
    }

    pub fn torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst) > 0
    }

    async fn play_next_exchange(&self) {
        let batch = {
            let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
            script.pop_front()
        };
        let Some(batch) = batch else {
            debug!("Script exhausted; no further avatar events");
            return;
        };
        for event in batch {
            // The receiver dropping just means the session loop is gone.
            if self.events_tx.send(event).await.is_err() {
                return;
            }
        }
    }
}

#[async_trait]
impl AvatarClient for ScriptedAvatarClient {
    async fn start_capture(&self) -> Result<(), SessionError> {
        self.capture_starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_capture(&self) -> Result<(), SessionError> {
        self.capture_stops.fetch_add(1, Ordering::SeqCst);
        self.play_next_exchange().await;
        Ok(())
    }

    async fn send_text(&self, _text: &str) -> Result<(), SessionError> {
        self.play_next_exchange().await;
        Ok(())
    }

    async fn teardown(&self) -> Result<(), SessionError> {
        self.torn_down.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stop_capture_plays_next_exchange() {
        let script = vec![vec![
            AvatarEvent::AudioStarted,
            AvatarEvent::coach_final("Shall we begin?"),
            AvatarEvent::AudioStopped,
        ]];
        let (client, mut events) = ScriptedAvatarClient::new(script);

        client.start_capture().await.unwrap();
        client.stop_capture().await.unwrap();

        assert_eq!(events.recv().await.unwrap(), AvatarEvent::AudioStarted);
        assert_eq!(
            events.recv().await.unwrap(),
            AvatarEvent::coach_final("Shall we begin?")
        );
        assert_eq!(events.recv().await.unwrap(), AvatarEvent::AudioStopped);
        assert_eq!(client.capture_starts(), 1);
        assert_eq!(client.capture_stops(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_script_is_silent() {
        let (client, mut events) = ScriptedAvatarClient::new(vec![]);
        client.stop_capture().await.unwrap();
        drop(client);
        assert!(events.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_question_script_shape() {
        let script = ScriptedAvatarClient::question_script(3);
        assert_eq!(script.len(), 3);
        for exchange in &script {
            assert_eq!(exchange.first(), Some(&AvatarEvent::AudioStarted));
            assert_eq!(exchange.last(), Some(&AvatarEvent::AudioStopped));
        }
    }

    #[tokio::test]
    async fn test_teardown_is_recorded() {
        let (client, _events) = ScriptedAvatarClient::new(vec![]);
        assert!(!client.torn_down());
        client.teardown().await.unwrap();
        assert!(client.torn_down());
    }
}
