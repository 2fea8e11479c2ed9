//! The single event loop for one live practice session.
//!
//! All state transitions happen here, one event at a time: SDK events from
//! the avatar adapter's channel and user actions from the UI-facing channel
//! are folded into the [`SessionController`], and the `Command`s it returns
//! are executed against the [`AvatarClient`]. Committed turns are persisted
//! to the backend best-effort; a persistence failure is logged, never fatal,
//! because the client-side turn log is the authoritative transcript.

use anyhow::{Context, Result};
use speakprep_core::avatar::{AvatarClient, AvatarConfig};
use speakprep_core::backend::{SessionBackend, StartSessionRequest, TurnRecord};
use speakprep_core::controller::{Command, SessionController};
use speakprep_core::{AvatarEvent, SessionConfig, SessionResult, Turn};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Actions arriving from the user-facing side of the session.
#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    StartCapture,
    StopCapture,
    SubmitText(String),
    EndSession,
}

/// Runs one session to completion and returns its result.
///
/// The loop exits on an explicit [`UserAction::EndSession`], or when either
/// channel closes (a vanished driver or SDK ends the session implicitly).
/// After the loop no further capture commands are issued; SDK teardown is
/// attempted best-effort and its failure swallowed, and the backend's end
/// call enriches the result with a score when it succeeds.
pub async fn run_session(
    session_config: SessionConfig,
    avatar_config: AvatarConfig,
    avatar: Arc<dyn AvatarClient>,
    backend: Arc<dyn SessionBackend>,
    mut events: mpsc::Receiver<AvatarEvent>,
    mut actions: mpsc::Receiver<UserAction>,
) -> Result<SessionResult> {
    let mut controller = SessionController::new(session_config);
    controller
        .initialize(&avatar_config)
        .context("Failed to initialize the speaking session")?;

    let started = backend
        .start_session(&StartSessionRequest::from_config(controller.config()))
        .await
        .context("Failed to start the backend session")?;
    info!(backend_session = %started.session_id, "Backend session started");

    // Seed the avatar with the conversation prompt; this is setup, not a
    // learner turn, so it bypasses the controller.
    if let Err(e) = avatar.send_text(&started.system_prompt).await {
        controller.handle_event(AvatarEvent::Error(e.to_string()));
    }

    loop {
        tokio::select! {
            // Drain SDK events before the next user action so an exchange's
            // transcript lands in the log before the following capture
            // command can interleave with it.
            biased;
            event = events.recv() => {
                let Some(event) = event else {
                    info!("Avatar event stream closed; ending session");
                    break;
                };
                let committed = controller.handle_event(event);
                persist_turn(&backend, &started.session_id, committed.as_ref()).await;
            },
            action = actions.recv() => {
                let Some(action) = action else {
                    info!("Action channel closed; ending session");
                    break;
                };
                match action {
                    UserAction::StartCapture => match controller.start_capture() {
                        Ok(Command::StartCapture) => {
                            if let Err(e) = avatar.start_capture().await {
                                controller.handle_event(AvatarEvent::Error(e.to_string()));
                            }
                        }
                        Ok(command) => debug!(?command, "Unexpected command for capture start"),
                        Err(e) => debug!(error = %e, "Capture start rejected"),
                    },
                    UserAction::StopCapture => match controller.stop_capture() {
                        Ok((Command::StopCapture, committed)) => {
                            if let Err(e) = avatar.stop_capture().await {
                                controller.handle_event(AvatarEvent::Error(e.to_string()));
                            }
                            persist_turn(&backend, &started.session_id, committed.as_ref()).await;
                        }
                        Ok((command, _)) => debug!(?command, "Unexpected command for capture stop"),
                        Err(e) => debug!(error = %e, "Capture stop rejected"),
                    },
                    UserAction::SubmitText(text) => match controller.submit_text(&text) {
                        Ok((Command::SendText(text), committed)) => {
                            if let Err(e) = avatar.send_text(&text).await {
                                controller.handle_event(AvatarEvent::Error(e.to_string()));
                            }
                            persist_turn(&backend, &started.session_id, committed.as_ref()).await;
                        }
                        Ok((command, _)) => debug!(?command, "Unexpected command for text send"),
                        Err(e) => debug!(error = %e, "Text submission rejected"),
                    },
                    UserAction::EndSession => break,
                }
            },
        }
    }

    let (result, _teardown) = controller
        .end_session()
        .context("Failed to assemble the session result")?;

    // The session is conceptually over; a teardown failure is not news the
    // user can act on.
    if let Err(e) = avatar.teardown().await {
        debug!(error = %e, "Avatar teardown failed");
    }

    let result = match backend.end_session(&started.session_id).await {
        Ok(outcome) => result.with_outcome(Some(outcome.score), None),
        Err(e) => {
            warn!(error = %e, "Backend end call failed; returning unscored result");
            result
        }
    };
    Ok(result)
}

/// Persists one committed turn, logging and swallowing failures. Awaited
/// sequentially so the loop never holds concurrent in-flight requests.
async fn persist_turn(
    backend: &Arc<dyn SessionBackend>,
    session_id: &str,
    committed: Option<&Turn>,
) {
    let Some(turn) = committed else {
        return;
    };
    if let Err(e) = backend.record_turn(session_id, &TurnRecord::from(turn)).await {
        warn!(error = %e, turn_id = %turn.id, "Failed to persist turn");
    }
}
