//! Main Entrypoint for the Scripted Session Demo
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Building a scripted avatar client and a backend (HTTP when
//!    `BACKEND_URL` is set, the in-memory recorder otherwise).
//! 4. Driving one full practice session through the runner and printing the
//!    resulting transcript and score as JSON.

use anyhow::Context;
use clap::Parser;
use speakprep_core::AvatarEvent;
use speakprep_core::SessionConfig;
use speakprep_core::avatar::{AvatarClient, ScriptedAvatarClient};
use speakprep_core::backend::{HttpSessionBackend, RecordingSessionBackend, SessionBackend};
use speakprep_session::config::Config;
use speakprep_session::runner::{UserAction, run_session};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "session", about = "Run one scripted speaking-practice session")]
struct Cli {
    /// The learner's current proficiency level.
    #[arg(long, default_value = "B2")]
    level: String,

    /// How many questions the coach should ask.
    #[arg(long, default_value_t = 3)]
    questions: u32,

    /// Topic to draw questions from; may be repeated.
    #[arg(long)]
    topic: Vec<String>,

    #[arg(long)]
    student_name: Option<String>,

    /// The exam band the learner is working towards.
    #[arg(long)]
    target_band: Option<f32>,
}

/// The canned conversation: the prompt seed plays the opening question, and
/// every capture stop plays the learner's transcribed answer plus the next
/// question, until the final answer closes the script.
fn demo_script(questions: u32) -> Vec<Vec<AvatarEvent>> {
    let mut script = Vec::new();
    for n in 0..=questions {
        let mut exchange = Vec::new();
        if n > 0 {
            exchange.push(AvatarEvent::user_partial("Well, "));
            exchange.push(AvatarEvent::user_final(format!(
                "that would be my answer number {n}."
            )));
        }
        if n < questions {
            exchange.push(AvatarEvent::AudioStarted);
            exchange.push(AvatarEvent::coach_partial("Let me ask you this: "));
            exchange.push(AvatarEvent::coach_final(format!(
                "could you expand on point {}?",
                n + 1
            )));
            exchange.push(AvatarEvent::AudioStopped);
        }
        script.push(exchange);
    }
    script
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();

    let session_config = SessionConfig {
        student_name: cli.student_name,
        target_band: cli.target_band,
        ..SessionConfig::new(cli.level, cli.questions, cli.topic)
    };

    let backend: Arc<dyn SessionBackend> = match &config.backend_url {
        Some(url) => {
            info!(%url, "Using the HTTP backend");
            Arc::new(HttpSessionBackend::new(url.clone()))
        }
        None => {
            info!("BACKEND_URL not set; using the in-memory recording backend");
            Arc::new(RecordingSessionBackend::new(6.5))
        }
    };

    let (avatar, events) = ScriptedAvatarClient::new(demo_script(cli.questions));
    let avatar: Arc<dyn AvatarClient> = Arc::new(avatar);

    // Drive the session the way a UI would: one capture round per question,
    // then an explicit end.
    let (actions_tx, actions_rx) = mpsc::channel(32);
    let questions = cli.questions;
    tokio::spawn(async move {
        for _ in 0..questions {
            if actions_tx.send(UserAction::StartCapture).await.is_err() {
                return;
            }
            if actions_tx.send(UserAction::StopCapture).await.is_err() {
                return;
            }
        }
        let _ = actions_tx.send(UserAction::EndSession).await;
    });

    let result = run_session(
        session_config,
        config.avatar_config(),
        avatar,
        backend,
        events,
        actions_rx,
    )
    .await?;

    info!(
        session_id = %result.id,
        turns = result.turns.len(),
        questions = result.total_questions,
        score = ?result.score,
        "Session complete"
    );
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
