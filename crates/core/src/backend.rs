//! Client for the collaborator-owned backend session API.
//!
//! The backend owns scoring and long-term persistence; this client only
//! mirrors its three JSON endpoints. Failures surface to the caller as
//! [`SessionError`]s with no retry or backoff.

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::turn::{Speaker, Turn};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Body of `POST /api/speaking/session/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub student_name: Option<String>,
    pub current_level: String,
    pub target_band: Option<f32>,
    pub topic: String,
    pub num_questions: u32,
    pub student_info: Option<String>,
}

impl StartSessionRequest {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            student_name: config.student_name.clone(),
            current_level: config.level.clone(),
            target_band: config.target_band,
            topic: config.primary_topic().to_string(),
            num_questions: config.num_questions,
            student_info: config.student_info.clone(),
        }
    }
}

/// Response of `POST /api/speaking/session/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    pub session_id: String,
    /// The conversation prompt the avatar is seeded with.
    pub system_prompt: String,
}

/// Body of `POST /api/speaking/session/{id}/turn`. The backend tags the
/// coach as `"npc"`, which [`Speaker`] serializes to directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub who: Speaker,
    pub text: String,
    pub ts: DateTime<Utc>,
}

impl From<&Turn> for TurnRecord {
    fn from(turn: &Turn) -> Self {
        Self {
            who: turn.speaker,
            text: turn.text.clone(),
            ts: turn.timestamp,
        }
    }
}

/// Response of `POST /api/speaking/session/{id}/end`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndSessionResponse {
    pub score: f32,
    #[serde(default)]
    pub turns: Vec<TurnRecord>,
}

/// The three operations the backend session API offers.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn start_session(
        &self,
        request: &StartSessionRequest,
    ) -> Result<StartSessionResponse, SessionError>;

    async fn record_turn(&self, session_id: &str, turn: &TurnRecord)
    -> Result<(), SessionError>;

    async fn end_session(&self, session_id: &str) -> Result<EndSessionResponse, SessionError>;
}

/// [`SessionBackend`] over HTTP/JSON via `reqwest`.
pub struct HttpSessionBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSessionBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn check_status(response: &reqwest::Response) -> Result<(), SessionError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SessionError::BackendStatus(status.as_u16()))
        }
    }
}

#[async_trait]
impl SessionBackend for HttpSessionBackend {
    async fn start_session(
        &self,
        request: &StartSessionRequest,
    ) -> Result<StartSessionResponse, SessionError> {
        let response = self
            .client
            .post(self.url("/api/speaking/session/start"))
            .json(request)
            .send()
            .await?;
        Self::check_status(&response)?;
        Ok(response.json().await?)
    }

    async fn record_turn(
        &self,
        session_id: &str,
        turn: &TurnRecord,
    ) -> Result<(), SessionError> {
        let response = self
            .client
            .post(self.url(&format!("/api/speaking/session/{session_id}/turn")))
            .json(turn)
            .send()
            .await?;
        Self::check_status(&response)
    }

    async fn end_session(&self, session_id: &str) -> Result<EndSessionResponse, SessionError> {
        let response = self
            .client
            .post(self.url(&format!("/api/speaking/session/{session_id}/end")))
            .send()
            .await?;
        Self::check_status(&response)?;
        Ok(response.json().await?)
    }
}

/// An in-memory [`SessionBackend`] for tests and the offline demo. Records
/// everything it is sent and answers `end` with a canned score.
pub struct RecordingSessionBackend {
    score: f32,
    starts: Mutex<Vec<StartSessionRequest>>,
    turns: Mutex<Vec<TurnRecord>>,
}

impl RecordingSessionBackend {
    pub fn new(score: f32) -> Self {
        Self {
            score,
            starts: Mutex::new(Vec::new()),
            turns: Mutex::new(Vec::new()),
        }
    }

    pub fn start_requests(&self) -> Vec<StartSessionRequest> {
        self.starts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn recorded_turns(&self) -> Vec<TurnRecord> {
        self.turns.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl SessionBackend for RecordingSessionBackend {
    async fn start_session(
        &self,
        request: &StartSessionRequest,
    ) -> Result<StartSessionResponse, SessionError> {
        self.starts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());
        Ok(StartSessionResponse {
            session_id: "recorded-session".to_string(),
            system_prompt: format!(
                "You are an examiner interviewing a {} learner about {}.",
                request.current_level, request.topic
            ),
        })
    }

    async fn record_turn(
        &self,
        _session_id: &str,
        turn: &TurnRecord,
    ) -> Result<(), SessionError> {
        self.turns
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(turn.clone());
        Ok(())
    }

    async fn end_session(&self, _session_id: &str) -> Result<EndSessionResponse, SessionError> {
        Ok(EndSessionResponse {
            score: self.score,
            turns: self.recorded_turns(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_request_wire_format_is_camel_case() {
        let config = SessionConfig {
            student_name: Some("Ana".to_string()),
            target_band: Some(6.5),
            student_info: Some("Prefers science topics".to_string()),
            ..SessionConfig::new("B2", 3, vec!["Work".to_string()])
        };
        let request = StartSessionRequest::from_config(&config);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["studentName"], "Ana");
        assert_eq!(json["currentLevel"], "B2");
        assert_eq!(json["targetBand"], 6.5);
        assert_eq!(json["topic"], "Work");
        assert_eq!(json["numQuestions"], 3);
        assert_eq!(json["studentInfo"], "Prefers science topics");
    }

    #[test]
    fn test_turn_record_tags_coach_as_npc() {
        let record = TurnRecord {
            who: Speaker::Coach,
            text: "What is your favourite book?".to_string(),
            ts: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["who"], "npc");

        let user = TurnRecord {
            who: Speaker::User,
            text: "A novel.".to_string(),
            ts: Utc::now(),
        };
        assert_eq!(serde_json::to_value(&user).unwrap()["who"], "user");
    }

    #[test]
    fn test_end_response_turns_default_to_empty() {
        let response: EndSessionResponse = serde_json::from_str(r#"{"score": 6.0}"#).unwrap();
        assert_eq!(response.score, 6.0);
        assert!(response.turns.is_empty());
    }

    #[test]
    fn test_http_backend_url_building() {
        let backend = HttpSessionBackend::new("http://localhost:8080/");
        assert_eq!(
            backend.url("/api/speaking/session/start"),
            "http://localhost:8080/api/speaking/session/start"
        );
    }

    #[tokio::test]
    async fn test_recording_backend_round_trip() {
        let backend = RecordingSessionBackend::new(7.5);
        let request = StartSessionRequest::from_config(&SessionConfig::new("B1", 2, vec![]));

        let started = backend.start_session(&request).await.unwrap();
        assert_eq!(started.session_id, "recorded-session");
        assert!(started.system_prompt.contains("B1"));

        let record = TurnRecord {
            who: Speaker::User,
            text: "Hello.".to_string(),
            ts: Utc::now(),
        };
        backend.record_turn(&started.session_id, &record).await.unwrap();

        let ended = backend.end_session(&started.session_id).await.unwrap();
        assert_eq!(ended.score, 7.5);
        assert_eq!(ended.turns.len(), 1);
        assert_eq!(ended.turns[0].text, "Hello.");
    }
}
