//! Error taxonomy for the session engine.
//!
//! Three failure classes exist: configuration errors (missing credentials,
//! fatal to the session), transport errors (backend HTTP calls, surfaced to
//! the caller with no retry), and SDK runtime errors (which move the
//! controller into its error state). There is no graceful degradation; a
//! failed session is abandoned and restarted.

/// Errors produced by the session controller and the collaborator clients.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A required external credential was absent at initialization.
    #[error("missing credential: {0} is required to start a speaking session")]
    MissingCredential(&'static str),

    /// Capture could not be started or stopped in the current state.
    #[error("capture unavailable: {0}")]
    CaptureUnavailable(String),

    /// The avatar SDK reported a runtime failure.
    #[error("avatar SDK failure: {0}")]
    Sdk(String),

    /// A backend HTTP call failed.
    #[error("backend request failed")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend rejected the request with status {0}")]
    BackendStatus(u16),

    /// The session has already been ended; the operation was refused.
    #[error("session already ended")]
    Ended,
}
