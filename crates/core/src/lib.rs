//! Core logic for the speaking-practice session engine.
//!
//! This crate owns the domain model of a practice session: the append-only
//! turn log, the transcript aggregator that folds streaming speech fragments
//! into committed turns, the session controller state machine, and the trait
//! seams for the two external collaborators (the avatar/speech SDK and the
//! backend session API). It performs no I/O of its own beyond the HTTP
//! backend client; everything else is driven by events injected by a runtime.

pub mod aggregator;
pub mod avatar;
pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod progress;
pub mod turn;

pub use config::{SessionConfig, SessionResult};
pub use controller::{Command, SessionController, SessionState};
pub use error::SessionError;
pub use event::AvatarEvent;
pub use turn::{Speaker, Turn, TurnLog};
