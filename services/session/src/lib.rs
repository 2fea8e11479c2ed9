//! Speaking-Practice Session Runtime
//!
//! This library wires the core session engine to its collaborators: it loads
//! environment configuration, owns the single event loop that drives a
//! session, and persists committed turns to the backend. The `session`
//! binary is a thin wrapper around this library.

pub mod config;
pub mod runner;
