//! Error types for sessions, mirrors, backends and configuration.
//!
//! Each concern has its own enum so callers can tell recoverable failures
//! (mirror writes, summarization passes, memory recording) from fatal ones
//! (configuration, generation). [`MimicError`] is the top-level error returned
//! by the [`PersonaAgent`](crate::agent::instance::PersonaAgent).

use std::path::PathBuf;
use thiserror::Error;

/// Session setup errors. Always fatal: the session does not start.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{} not found", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("'{0}' is missing in the configuration")]
    MissingField(&'static str),

    #[error("preset '{0}' not found")]
    UnknownPreset(String),

    #[error("invalid user profile: {0}")]
    InvalidProfile(String),
}

/// Durable mirror failures. Recoverable: the in-memory store stays authoritative.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// The backing record was never created (or has been removed).
    #[error("chat log {} not initialized", .0.display())]
    NotInitialized(PathBuf),

    #[error("chat log I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("chat log {} is not valid JSON: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize chat log: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Failures reported by an inference backend (generation, summarization,
/// memory analyzers).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("malformed backend output: {0}")]
    Malformed(String),
}

/// A summarization pass failed as a whole. The cursor was not advanced.
#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("summarization backend failed for window {start}..{end}: {source}")]
    Backend {
        start: usize,
        end: usize,
        #[source]
        source: BackendError,
    },
}

/// Memory pipeline failures. Logged by the agent; never fail a turn.
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("memory file I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("memory file {} is not valid JSON: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level error for agent operations.
#[derive(Error, Debug)]
pub enum MimicError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The chat log could not be created at session start.
    #[error("failed to initialize chat log: {0}")]
    ChatLog(#[source] MirrorError),

    #[error("generation failed: {0}")]
    Generation(#[source] BackendError),

    #[error("a session is already active")]
    SessionActive,

    #[error("no active session")]
    NoSession,

    #[error("HTTP client error: {0}")]
    Client(String),
}
