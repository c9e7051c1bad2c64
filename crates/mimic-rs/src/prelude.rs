//! Convenience re-exports for common `mimic-rs` types.
//!
//! ```ignore
//! use mimic_rs::prelude::*;
//! ```
//!
//! Pulls in the agent, its builder and configuration, the backend traits,
//! event handlers and the chat session types. Memory analyzers and the
//! mirror internals are left out; import those from their modules.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{Message, MessageRole, OpenRouterClient};

// ── Errors ──────────────────────────────────────────────────────────
pub use crate::error::{BackendError, ConfigError, MimicError, SummarizeError};

// ── Agent ───────────────────────────────────────────────────────────
pub use crate::agent::{
    AgentConfig, ChatEvent, ChatGenerator, CompositeEventHandler, EventHandler, FnEventHandler,
    GenerationParams, LoggingHandler, NoopHandler, PersonaAgent, Race, Sex, SummaryBackend,
    UserProfile,
};

// ── Chat sessions ───────────────────────────────────────────────────
pub use crate::chat::{ChatSession, PassOutcome, SummarizationPolicy};

// ── Memory ──────────────────────────────────────────────────────────
pub use crate::memory::LlmAnalyzers;
