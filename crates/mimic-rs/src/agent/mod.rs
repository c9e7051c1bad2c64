//! Agent runtime: the [`PersonaAgent`] session controller and its seams.
//!
//! - [`instance::PersonaAgent`]: starts sessions and runs generation turns.
//!   Start here.
//! - [`config`]: [`AgentConfig`] and generation presets loaded from JSON.
//! - [`persona`]: persona flattening, [`UserProfile`] and the preamble texts.
//! - [`backend`]: [`ChatGenerator`] and [`SummaryBackend`] traits, with
//!   OpenRouter implementations.
//! - [`events`]: [`EventHandler`] trait and [`ChatEvent`] enum for observing
//!   sessions. Includes [`LoggingHandler`], [`CompositeEventHandler`] and
//!   [`FnEventHandler`].

pub mod backend;
pub mod config;
pub mod events;
pub mod instance;
pub mod persona;

pub use backend::{BackendFuture, ChatGenerator, GenerationParams, SummaryBackend, SummaryInput};
pub use config::{AgentConfig, GenerationPreset, load_preset};
pub use events::{
    ChatEvent, CompositeEventHandler, EventHandler, FnEventHandler, LoggingHandler, MemoryKind,
    NoopHandler,
};
pub use instance::{PersonaAgent, PersonaAgentBuilder};
pub use persona::{Race, Sex, UserProfile};
