//! Events and handlers for chat sessions and the persona agent.
//!
//! Components never log through a global logger. Each one receives an
//! [`EventHandler`] at construction and reports what it did as a
//! [`ChatEvent`]. Callers decide what to do with those events: log them,
//! count them in tests, or drop them.
//!
//! # Choosing an event handler
//!
//! | Handler | Use case |
//! |---------|----------|
//! | [`NoopHandler`] | Tests or fire-and-forget runs |
//! | [`LoggingHandler`] | Structured logging via `tracing` |
//! | [`FnEventHandler`] | Quick closures for simple callbacks |
//! | [`CompositeEventHandler`] | Compose multiple handlers in order |

use crate::MessageRole;
use crate::error::{MemoryError, MirrorError, SummarizeError};
use std::ops::Range;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

// ── Events ─────────────────────────────────────────────────────────

/// Memory stage that produced a [`ChatEvent::MemoryRecorded`] event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryKind {
    Entity,
    Sentiment,
    Classification,
}

impl std::fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryKind::Entity => write!(f, "entity"),
            MemoryKind::Sentiment => write!(f, "sentiment"),
            MemoryKind::Classification => write!(f, "classification"),
        }
    }
}

/// Events emitted by sessions, the summarization pipeline, the memory
/// recorder and the agent.
#[derive(Debug)]
pub enum ChatEvent<'a> {
    /// A chat session was created with its durable log at `log_path`.
    SessionStarted { chat_id: &'a str, log_path: &'a Path },
    /// A message was appended at `index`.
    MessageAppended { index: usize, role: MessageRole },
    /// The content at `index` was replaced by a summary.
    MessageReplaced { index: usize },
    /// The durable mirror rejected a write. In-memory state is unaffected.
    MirrorWriteFailed {
        index: usize,
        error: &'a MirrorError,
    },
    /// A summarization pass is scanning `window`.
    SummarizationStarted { window: Range<usize> },
    /// A pass found a window but no message long enough to compress.
    NoCandidates { window: Range<usize> },
    /// The backend is about to be called with `count` entries.
    SummarizerBatch { count: usize },
    /// The backend returned no summary for the message at `index`.
    SummaryItemSkipped { index: usize },
    /// A pass finished and the cursor moved to `cursor`.
    SummarizationCompleted {
        summarized: usize,
        cursor: usize,
        elapsed: Duration,
    },
    /// A pass failed as a whole; the cursor did not move.
    SummarizationFailed { error: &'a SummarizeError },
    /// A generation request is about to be sent.
    GenerationStarted { messages: usize },
    /// A reply was generated and trimmed to `chars` characters.
    GenerationCompleted { chars: usize, elapsed: Duration },
    /// A memory stage stored `count` new records.
    MemoryRecorded { kind: MemoryKind, count: usize },
    /// The classifier picked a non-personal label; nothing was stored.
    ClassificationIgnored { label: &'a str },
    /// A memory stage failed. The turn proceeds.
    MemoryFailed { error: &'a MemoryError },
    /// All memory stages ran for one message.
    MemoryChecked { elapsed: Duration },
    /// The agent session is ready for the first prompt.
    AgentReady { elapsed: Duration },
}

/// Handler for chat events.
///
/// Implement this trait to react to session events: logging, metrics, UI
/// updates, or assertions in tests. The default implementation ignores
/// every event.
///
/// # Example
///
/// ```ignore
/// struct CountPasses(AtomicUsize);
///
/// impl EventHandler for CountPasses {
///     fn on_event(&self, event: &ChatEvent<'_>) {
///         if let ChatEvent::SummarizationCompleted { .. } = event {
///             self.0.fetch_add(1, Ordering::Relaxed);
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    /// Called for each event.
    fn on_event(&self, event: &ChatEvent<'_>) {
        let _ = event;
    }
}

/// A no-op event handler.
pub struct NoopHandler;
impl EventHandler for NoopHandler {}

/// An event handler backed by a closure.
///
/// ```ignore
/// let handler = FnEventHandler::new(|event| {
///     if let ChatEvent::MessageAppended { index, .. } = event {
///         println!("appended #{index}");
///     }
/// });
/// ```
pub struct FnEventHandler<F>(F)
where
    F: Fn(&ChatEvent<'_>) + Send + Sync;

impl<F> FnEventHandler<F>
where
    F: Fn(&ChatEvent<'_>) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> EventHandler for FnEventHandler<F>
where
    F: Fn(&ChatEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &ChatEvent<'_>) {
        (self.0)(event)
    }
}

/// An event handler that delegates to multiple inner handlers, in
/// registration order.
///
/// ```ignore
/// let handler = CompositeEventHandler::new()
///     .with(LoggingHandler)
///     .with(my_metrics_handler);
/// ```
pub struct CompositeEventHandler {
    handlers: Vec<Box<dyn EventHandler>>,
}

impl CompositeEventHandler {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Add a handler to the chain.
    pub fn with(mut self, handler: impl EventHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Conditionally add a handler to the chain.
    pub fn with_if(self, condition: bool, handler: impl EventHandler + 'static) -> Self {
        if condition { self.with(handler) } else { self }
    }
}

impl Default for CompositeEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler for CompositeEventHandler {
    fn on_event(&self, event: &ChatEvent<'_>) {
        for handler in &self.handlers {
            handler.on_event(event);
        }
    }
}

/// An event handler that logs events via `tracing`.
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn on_event(&self, event: &ChatEvent<'_>) {
        match event {
            ChatEvent::SessionStarted { chat_id, log_path } => {
                info!(
                    "Chat {chat_id} initialized. Chat data saved to {}",
                    log_path.display()
                );
            }
            ChatEvent::MessageAppended { index, role } => {
                debug!("Appended {role} message #{index}");
            }
            ChatEvent::MessageReplaced { index } => {
                debug!("Replaced message #{index} with its summary");
            }
            ChatEvent::MirrorWriteFailed { index, error } => {
                warn!("Chat log write for message #{index} failed: {error}");
            }
            ChatEvent::SummarizationStarted { window } => {
                info!("Processing from {} to {}.", window.start, window.end);
            }
            ChatEvent::NoCandidates { window } => {
                debug!(
                    "No message in {}..{} is long enough to summarize",
                    window.start, window.end
                );
            }
            ChatEvent::SummarizerBatch { count } => {
                info!("Batching data for summary: {count} entries.");
            }
            ChatEvent::SummaryItemSkipped { index } => {
                warn!("No summary returned for message #{index}; keeping original");
            }
            ChatEvent::SummarizationCompleted {
                summarized,
                cursor,
                elapsed,
            } => {
                info!(
                    "Summarized {summarized} message(s) in {:.1}s, cursor now {cursor}",
                    elapsed.as_secs_f64()
                );
            }
            ChatEvent::SummarizationFailed { error } => {
                warn!("Summarization failed: {error}. Continuing with full history.");
            }
            ChatEvent::GenerationStarted { messages } => {
                info!("Submitting prompt for generation ({messages} messages).");
            }
            ChatEvent::GenerationCompleted { chars, elapsed } => {
                info!(
                    "Prompt response generated ({chars} chars), total time: {:.1}s.",
                    elapsed.as_secs_f64()
                );
            }
            ChatEvent::MemoryRecorded { kind, count } => {
                debug!("Recorded {count} {kind} memory record(s)");
            }
            ChatEvent::ClassificationIgnored { label } => {
                info!("Ignored classification: {label}");
            }
            ChatEvent::MemoryFailed { error } => {
                warn!("Memory recording failed: {error}");
            }
            ChatEvent::MemoryChecked { elapsed } => {
                info!(
                    "Memory processes finished in {:.1}s.",
                    elapsed.as_secs_f64()
                );
            }
            ChatEvent::AgentReady { elapsed } => {
                info!(
                    "Chat logs, initial messages, and session active, total time: {:.1}s.",
                    elapsed.as_secs_f64()
                );
            }
        }
    }
}
