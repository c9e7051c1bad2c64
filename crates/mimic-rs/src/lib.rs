//! Persona-driven chat agent with rolling conversation summarization.
//!
//! `mimic-rs` wraps a language-model backend with chat-session bookkeeping:
//! every message is appended to an ordered, durably mirrored log, and once
//! enough unsummarized volume has accumulated, older long messages are
//! compressed in place by a summarization model. The most recent exchanges are
//! always left verbatim. A lightweight memory pipeline (entities, sentiment,
//! personal-moment classification) runs alongside each turn.
//!
//! The core abstraction is the [`ChatSession`](chat::session::ChatSession), which
//! owns the message store and the summarization cursor. The
//! [`PersonaAgent`](agent::instance::PersonaAgent) drives one session at a
//! time around each generation turn.
//!
//! # Getting started
//!
//! ```ignore
//! use mimic_rs::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), MimicError> {
//!     let config = AgentConfig::load("configs/config.json")?;
//!     let key = std::env::var("OPENROUTER_KEY").unwrap_or_default();
//!     let client = Arc::new(
//!         OpenRouterClient::new(key)
//!             .map_err(MimicError::Client)?
//!             .with_model(config.model.clone())
//!             .with_summary_model(config.summary_model()),
//!     );
//!
//!     let mut agent = PersonaAgent::builder(config, "configs", "persona", "chat_logs")
//!         .generator(client.clone())
//!         .summarizer(client.clone())
//!         .analyzers(Arc::new(LlmAnalyzers::new(client)))
//!         .event_handler(Arc::new(LoggingHandler))
//!         .build()?;
//!
//!     let profile = UserProfile::new("John Doe", "1970-01-01", Sex::Male, Race::Caucasian);
//!     agent.start(profile, "default").await?;
//!     let reply = agent.generate_response("Who was the 10th president?").await?;
//!     println!("{reply}");
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`chat`] | Message store, durable mirror, window selector, batch pipeline, splice, session |
//! | [`agent`] | Session controller, configuration, persona/user profile, events, backends |
//! | [`memory`] | Entity, sentiment and classification memory recorder |
//! | [`text`] | Sentence splitting and trailing-sentence trimming |
//! | [`weather`] | Current-weather lookup for the user info message |

pub mod agent;
pub mod chat;
pub mod error;
pub mod memory;
pub mod prelude;
pub mod text;
pub mod weather;

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

pub use error::{BackendError, ConfigError, MemoryError, MimicError, MirrorError, SummarizeError};

// ── Constants ──────────────────────────────────────────────────────

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model for generation and summarization calls.
pub const DEFAULT_MODEL: &str = "meta-llama/llama-3.2-3b-instruct";

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

// ── Request types ──────────────────────────────────────────────────

/// Chat completion request body. Unused optional fields are omitted from
/// serialization.
#[derive(Serialize, Debug, Default)]
pub struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    pub messages: Vec<Message>,

    // Generation parameters
    #[serde(skip_serializing_if = "is_zero_u32")]
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "is_zero_f32")]
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f32>,

    // Output format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}
fn is_zero_f32(v: &f32) -> bool {
    *v == 0.0
}

/// JSON output format type.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub enum ResponseFormatType {
    #[serde(rename = "json_object")]
    JsonObject,
}

/// JSON output mode.
#[derive(Serialize, Debug)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub fmt_type: ResponseFormatType,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            fmt_type: ResponseFormatType::JsonObject,
        }
    }
}

// ── Response types ─────────────────────────────────────────────────

/// Raw API response (internal deserialization target).
#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Clean return type from `OpenRouterClient::chat()`.
#[derive(Debug)]
pub struct ChatCompletion {
    pub content: Option<String>,
    pub usage: Option<UsageInfo>,
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Deserialize, Debug, Clone)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for the OpenRouter chat completions API.
///
/// Implements [`ChatGenerator`](agent::backend::ChatGenerator),
/// [`SummaryBackend`](agent::backend::SummaryBackend) and the memory
/// analyzers, so a single client can serve every backend seam.
pub struct OpenRouterClient {
    pub(crate) client: reqwest::Client,
    pub(crate) api_key: String,
    pub(crate) model: String,
    pub(crate) summary_model: Option<String>,
}

impl OpenRouterClient {
    /// Create a new client with the given API key and the default model.
    pub fn new(api_key: impl Into<String>) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent("mimic-rs/0.1")
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            summary_model: None,
        })
    }

    /// Use `model` for generation (and for summarization unless overridden).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Use a separate (usually cheaper) model for summarization calls.
    pub fn with_summary_model(mut self, model: impl Into<String>) -> Self {
        self.summary_model = Some(model.into());
        self
    }

    /// The model used for generation.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The model used for summarization.
    pub fn summary_model(&self) -> &str {
        self.summary_model.as_deref().unwrap_or(&self.model)
    }

    /// Send a chat completion request.
    pub async fn chat(&self, body: &ChatRequest) -> Result<ChatCompletion, String> {
        let model_label = body.model.as_deref().unwrap_or("(none)");
        debug!(
            "LLM request: model={}, messages={}, max_tokens={}, temp={}",
            model_label,
            body.messages.len(),
            body.max_tokens,
            body.temperature,
        );
        trace!(
            "Request payload size: {} bytes",
            serde_json::to_string(body).map_or(0, |s| s.len())
        );

        let start = Instant::now();

        let resp = self
            .client
            .post(OPENROUTER_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| format!("failed to read response: {e}"))?;

        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(format!("OpenRouter API HTTP {status}: {text}"));
        }

        let parsed: RawChatResponse =
            serde_json::from_str(&text).map_err(|e| format!("failed to parse response: {e}"))?;

        if let Some(err) = parsed.error {
            return Err(format!("OpenRouter API error: {}", err.message));
        }

        if let Some(ref usage) = parsed.usage {
            debug!(
                "Token usage: prompt={}, completion={}, total={}",
                usage.prompt_tokens.unwrap_or(0),
                usage.completion_tokens.unwrap_or(0),
                usage.total_tokens.unwrap_or(0),
            );
        }

        match parsed.choices.and_then(|c| c.into_iter().next()) {
            Some(c) => Ok(ChatCompletion {
                content: c.message.content,
                usage: parsed.usage,
                finish_reason: c.finish_reason,
            }),
            None => {
                debug!("LLM output: empty (no choices)");
                Ok(ChatCompletion {
                    content: None,
                    usage: parsed.usage,
                    finish_reason: None,
                })
            }
        }
    }

    /// One-shot completion with a system and a user message.
    ///
    /// Returns `Err` when the call fails or the model returns no content.
    pub(crate) async fn complete(
        &self,
        model: &str,
        system: &str,
        user: &str,
        max_tokens: u32,
        json: bool,
    ) -> Result<String, String> {
        let body = ChatRequest {
            model: Some(model.to_string()),
            messages: vec![Message::system(system), Message::user(user)],
            max_tokens,
            temperature: 0.3,
            response_format: json.then(ResponseFormat::json_object),
            ..Default::default()
        };
        self.chat(&body)
            .await?
            .content
            .ok_or_else(|| "Empty LLM response".to_string())
    }
}
