//! Inference backend seams: text generation and batch summarization.
//!
//! Both traits return a boxed [`BackendFuture`] so implementations can be
//! stored as `Arc<dyn …>` trait objects. Callers always await them in order;
//! nothing in the crate runs two backend calls for one session concurrently.

use crate::error::BackendError;
use crate::{ChatRequest, Message, OpenRouterClient};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use tracing::debug;

/// Boxed future returned by backend trait methods.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BackendError>> + Send + 'a>>;

// ── Generation ─────────────────────────────────────────────────────

/// Sampling parameters for one generation call.
///
/// Zero values mean "backend default" for the optional knobs
/// (`top_p`, `top_k`, `repetition_penalty`, `length_penalty`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub repetition_penalty: f32,
    pub num_beams: u32,
    pub length_penalty: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 0,
            temperature: 0.0,
            top_p: 0.0,
            top_k: 0,
            repetition_penalty: 0.0,
            num_beams: 1,
            length_penalty: 0.0,
        }
    }
}

/// Produces the next assistant message for a conversation.
pub trait ChatGenerator: Send + Sync {
    /// Generate one reply for the full ordered `messages`.
    fn generate<'a>(
        &'a self,
        messages: &'a [Message],
        params: &'a GenerationParams,
    ) -> BackendFuture<'a, String>;
}

// ── Summarization ──────────────────────────────────────────────────

/// One entry of a summarization batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryInput {
    pub text: String,
    /// Minimum summary length, in token-equivalent units.
    pub min_length: usize,
    /// Maximum summary length, in token-equivalent units.
    pub max_length: usize,
}

/// Summarizes a batch of texts.
///
/// The returned vector must be order-correlated with `inputs` and the same
/// length. `None` marks a per-entry failure; the caller keeps that message
/// unsummarized. Returning `Err` fails the whole batch.
pub trait SummaryBackend: Send + Sync {
    fn summarize_batch<'a>(
        &'a self,
        inputs: &'a [SummaryInput],
    ) -> BackendFuture<'a, Vec<Option<String>>>;
}

// ── OpenRouter implementations ─────────────────────────────────────

const SUMMARY_PROMPT: &str = "\
You compress chat messages. Summarize the message the user sends so it can \
replace the original in a conversation history.

Rules:
- Keep names, dates, numbers, places and stated feelings verbatim.
- Write in the same person and voice as the original message.
- Only include facts stated in the message. Do not add commentary.
- Output ONLY the summary text.";

fn non_zero_f32(v: f32) -> Option<f32> {
    (v != 0.0).then_some(v)
}

impl ChatGenerator for OpenRouterClient {
    fn generate<'a>(
        &'a self,
        messages: &'a [Message],
        params: &'a GenerationParams,
    ) -> BackendFuture<'a, String> {
        Box::pin(async move {
            if params.num_beams > 1 || params.length_penalty != 0.0 {
                debug!(
                    "num_beams={} and length_penalty={} are not supported by OpenRouter; ignored",
                    params.num_beams, params.length_penalty
                );
            }
            let request = ChatRequest {
                model: Some(self.model.clone()),
                messages: messages.to_vec(),
                max_tokens: params.max_tokens,
                temperature: params.temperature,
                top_p: non_zero_f32(params.top_p),
                top_k: (params.top_k > 0).then_some(params.top_k),
                repetition_penalty: non_zero_f32(params.repetition_penalty),
                ..Default::default()
            };
            let completion = self
                .chat(&request)
                .await
                .map_err(BackendError::Unavailable)?;
            completion
                .content
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| BackendError::Malformed("empty generation".into()))
        })
    }
}

impl SummaryBackend for OpenRouterClient {
    fn summarize_batch<'a>(
        &'a self,
        inputs: &'a [SummaryInput],
    ) -> BackendFuture<'a, Vec<Option<String>>> {
        Box::pin(async move {
            let model = self.summary_model();
            let mut summaries = Vec::with_capacity(inputs.len());
            let mut last_error = None;

            for input in inputs {
                let user = format!(
                    "Summarize in roughly {} to {} tokens:\n\n{}",
                    input.min_length, input.max_length, input.text
                );
                let max_tokens = u32::try_from(input.max_length.saturating_mul(2)).unwrap_or(u32::MAX);
                match self.complete(model, SUMMARY_PROMPT, &user, max_tokens, false).await {
                    Ok(summary) => summaries.push(Some(summary.trim().to_string())),
                    Err(e) => {
                        debug!("Summary entry failed: {e}");
                        last_error = Some(e);
                        summaries.push(None);
                    }
                }
            }

            // Every entry failed: treat the backend as unavailable.
            if !inputs.is_empty() && summaries.iter().all(Option::is_none) {
                return Err(BackendError::Unavailable(
                    last_error.unwrap_or_else(|| "no summaries returned".into()),
                ));
            }
            Ok(summaries)
        })
    }
}
