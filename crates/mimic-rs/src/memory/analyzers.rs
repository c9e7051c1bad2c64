//! Analyzer seams for the memory pipeline and their OpenRouter implementations.
//!
//! Analyzers are created per stage through an [`AnalyzerProvider`] and
//! dropped as soon as the stage finishes, so at most one is alive at a time.

use crate::agent::backend::BackendFuture;
use crate::error::BackendError;
use crate::OpenRouterClient;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::trace;

/// One raw span from an entity recognizer. Word pieces continuing the
/// previous span start with `##`.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EntitySpan {
    pub word: String,
    pub label: String,
}

/// One raw sentiment score. Labels are `LABEL_0` (negative), `LABEL_1`
/// (neutral) and `LABEL_2` (positive).
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct SentimentScore {
    pub label: String,
    pub score: f64,
}

pub trait EntityRecognizer: Send + Sync {
    fn recognize<'a>(&'a self, text: &'a str) -> BackendFuture<'a, Vec<EntitySpan>>;
}

pub trait SentimentAnalyzer: Send + Sync {
    /// Score each sentence. The result is order-correlated with `sentences`.
    fn score<'a>(&'a self, sentences: &'a [String]) -> BackendFuture<'a, Vec<SentimentScore>>;
}

pub trait TextClassifier: Send + Sync {
    /// Pick the single best label for `text` out of `labels`.
    fn classify<'a>(&'a self, text: &'a str, labels: &'a [&'a str]) -> BackendFuture<'a, String>;
}

/// Creates a fresh analyzer for each memory stage.
pub trait AnalyzerProvider: Send + Sync {
    fn entity_recognizer(&self) -> Box<dyn EntityRecognizer + '_>;
    fn sentiment_analyzer(&self) -> Box<dyn SentimentAnalyzer + '_>;
    fn text_classifier(&self) -> Box<dyn TextClassifier + '_>;
}

// ── OpenRouter implementations ─────────────────────────────────────

const ENTITY_PROMPT: &str = "\
You are a named-entity recognizer. Find people (PER), organizations (ORG), \
locations (LOC) and other proper names (MISC) in the user's text.

Respond with JSON only: {\"entities\": [{\"word\": \"...\", \"label\": \"PER\"}]}
Use the exact spelling from the text. Return an empty list when there are none.";

const SENTIMENT_PROMPT: &str = "\
You are a sentiment classifier. For each numbered sentence, output a label: \
LABEL_0 for negative, LABEL_1 for neutral, LABEL_2 for positive, and a \
confidence score between 0 and 1.

Respond with JSON only: {\"results\": [{\"label\": \"LABEL_2\", \"score\": 0.93}]}
Return exactly one result per sentence, in order.";

const CLASSIFY_PROMPT: &str = "\
You are a zero-shot text classifier. Choose the single label from the list \
that best describes the user's text.

Respond with JSON only: {\"label\": \"...\"}
The label must be copied exactly from the list.";

/// Analyzers backed by JSON-mode completions on the summary model.
pub struct LlmAnalyzers {
    client: Arc<OpenRouterClient>,
}

impl LlmAnalyzers {
    pub fn new(client: Arc<OpenRouterClient>) -> Self {
        Self { client }
    }
}

impl AnalyzerProvider for LlmAnalyzers {
    fn entity_recognizer(&self) -> Box<dyn EntityRecognizer + '_> {
        Box::new(LlmAnalyzer(self.client.as_ref()))
    }

    fn sentiment_analyzer(&self) -> Box<dyn SentimentAnalyzer + '_> {
        Box::new(LlmAnalyzer(self.client.as_ref()))
    }

    fn text_classifier(&self) -> Box<dyn TextClassifier + '_> {
        Box::new(LlmAnalyzer(self.client.as_ref()))
    }
}

struct LlmAnalyzer<'c>(&'c OpenRouterClient);

impl LlmAnalyzer<'_> {
    async fn ask<T: DeserializeOwned>(&self, system: &str, user: &str) -> Result<T, BackendError> {
        let client = self.0;
        let raw = client
            .complete(client.summary_model(), system, user, 1024, true)
            .await
            .map_err(BackendError::Unavailable)?;
        trace!("Analyzer output: {raw}");
        parse_json(&raw)
    }
}

/// Parse a JSON reply, tolerating a surrounding Markdown code fence.
pub(crate) fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T, BackendError> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(body.trim()).map_err(|e| BackendError::Malformed(e.to_string()))
}

#[derive(Deserialize, Debug)]
struct EntityReply {
    #[serde(default)]
    entities: Vec<EntitySpan>,
}

#[derive(Deserialize, Debug)]
struct SentimentReply {
    results: Vec<SentimentScore>,
}

#[derive(Deserialize, Debug)]
struct ClassifyReply {
    label: String,
}

impl EntityRecognizer for LlmAnalyzer<'_> {
    fn recognize<'a>(&'a self, text: &'a str) -> BackendFuture<'a, Vec<EntitySpan>> {
        Box::pin(async move {
            let reply: EntityReply = self.ask(ENTITY_PROMPT, text).await?;
            Ok(reply.entities)
        })
    }
}

impl SentimentAnalyzer for LlmAnalyzer<'_> {
    fn score<'a>(&'a self, sentences: &'a [String]) -> BackendFuture<'a, Vec<SentimentScore>> {
        Box::pin(async move {
            if sentences.is_empty() {
                return Ok(Vec::new());
            }
            let numbered: Vec<String> = sentences
                .iter()
                .enumerate()
                .map(|(i, s)| format!("{}. {s}", i + 1))
                .collect();
            let reply: SentimentReply = self.ask(SENTIMENT_PROMPT, &numbered.join("\n")).await?;
            if reply.results.len() != sentences.len() {
                return Err(BackendError::Malformed(format!(
                    "expected {} sentiment results, got {}",
                    sentences.len(),
                    reply.results.len()
                )));
            }
            Ok(reply.results)
        })
    }
}

impl TextClassifier for LlmAnalyzer<'_> {
    fn classify<'a>(&'a self, text: &'a str, labels: &'a [&'a str]) -> BackendFuture<'a, String> {
        Box::pin(async move {
            let user = format!("Labels:\n- {}\n\nText:\n{text}", labels.join("\n- "));
            let reply: ClassifyReply = self.ask(CLASSIFY_PROMPT, &user).await?;
            if !labels.contains(&reply.label.as_str()) {
                return Err(BackendError::Malformed(format!(
                    "label '{}' is not a candidate",
                    reply.label
                )));
            }
            Ok(reply.label)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_json_accepts_fenced_output() {
        let reply: ClassifyReply = parse_json("```json\n{\"label\": \"inside joke\"}\n```").unwrap();
        assert_eq!(reply.label, "inside joke");

        let reply: EntityReply = parse_json(r#"{"entities": [{"word": "Paris", "label": "LOC"}]}"#)
            .unwrap();
        assert_eq!(reply.entities[0].word, "Paris");
    }

    #[test]
    fn parse_json_rejects_garbage() {
        let err = parse_json::<ClassifyReply>("sure! the label is news").unwrap_err();
        assert!(matches!(err, BackendError::Malformed(_)));
    }

    #[test]
    fn missing_entities_key_is_empty() {
        let reply: EntityReply = parse_json("{}").unwrap();
        assert!(reply.entities.is_empty());
    }
}
