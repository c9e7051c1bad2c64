//! Sentiment memory: per-sentence polarity, neutral sentences dropped.

use crate::MessageRole;
use crate::memory::analyzers::SentimentScore;
use serde::{Deserialize, Serialize};

pub const SENTIMENT_FILE: &str = "sentiment.json";

/// Raw label for neutral sentences. Never stored.
pub const NEUTRAL_LABEL: &str = "LABEL_1";

/// Map a raw classifier label to a sentiment name.
pub fn sentiment_name(label: &str) -> &'static str {
    match label {
        "LABEL_0" => "negative",
        "LABEL_2" => "positive",
        _ => "unknown",
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SentimentEntry {
    pub role: MessageRole,
    pub sentiment: String,
    pub score: f64,
    pub sentence: String,
}

/// One stored record: `{"memory_data": {role, sentiment, score, sentence}}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SentimentRecord {
    pub memory_data: SentimentEntry,
}

/// Pair scores with their sentences, dropping neutral ones.
pub fn sentiment_records(
    role: MessageRole,
    sentences: &[String],
    scores: &[SentimentScore],
) -> Vec<SentimentRecord> {
    sentences
        .iter()
        .zip(scores)
        .filter(|(_, score)| score.label != NEUTRAL_LABEL)
        .map(|(sentence, score)| SentimentRecord {
            memory_data: SentimentEntry {
                role,
                sentiment: sentiment_name(&score.label).to_string(),
                score: score.score,
                sentence: sentence.clone(),
            },
        })
        .collect()
}
