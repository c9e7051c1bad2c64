//! Entity memory: named entities with the sentences that mention them.

use crate::MessageRole;
use crate::memory::analyzers::EntitySpan;
use crate::text::split_sentences;
use serde::{Deserialize, Serialize};

pub const ENTITY_FILE: &str = "entity_recognition.json";

/// One stored entity mention.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EntityRecord {
    #[serde(rename = "date-time")]
    pub date_time: String,
    pub role: MessageRole,
    pub entity: String,
    pub label: String,
    pub sentences: String,
}

/// Merge `##` word pieces onto the preceding entity.
///
/// A leading `##` piece with nothing before it is dropped.
pub fn merge_word_pieces(spans: &[EntitySpan]) -> Vec<(String, String)> {
    let mut entities: Vec<(String, String)> = Vec::new();
    for span in spans {
        match span.word.strip_prefix("##") {
            Some(piece) => {
                if let Some((word, _)) = entities.last_mut() {
                    word.push_str(piece);
                }
            }
            None => entities.push((span.word.clone(), span.label.clone())),
        }
    }
    entities.retain(|(word, label)| !word.is_empty() && !label.is_empty());
    entities
}

/// Build records for every entity that appears in at least one sentence of
/// `text` (case-insensitive). Matching sentences are joined with a space.
pub fn entity_records(
    entities: &[(String, String)],
    role: MessageRole,
    text: &str,
    now: &str,
) -> Vec<EntityRecord> {
    let sentences = split_sentences(text);
    let lowered: Vec<String> = sentences.iter().map(|s| s.to_lowercase()).collect();

    entities
        .iter()
        .filter_map(|(entity, label)| {
            let needle = entity.to_lowercase();
            let matching: Vec<&str> = sentences
                .iter()
                .zip(&lowered)
                .filter(|(_, low)| low.contains(&needle))
                .map(|(s, _)| s.as_str())
                .collect();
            (!matching.is_empty()).then(|| EntityRecord {
                date_time: now.to_string(),
                role,
                entity: entity.clone(),
                label: label.clone(),
                sentences: matching.join(" "),
            })
        })
        .collect()
}
