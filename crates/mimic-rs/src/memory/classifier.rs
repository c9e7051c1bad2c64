//! Classification memory: personal relationship moments.
//!
//! Each message is classified against personal and throwaway labels
//! together. Only personal labels are stored; a throwaway winner means the
//! message is small talk.

use crate::MessageRole;
use serde::{Deserialize, Serialize};

pub const CLASSIFICATION_FILE: &str = "classification.json";

pub const THROWAWAY_LABELS: &[&str] = &[
    "news",
    "general conversation",
    "weather",
    "sports",
    "technology",
    "politics",
    "entertainment",
    "travel",
    "work",
    "shopping",
    "food",
    "social media",
];

pub const PERSONAL_LABELS: &[&str] = &[
    "first online conversation",
    "first voice call",
    "first impression",
    "first surprise",
    "emotional vulnerability",
    "deepening trust",
    "early jealousy",
    "expressing desires",
    "growing together as a team",
    "making compromises",
    "creating traditions together",
    "celebrating small wins together",
    "expressing gratitude",
    "first time meeting family",
    "first holiday together",
    "first joint decision",
    "first gift exchange",
    "first travel experience together",
    "first shared hobby or passion",
    "first time spending the night together",
    "moving in together milestone",
    "buying a home together",
    "moment of emotional support",
    "comfort during tough times",
    "physical closeness",
    "heartfelt confession",
    "learning each other's love language",
    "growing intimacy",
    "navigating personal growth together",
    "being each other's safe space",
    "first time saying 'I love you'",
    "first intimate moment",
    "shared dreams of the future",
    "sensual connection",
    "first disagreement",
    "dealing with insecurities",
    "making up after a fight",
    "emotional repair",
    "making the first apology",
    "acknowledging faults and flaws",
    "finding compromise after conflict",
    "working through misunderstandings",
    "planning future together",
    "milestone anniversaries",
    "reaffirming commitment",
    "loss of a loved one together",
    "overcoming a betrayal",
    "first long distance separation",
    "emotional crisis",
    "spontaneous adventure",
    "inside joke",
    "cute gesture",
    "shared hobbies",
    "silly inside jokes",
    "spontaneous acts of kindness",
    "playful teasing",
    "surprising each other",
    "support during career change",
    "first time living together",
    "parenting moment",
    "pet adoption together",
    "adopting a shared responsibility",
    "joint problem-solving",
    "balancing independence and togetherness",
    "celebrating small victories",
    "random acts of romance",
    "seasonal traditions",
];

/// Every candidate label, personal first.
pub fn candidate_labels() -> Vec<&'static str> {
    PERSONAL_LABELS
        .iter()
        .chain(THROWAWAY_LABELS)
        .copied()
        .collect()
}

pub fn is_personal(label: &str) -> bool {
    PERSONAL_LABELS.contains(&label)
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClassificationRecord {
    pub datetime: String,
    pub classification: String,
    pub role: MessageRole,
    pub message: String,
}

/// Contents of `classification.json`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ClassificationLog {
    pub memory_data: Vec<ClassificationRecord>,
}
