//! Memory recorder: entities, sentiment and personal moments per message.
//!
//! [`MemoryRecorder::check_for_memories`] runs three stages in order, each
//! with its own freshly created analyzer:
//!
//! | Stage | File | Stored |
//! |-------|------|--------|
//! | Entities | `entity_recognition.json` | entities with the sentences mentioning them |
//! | Sentiment | `sentiment.json` | non-neutral sentences with their polarity |
//! | Classification | `classification.json` | messages with a personal label |
//!
//! A failing stage is reported through the event handler and does not stop
//! the next one.

pub mod analyzers;
pub mod classifier;
pub mod entities;
pub mod sentiment;
mod store;

pub use analyzers::{AnalyzerProvider, LlmAnalyzers};

use crate::MessageRole;
use crate::agent::events::{ChatEvent, EventHandler, MemoryKind};
use crate::error::{BackendError, MemoryError};
use crate::text::split_sentences;
use classifier::{CLASSIFICATION_FILE, ClassificationLog, ClassificationRecord};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Directory name for memory files inside a persona directory.
pub const MEMORY_DIR: &str = "memory_data";

/// What one [`MemoryRecorder::check_for_memories`] call stored.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryReport {
    pub entities: usize,
    pub sentiments: usize,
    /// The winning label, when it was a personal one.
    pub classification: Option<String>,
    /// Stages that failed.
    pub failures: usize,
}

pub struct MemoryRecorder {
    memory_dir: PathBuf,
    analyzers: Arc<dyn AnalyzerProvider>,
    events: Arc<dyn EventHandler>,
}

impl MemoryRecorder {
    /// Record memories for the persona stored in `persona_dir`.
    pub fn new(
        persona_dir: &Path,
        analyzers: Arc<dyn AnalyzerProvider>,
        events: Arc<dyn EventHandler>,
    ) -> Self {
        Self {
            memory_dir: persona_dir.join(MEMORY_DIR),
            analyzers,
            events,
        }
    }

    pub fn memory_dir(&self) -> &Path {
        &self.memory_dir
    }

    /// Run every memory stage on one message.
    pub async fn check_for_memories(&self, role: MessageRole, text: &str) -> MemoryReport {
        let started = Instant::now();
        let now = chrono::Local::now()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string();
        let mut report = MemoryReport::default();

        match self.record_entities(role, text, &now).await {
            Ok(count) => {
                report.entities = count;
                self.recorded(MemoryKind::Entity, count);
            }
            Err(error) => self.failed(&mut report, &error),
        }

        match self.record_sentiment(role, text).await {
            Ok(count) => {
                report.sentiments = count;
                self.recorded(MemoryKind::Sentiment, count);
            }
            Err(error) => self.failed(&mut report, &error),
        }

        match self.record_classification(role, text, &now).await {
            Ok(label) => {
                if label.is_some() {
                    self.recorded(MemoryKind::Classification, 1);
                }
                report.classification = label;
            }
            Err(error) => self.failed(&mut report, &error),
        }

        self.events.on_event(&ChatEvent::MemoryChecked {
            elapsed: started.elapsed(),
        });
        report
    }

    async fn record_entities(
        &self,
        role: MessageRole,
        text: &str,
        now: &str,
    ) -> Result<usize, MemoryError> {
        let spans = {
            let recognizer = self.analyzers.entity_recognizer();
            recognizer.recognize(text).await?
        };
        let merged = entities::merge_word_pieces(&spans);
        let records = entities::entity_records(&merged, role, text, now);
        store::append_records(&self.memory_dir.join(entities::ENTITY_FILE), records)
    }

    async fn record_sentiment(&self, role: MessageRole, text: &str) -> Result<usize, MemoryError> {
        let sentences = split_sentences(text);
        if sentences.is_empty() {
            return Ok(0);
        }
        let scores = {
            let analyzer = self.analyzers.sentiment_analyzer();
            analyzer.score(&sentences).await?
        };
        if scores.len() != sentences.len() {
            return Err(BackendError::Malformed(format!(
                "expected {} sentiment scores, got {}",
                sentences.len(),
                scores.len()
            ))
            .into());
        }
        let records = sentiment::sentiment_records(role, &sentences, &scores);
        store::append_records(&self.memory_dir.join(sentiment::SENTIMENT_FILE), records)
    }

    async fn record_classification(
        &self,
        role: MessageRole,
        text: &str,
        now: &str,
    ) -> Result<Option<String>, MemoryError> {
        let labels = classifier::candidate_labels();
        let label = {
            let model = self.analyzers.text_classifier();
            model.classify(text, &labels).await?
        };
        if !classifier::is_personal(&label) {
            self.events
                .on_event(&ChatEvent::ClassificationIgnored { label: &label });
            return Ok(None);
        }

        let path = self.memory_dir.join(CLASSIFICATION_FILE);
        let mut log: ClassificationLog = store::read_or_default(&path)?;
        log.memory_data.push(ClassificationRecord {
            datetime: now.to_string(),
            classification: label.clone(),
            role,
            message: text.to_string(),
        });
        store::write_atomic(&path, &log)?;
        Ok(Some(label))
    }

    fn recorded(&self, kind: MemoryKind, count: usize) {
        self.events
            .on_event(&ChatEvent::MemoryRecorded { kind, count });
    }

    fn failed(&self, report: &mut MemoryReport, error: &MemoryError) {
        report.failures += 1;
        self.events.on_event(&ChatEvent::MemoryFailed { error });
    }
}
