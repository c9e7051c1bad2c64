//! Summarization batch pipeline: candidate selection and the backend call.
//!
//! Within a selected window, only messages whose estimated token length
//! exceeds the policy's `max_length` are worth compressing; short messages
//! would lose information for little gain. The survivors go to the
//! summarization backend in a single batch, and each result keeps the index
//! of the message it came from.

use crate::Message;
use crate::agent::backend::{SummaryBackend, SummaryInput};
use crate::chat::tokens::TokenEstimator;
use crate::chat::window::SummarizationPolicy;
use crate::error::BackendError;
use std::ops::Range;

/// A message selected for summarization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub source_index: usize,
    pub content: String,
}

/// A summary mapped back to the message it replaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryResult {
    pub index: usize,
    pub summary_text: String,
}

/// Outcome of one backend batch: the usable results plus the indices the
/// backend could not summarize.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub results: Vec<SummaryResult>,
    pub skipped: Vec<usize>,
}

/// Collect the messages in `window` that are longer than `max_length`.
///
/// Indices outside `messages` are ignored.
pub fn build_candidates(
    messages: &[Message],
    window: Range<usize>,
    max_length: usize,
    estimator: &dyn TokenEstimator,
) -> Vec<Candidate> {
    let end = window.end.min(messages.len());
    let start = window.start.min(end);
    messages[start..end]
        .iter()
        .zip(start..end)
        .filter(|(msg, _)| estimator.estimate(&msg.content) > max_length)
        .map(|(msg, source_index)| Candidate {
            source_index,
            content: msg.content.clone(),
        })
        .collect()
}

/// Summarize `candidates` with one backend call.
///
/// An empty candidate list never reaches the backend. Entries the backend
/// reports as failed are returned in [`BatchOutcome::skipped`]. A result
/// count that does not match the input count is malformed output and fails
/// the whole batch.
pub async fn summarize(
    backend: &dyn SummaryBackend,
    candidates: &[Candidate],
    policy: &SummarizationPolicy,
) -> Result<BatchOutcome, BackendError> {
    if candidates.is_empty() {
        return Ok(BatchOutcome::default());
    }

    let inputs: Vec<SummaryInput> = candidates
        .iter()
        .map(|c| SummaryInput {
            text: c.content.clone(),
            min_length: policy.summary_min_length,
            max_length: policy.summary_max_length,
        })
        .collect();

    let summaries = backend.summarize_batch(&inputs).await?;
    if summaries.len() != candidates.len() {
        return Err(BackendError::Malformed(format!(
            "expected {} summaries, got {}",
            candidates.len(),
            summaries.len()
        )));
    }

    let mut outcome = BatchOutcome::default();
    for (candidate, summary) in candidates.iter().zip(summaries) {
        match summary {
            Some(summary_text) => outcome.results.push(SummaryResult {
                index: candidate.source_index,
                summary_text,
            }),
            None => outcome.skipped.push(candidate.source_index),
        }
    }
    Ok(outcome)
}
