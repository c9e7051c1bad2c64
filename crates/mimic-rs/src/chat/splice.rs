//! History splice: fold summaries back into the live conversation.

use crate::chat::pipeline::SummaryResult;
use crate::chat::store::MessageStore;

/// Per-session summarization bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Lowest index not yet folded into a completed pass. Never decreases.
    pub summarize_cursor: usize,
    /// Message count when the last pass started.
    pub message_count_snapshot: usize,
}

impl SessionState {
    /// Move the cursor to `target`. Targets behind the cursor are ignored.
    pub fn advance_cursor(&mut self, target: usize) {
        self.summarize_cursor = self.summarize_cursor.max(target);
    }
}

/// Replace each summarized message's content in place.
///
/// Indices, ordering and length are untouched; every replacement is written
/// through to the store's mirror. Returns how many messages were replaced.
pub fn apply_summaries(store: &mut MessageStore, results: Vec<SummaryResult>) -> usize {
    results
        .into_iter()
        .filter(|r| store.replace_content(r.index, r.summary_text.clone()))
        .count()
}

/// Complete a pass: splice `results` and move the cursor to `window_end`,
/// the `count - recent_skip` boundary computed when the pass started.
pub fn complete_pass(
    store: &mut MessageStore,
    state: &mut SessionState,
    results: Vec<SummaryResult>,
    window_end: usize,
) -> usize {
    let replaced = apply_summaries(store, results);
    state.advance_cursor(window_end);
    replaced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageRole;
    use crate::agent::events::NoopHandler;
    use crate::chat::mirror::NullMirror;
    use std::sync::Arc;

    fn store_with(n: usize) -> MessageStore {
        let mut store = MessageStore::new(Box::new(NullMirror), Arc::new(NoopHandler));
        for i in 0..n {
            store.append(MessageRole::User, format!("original {i}"));
        }
        store
    }

    #[test]
    fn splice_replaces_in_place() {
        let mut store = store_with(6);
        let results = vec![
            SummaryResult {
                index: 1,
                summary_text: "s1".into(),
            },
            SummaryResult {
                index: 3,
                summary_text: "s3".into(),
            },
        ];
        assert_eq!(apply_summaries(&mut store, results), 2);

        let contents: Vec<&str> = store.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["original 0", "s1", "original 2", "s3", "original 4", "original 5"]
        );
    }

    #[test]
    fn out_of_range_results_are_not_counted() {
        let mut store = store_with(2);
        let results = vec![SummaryResult {
            index: 9,
            summary_text: "nope".into(),
        }];
        assert_eq!(apply_summaries(&mut store, results), 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn complete_pass_advances_cursor() {
        let mut store = store_with(11);
        let mut state = SessionState {
            summarize_cursor: 3,
            message_count_snapshot: 11,
        };
        complete_pass(&mut store, &mut state, Vec::new(), 7);
        assert_eq!(state.summarize_cursor, 7);
    }

    #[test]
    fn cursor_never_moves_backwards() {
        let mut state = SessionState {
            summarize_cursor: 7,
            message_count_snapshot: 0,
        };
        state.advance_cursor(5);
        assert_eq!(state.summarize_cursor, 7);
        state.advance_cursor(9);
        assert_eq!(state.summarize_cursor, 9);
    }
}
