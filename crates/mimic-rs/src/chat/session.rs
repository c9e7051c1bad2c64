//! A chat session: message store plus the rolling summarization controller.
//!
//! After every append, [`check_and_summarize`](ChatSession::check_and_summarize)
//! asks the window selector whether a pass is due. A due pass builds
//! candidates from the window, sends them to the summarization backend in one
//! batch, splices the summaries back in place and advances the cursor to the
//! window end computed when the pass started.
//!
//! Failure policy: a backend failure fails the whole pass, leaves the cursor
//! where it was and is never retried automatically. The next append that
//! satisfies the trigger retries the same window.

use crate::agent::backend::SummaryBackend;
use crate::agent::events::{ChatEvent, EventHandler};
use crate::chat::mirror::Mirror;
use crate::chat::pipeline::{build_candidates, summarize};
use crate::chat::splice::{SessionState, complete_pass};
use crate::chat::store::MessageStore;
use crate::chat::tokens::TokenEstimator;
use crate::chat::window::{SummarizationPolicy, select_window};
use crate::error::SummarizeError;
use crate::{Message, MessageRole};
use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

/// What a call to [`ChatSession::check_and_summarize`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// Not enough new messages since the cursor, or nothing old enough to scan.
    NotDue,
    /// The window had no message long enough to compress. The cursor moved.
    NoCandidates { window: Range<usize> },
    /// Summaries were spliced in. The cursor moved.
    Summarized {
        window: Range<usize>,
        replaced: usize,
        skipped: usize,
    },
}

pub struct ChatSession {
    store: MessageStore,
    state: SessionState,
    policy: SummarizationPolicy,
    estimator: Arc<dyn TokenEstimator>,
    summarizer: Arc<dyn SummaryBackend>,
    events: Arc<dyn EventHandler>,
}

impl ChatSession {
    pub fn new(
        policy: SummarizationPolicy,
        mirror: Box<dyn Mirror>,
        estimator: Arc<dyn TokenEstimator>,
        summarizer: Arc<dyn SummaryBackend>,
        events: Arc<dyn EventHandler>,
    ) -> Self {
        Self {
            store: MessageStore::new(mirror, events.clone()),
            state: SessionState::default(),
            policy,
            estimator,
            summarizer,
            events,
        }
    }

    /// Append a message and return its index. Does not run the selector.
    pub fn append_message(&mut self, role: MessageRole, content: impl Into<String>) -> usize {
        self.store.append(role, content)
    }

    /// Exclude every message appended so far from summarization by moving
    /// the cursor to the current length. Used for the session preamble
    /// (system prompt, user info, intro).
    pub fn pin_prefix(&mut self) {
        let len = self.store.len();
        self.state.advance_cursor(len);
    }

    /// Append a message, then run a summarization pass if one is due.
    ///
    /// Summarization failures are reported through the event handler and
    /// swallowed: the conversation proceeds with the unsummarized history.
    pub async fn record(&mut self, role: MessageRole, content: impl Into<String>) -> usize {
        let index = self.append_message(role, content);
        if let Err(error) = self.check_and_summarize().await {
            self.events
                .on_event(&ChatEvent::SummarizationFailed { error: &error });
        }
        index
    }

    /// Run the selector and, when a window is due, the full pass.
    pub async fn check_and_summarize(&mut self) -> Result<PassOutcome, SummarizeError> {
        let count = self.store.len();
        let Some(window) = select_window(&self.policy, count, self.state.summarize_cursor) else {
            return Ok(PassOutcome::NotDue);
        };

        let started = Instant::now();
        self.state.message_count_snapshot = count;
        self.events.on_event(&ChatEvent::SummarizationStarted {
            window: window.clone(),
        });

        let candidates = build_candidates(
            self.store.messages(),
            window.clone(),
            self.policy.max_length,
            self.estimator.as_ref(),
        );

        if candidates.is_empty() {
            self.events.on_event(&ChatEvent::NoCandidates {
                window: window.clone(),
            });
            complete_pass(&mut self.store, &mut self.state, Vec::new(), window.end);
            self.events.on_event(&ChatEvent::SummarizationCompleted {
                summarized: 0,
                cursor: self.state.summarize_cursor,
                elapsed: started.elapsed(),
            });
            return Ok(PassOutcome::NoCandidates { window });
        }

        self.events.on_event(&ChatEvent::SummarizerBatch {
            count: candidates.len(),
        });
        let outcome = summarize(self.summarizer.as_ref(), &candidates, &self.policy)
            .await
            .map_err(|source| SummarizeError::Backend {
                start: window.start,
                end: window.end,
                source,
            })?;

        for &index in &outcome.skipped {
            self.events.on_event(&ChatEvent::SummaryItemSkipped { index });
        }
        let skipped = outcome.skipped.len();
        let replaced = complete_pass(&mut self.store, &mut self.state, outcome.results, window.end);

        self.events.on_event(&ChatEvent::SummarizationCompleted {
            summarized: replaced,
            cursor: self.state.summarize_cursor,
            elapsed: started.elapsed(),
        });
        Ok(PassOutcome::Summarized {
            window,
            replaced,
            skipped,
        })
    }

    /// All messages in conversation order.
    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    /// The message at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&Message> {
        self.store.get(index)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn policy(&self) -> &SummarizationPolicy {
        &self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::backend::{BackendFuture, SummaryInput};
    use crate::agent::events::{FnEventHandler, NoopHandler};
    use crate::chat::mirror::NullMirror;
    use crate::chat::tokens::WordCountEstimator;
    use crate::error::BackendError;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Summarizes to "S(<first word>)"; can be switched to fail.
    struct MockSummarizer {
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    impl MockSummarizer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            })
        }
    }

    impl SummaryBackend for MockSummarizer {
        fn summarize_batch<'a>(
            &'a self,
            inputs: &'a [SummaryInput],
        ) -> BackendFuture<'a, Vec<Option<String>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = self.fail.load(Ordering::SeqCst);
            Box::pin(async move {
                if fail {
                    return Err(BackendError::Unavailable("model offline".into()));
                }
                Ok(inputs
                    .iter()
                    .map(|i| {
                        let first = i.text.split_whitespace().next().unwrap_or("");
                        Some(format!("S({first})"))
                    })
                    .collect())
            })
        }
    }

    fn long(tag: &str) -> String {
        format!("{tag} {}", vec!["filler"; 20].join(" "))
    }

    fn session(summarizer: Arc<MockSummarizer>) -> ChatSession {
        ChatSession::new(
            SummarizationPolicy::default().with_max_length(10),
            Box::new(NullMirror),
            Arc::new(WordCountEstimator),
            summarizer,
            Arc::new(NoopHandler),
        )
    }

    /// Three pinned preamble messages, like an agent session start.
    fn with_preamble(s: &mut ChatSession) {
        s.append_message(MessageRole::System, long("system"));
        s.append_message(MessageRole::User, long("userinfo"));
        s.append_message(MessageRole::Assistant, "intro");
        s.pin_prefix();
    }

    #[tokio::test]
    async fn pass_triggers_at_interval_and_advances_cursor() {
        let summarizer = MockSummarizer::new();
        let mut s = session(summarizer.clone());
        with_preamble(&mut s);
        assert_eq!(s.state().summarize_cursor, 3);

        for i in 3..10 {
            s.append_message(MessageRole::User, long(&format!("m{i}")));
            assert_eq!(s.check_and_summarize().await.unwrap(), PassOutcome::NotDue);
        }
        assert_eq!(s.state().summarize_cursor, 3);

        s.append_message(MessageRole::User, long("m10"));
        let outcome = s.check_and_summarize().await.unwrap();
        assert_eq!(
            outcome,
            PassOutcome::Summarized {
                window: 3..7,
                replaced: 4,
                skipped: 0
            }
        );
        assert_eq!(s.state().summarize_cursor, 7);
        assert_eq!(s.state().message_count_snapshot, 11);
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);

        assert_eq!(s.get(3).unwrap().content, "S(m3)");
        assert_eq!(s.get(6).unwrap().content, "S(m6)");
        // Pinned and recent messages are untouched.
        assert!(s.get(0).unwrap().content.starts_with("system filler"));
        assert!(s.get(7).unwrap().content.starts_with("m7 filler"));
        assert_eq!(s.len(), 11);
    }

    #[tokio::test]
    async fn immediate_second_pass_is_a_no_op() {
        let summarizer = MockSummarizer::new();
        let mut s = session(summarizer.clone());
        with_preamble(&mut s);
        for i in 3..11 {
            s.append_message(MessageRole::User, long(&format!("m{i}")));
        }
        s.check_and_summarize().await.unwrap();
        let before: Vec<Message> = s.messages().to_vec();
        let state_before = s.state().clone();

        assert_eq!(s.check_and_summarize().await.unwrap(), PassOutcome::NotDue);
        assert_eq!(s.messages(), before.as_slice());
        assert_eq!(s.state(), &state_before);
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn short_messages_advance_cursor_without_backend() {
        let summarizer = MockSummarizer::new();
        let mut s = session(summarizer.clone());
        with_preamble(&mut s);
        for i in 3..11 {
            s.append_message(MessageRole::User, format!("short {i}"));
        }

        let outcome = s.check_and_summarize().await.unwrap();
        assert_eq!(outcome, PassOutcome::NoCandidates { window: 3..7 });
        assert_eq!(s.state().summarize_cursor, 7);
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn backend_failure_leaves_cursor_and_retries_next_trigger() {
        let summarizer = MockSummarizer::new();
        summarizer.fail.store(true, Ordering::SeqCst);
        let mut s = session(summarizer.clone());
        with_preamble(&mut s);
        for i in 3..11 {
            s.append_message(MessageRole::User, long(&format!("m{i}")));
        }

        let err = s.check_and_summarize().await.unwrap_err();
        assert!(matches!(err, SummarizeError::Backend { start: 3, end: 7, .. }));
        assert_eq!(s.state().summarize_cursor, 3);
        assert!(s.get(3).unwrap().content.starts_with("m3 filler"));

        summarizer.fail.store(false, Ordering::SeqCst);
        s.append_message(MessageRole::Assistant, long("m11"));
        let outcome = s.check_and_summarize().await.unwrap();
        assert_eq!(
            outcome,
            PassOutcome::Summarized {
                window: 3..8,
                replaced: 5,
                skipped: 0
            }
        );
        assert_eq!(s.state().summarize_cursor, 8);
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn record_swallows_failures_and_reports_them() {
        let summarizer = MockSummarizer::new();
        summarizer.fail.store(true, Ordering::SeqCst);
        let failures = Arc::new(Mutex::new(0usize));
        let sink = failures.clone();
        let handler = FnEventHandler::new(move |event| {
            if let ChatEvent::SummarizationFailed { .. } = event {
                *sink.lock().unwrap() += 1;
            }
        });
        let mut s = ChatSession::new(
            SummarizationPolicy::default().with_max_length(10),
            Box::new(NullMirror),
            Arc::new(WordCountEstimator),
            summarizer,
            Arc::new(handler),
        );

        for i in 0..8 {
            let index = s.record(MessageRole::User, long(&format!("m{i}"))).await;
            assert_eq!(index, i);
        }
        assert_eq!(*failures.lock().unwrap(), 1);
        assert_eq!(s.len(), 8);
        assert_eq!(s.state().summarize_cursor, 0);
    }
}
