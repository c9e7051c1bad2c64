//! Summarization window selection.
//!
//! Two knobs are deliberately separate: `interval` decides *when* a pass runs
//! (enough unsummarized messages since the cursor), `recent_skip` decides
//! *what* it may touch (never the newest messages). Older context becomes
//! eligible for compression once the volume threshold is crossed while the
//! recent exchanges stay verbatim.

use std::ops::Range;

/// Thresholds for the rolling summarization controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizationPolicy {
    /// How many messages past the cursor trigger a pass. Default: 8.
    pub interval: usize,
    /// How many of the newest messages are never summarized. Default: 4.
    pub recent_skip: usize,
    /// Messages whose estimated token length exceeds this are candidates.
    /// Default: 130.
    pub max_length: usize,
    /// Lower bound passed to the summarizer for each summary. Default: 60.
    pub summary_min_length: usize,
    /// Upper bound passed to the summarizer for each summary. Default: 130.
    pub summary_max_length: usize,
}

impl Default for SummarizationPolicy {
    fn default() -> Self {
        Self {
            interval: 8,
            recent_skip: 4,
            max_length: 130,
            summary_min_length: 60,
            summary_max_length: 130,
        }
    }
}

impl SummarizationPolicy {
    pub fn with_interval(mut self, interval: usize) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_recent_skip(mut self, recent_skip: usize) -> Self {
        self.recent_skip = recent_skip;
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_summary_bounds(mut self, min: usize, max: usize) -> Self {
        self.summary_min_length = min;
        self.summary_max_length = max;
        self
    }
}

/// Whether enough messages have accumulated past the cursor to run a pass.
pub fn should_summarize(message_count: usize, summarize_cursor: usize, interval: usize) -> bool {
    message_count.saturating_sub(summarize_cursor) >= interval
}

/// The index range a triggered pass scans: `[cursor, count - recent_skip)`.
///
/// Returns `None` when the range is empty or inverted.
pub fn scan_window(
    message_count: usize,
    summarize_cursor: usize,
    recent_skip: usize,
) -> Option<Range<usize>> {
    let end = message_count.saturating_sub(recent_skip);
    (end > summarize_cursor).then_some(summarize_cursor..end)
}

/// Apply the selector: the window to scan, or `None` when no pass is due.
pub fn select_window(
    policy: &SummarizationPolicy,
    message_count: usize,
    summarize_cursor: usize,
) -> Option<Range<usize>> {
    if !should_summarize(message_count, summarize_cursor, policy.interval) {
        return None;
    }
    scan_window(message_count, summarize_cursor, policy.recent_skip)
}
