//! Token-length estimation for summarization candidacy.
//!
//! Estimates are only used to decide whether a message is long enough to be
//! worth summarizing. They never truncate anything.

/// Default characters per token (conservative estimate for English text).
/// Most tokenizers average 3-4 chars per token; we use 3.5 as a middle ground.
pub const DEFAULT_CHARS_PER_TOKEN: f64 = 3.5;

/// Estimates the token length of one message's text.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> usize;
}

/// Character-ratio estimator: `ceil(chars / chars_per_token)`.
#[derive(Debug, Clone)]
pub struct CharRatioEstimator {
    chars_per_token: f64,
}

impl CharRatioEstimator {
    /// Create an estimator with a calibrated ratio. Non-positive ratios fall
    /// back to [`DEFAULT_CHARS_PER_TOKEN`].
    pub fn new(chars_per_token: f64) -> Self {
        let chars_per_token = if chars_per_token > 0.0 {
            chars_per_token
        } else {
            DEFAULT_CHARS_PER_TOKEN
        };
        Self { chars_per_token }
    }
}

impl Default for CharRatioEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_CHARS_PER_TOKEN)
    }
}

impl TokenEstimator for CharRatioEstimator {
    fn estimate(&self, text: &str) -> usize {
        (text.chars().count() as f64 / self.chars_per_token).ceil() as usize
    }
}

/// Whitespace word count. Cheap and deterministic; handy in tests.
#[derive(Debug, Clone, Default)]
pub struct WordCountEstimator;

impl TokenEstimator for WordCountEstimator {
    fn estimate(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_ratio_rounds_up() {
        let est = CharRatioEstimator::default();
        assert_eq!(est.estimate(""), 0);
        assert_eq!(est.estimate("abc"), 1);
        assert_eq!(est.estimate(&"a".repeat(35)), 10);
        assert_eq!(est.estimate(&"a".repeat(36)), 11);
    }

    #[test]
    fn char_ratio_counts_chars_not_bytes() {
        let est = CharRatioEstimator::new(1.0);
        assert_eq!(est.estimate("ééé"), 3);
    }

    #[test]
    fn invalid_ratio_uses_default() {
        let est = CharRatioEstimator::new(0.0);
        assert_eq!(est.estimate(&"a".repeat(7)), 2);
    }

    #[test]
    fn word_count() {
        assert_eq!(WordCountEstimator.estimate("one two  three\nfour"), 4);
    }
}
