//! Sentiment labelling for submitted comments

use crate::types::Sentiment;

/// Label chosen for a comment, and whether a real analysis produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentimentVerdict {
    pub label: Sentiment,
    pub analyzed: bool,
}

/// Classifies free-text comments
pub trait SentimentAnalyzer: Send + Sync {
    fn analyze(&self, comment: &str) -> SentimentVerdict;
}

/// Labels everything positive and marks it unanalyzed
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderAnalyzer;

impl SentimentAnalyzer for PlaceholderAnalyzer {
    fn analyze(&self, _comment: &str) -> SentimentVerdict {
        SentimentVerdict {
            label: Sentiment::Positive,
            analyzed: false,
        }
    }
}
